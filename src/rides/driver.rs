//! The driver actor: tracks one driver's position and current trip.

use crate::framework::{ActorContext, ActorHandler, HandlerError, Message};
use crate::rides::error::RideError;
use crate::rides::messages::*;
use crate::rides::trip_book::TripBook;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Handler for a single driver. Spawned with the `Restart` policy.
///
/// A driver is either idle (and then advertised to the matcher whenever its location
/// changes) or working on exactly one trip. Requests that do not fit the current trip
/// are logged and dropped rather than failed, so they never trigger a restart.
pub struct DriverHandler {
    driver_id: String,
    location: Option<Location>,
    current_trip: Option<TripAssignment>,
    trips_completed: u64,
    trip_book: TripBook,
}

impl DriverHandler {
    pub fn new(driver_id: impl Into<String>, trip_book: TripBook) -> Self {
        Self {
            driver_id: driver_id.into(),
            location: None,
            current_trip: None,
            trips_completed: 0,
            trip_book,
        }
    }

    fn advertise(&self, ctx: &ActorContext) -> Result<(), HandlerError> {
        if let (None, Some(location)) = (&self.current_trip, self.location) {
            ctx.tell(
                MATCHER_ID,
                DRIVER_AVAILABLE,
                &DriverAvailable {
                    driver_id: self.driver_id.clone(),
                    location,
                },
            )?;
        }
        Ok(())
    }

    fn on_location(
        &mut self,
        update: LocationUpdate,
        ctx: &ActorContext,
    ) -> Result<(), HandlerError> {
        debug!(driver_id = %self.driver_id, ?update.location, "Location updated");
        self.location = Some(update.location);
        self.advertise(ctx)
    }

    fn on_assign(
        &mut self,
        assignment: TripAssignment,
        ctx: &ActorContext,
    ) -> Result<(), HandlerError> {
        if let Some(current) = &self.current_trip {
            let busy = RideError::DriverBusy {
                driver_id: self.driver_id.clone(),
                trip_id: current.trip_id.clone(),
            };
            warn!(trip_id = %assignment.trip_id, error = %busy, "Rejecting assignment");
            return self.hand_back(assignment, ctx);
        }
        info!(driver_id = %self.driver_id, trip_id = %assignment.trip_id, "Trip accepted");
        self.trip_book.assign(&assignment.trip_id, &self.driver_id);
        self.current_trip = Some(assignment);
        Ok(())
    }

    /// Returns an assignment the driver cannot take: the trip is closed as unmatched.
    fn hand_back(
        &self,
        assignment: TripAssignment,
        ctx: &ActorContext,
    ) -> Result<(), HandlerError> {
        self.trip_book.mark_unmatched(&assignment.trip_id);
        let notice = Message::typed(
            NO_DRIVER_AVAILABLE,
            &TripRef {
                trip_id: assignment.trip_id.clone(),
            },
            Some(&self.driver_id),
        )?
        .with_correlation_id(assignment.trip_id.as_str());
        if let Err(e) = ctx.send(&assignment.passenger_id, notice) {
            warn!(passenger_id = %assignment.passenger_id, error = %e, "Passenger unreachable");
        }
        Ok(())
    }

    fn on_complete(&mut self, trip: TripRef, ctx: &ActorContext) -> Result<(), HandlerError> {
        let assignment = match self.current_trip.take() {
            Some(current) if current.trip_id == trip.trip_id => current,
            other => {
                let active = other.as_ref().map(|current| current.trip_id.as_str());
                warn!(
                    driver_id = %self.driver_id,
                    error = %RideError::UnknownTrip(trip.trip_id.clone()),
                    ?active,
                    "Ignoring completion"
                );
                self.current_trip = other;
                return Ok(());
            }
        };

        self.trips_completed += 1;
        self.location = Some(assignment.dropoff);
        self.trip_book.complete(&assignment.trip_id);
        info!(
            driver_id = %self.driver_id,
            trip_id = %assignment.trip_id,
            trips_completed = self.trips_completed,
            "Trip completed"
        );

        let notice = Message::typed(TRIP_COMPLETED, &trip, Some(&self.driver_id))?
            .with_correlation_id(assignment.trip_id.as_str());
        ctx.send(&assignment.passenger_id, notice)?;
        self.advertise(ctx)
    }
}

#[async_trait]
impl ActorHandler for DriverHandler {
    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<(), HandlerError> {
        match message.kind() {
            LOCATION_UPDATE => self.on_location(message.payload_as()?, ctx),
            ASSIGN_TRIP => self.on_assign(message.payload_as()?, ctx),
            COMPLETE_TRIP => self.on_complete(message.payload_as()?, ctx),
            other => Err(RideError::UnsupportedMessage(other.to_string()).into()),
        }
    }

    async fn on_restart(&mut self, _ctx: &ActorContext) {
        // Position and trip may be inconsistent after a failure; wait for a fresh update.
        self.location = None;
        self.current_trip = None;
    }

    async fn on_stop(&mut self, ctx: &ActorContext) {
        // Best effort: the matcher may already be gone during shutdown.
        let _ = ctx.tell(
            MATCHER_ID,
            DRIVER_UNAVAILABLE,
            &DriverUnavailable {
                driver_id: self.driver_id.clone(),
            },
        );
    }
}

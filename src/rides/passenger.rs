//! The passenger actor: one open ride request at a time.

use crate::framework::{ActorContext, ActorHandler, HandlerError, Message};
use crate::rides::error::RideError;
use crate::rides::messages::*;
use crate::rides::trip_book::TripBook;
use async_trait::async_trait;
use tracing::{info, warn};

/// Handler for a single passenger. Spawned with the `Restart` policy.
///
/// Notices for a trip other than the open one are stale and only logged.
pub struct PassengerHandler {
    passenger_id: String,
    active_trip: Option<String>,
    driver_id: Option<String>,
    trip_book: TripBook,
}

impl PassengerHandler {
    pub fn new(passenger_id: impl Into<String>, trip_book: TripBook) -> Self {
        Self {
            passenger_id: passenger_id.into(),
            active_trip: None,
            driver_id: None,
            trip_book,
        }
    }

    fn on_request(
        &mut self,
        request: RideRequest,
        ctx: &ActorContext,
    ) -> Result<(), HandlerError> {
        if let Some(trip_id) = &self.active_trip {
            let busy = RideError::PassengerBusy {
                passenger_id: self.passenger_id.clone(),
                trip_id: trip_id.clone(),
            };
            warn!(trip_id = %request.trip_id, error = %busy, "Rejecting ride request");
            self.trip_book.record_request(&request.trip_id, &self.passenger_id);
            self.trip_book.mark_unmatched(&request.trip_id);
            return Ok(());
        }

        self.trip_book.record_request(&request.trip_id, &self.passenger_id);
        let match_request = MatchRequest {
            trip_id: request.trip_id.clone(),
            passenger_id: self.passenger_id.clone(),
            pickup: request.pickup,
            dropoff: request.dropoff,
        };
        let message = Message::typed(MATCH_REQUEST, &match_request, Some(&self.passenger_id))?
            .with_correlation_id(request.trip_id.as_str());
        ctx.send(MATCHER_ID, message)?;

        info!(passenger_id = %self.passenger_id, trip_id = %request.trip_id, "Ride requested");
        self.active_trip = Some(request.trip_id);
        Ok(())
    }

    /// Whether a notice is about the trip currently open.
    fn is_current(&self, trip_id: &str, kind: &str) -> bool {
        if self.active_trip.as_deref() == Some(trip_id) {
            return true;
        }
        warn!(
            passenger_id = %self.passenger_id,
            %kind,
            error = %RideError::UnknownTrip(trip_id.to_string()),
            "Ignoring stale notice"
        );
        false
    }
}

#[async_trait]
impl ActorHandler for PassengerHandler {
    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<(), HandlerError> {
        match message.kind() {
            REQUEST_RIDE => self.on_request(message.payload_as()?, ctx),
            TRIP_ASSIGNED => {
                let assigned: TripAssigned = message.payload_as()?;
                if !self.is_current(&assigned.trip_id, message.kind()) {
                    return Ok(());
                }
                info!(
                    passenger_id = %self.passenger_id,
                    trip_id = %assigned.trip_id,
                    driver_id = %assigned.driver_id,
                    pickup_distance_km = assigned.pickup_distance_km,
                    "Driver assigned"
                );
                self.driver_id = Some(assigned.driver_id);
                Ok(())
            }
            NO_DRIVER_AVAILABLE | TRIP_COMPLETED => {
                let trip: TripRef = message.payload_as()?;
                if !self.is_current(&trip.trip_id, message.kind()) {
                    return Ok(());
                }
                info!(
                    passenger_id = %self.passenger_id,
                    trip_id = %trip.trip_id,
                    kind = %message.kind(),
                    "Trip closed"
                );
                self.active_trip = None;
                self.driver_id = None;
                Ok(())
            }
            other => Err(RideError::UnsupportedMessage(other.to_string()).into()),
        }
    }

    async fn on_restart(&mut self, _ctx: &ActorContext) {
        self.active_trip = None;
        self.driver_id = None;
    }
}

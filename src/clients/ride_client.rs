use crate::clients::traits::ActorClient;
use crate::framework::{ActorRef, ActorSystem, Message, SupervisionPolicy};
use crate::rides::messages::*;
use crate::rides::{DriverHandler, PassengerHandler, RideError, TripBook};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Client for the ride actors.
///
/// Translates service-layer calls into messages. All calls return as soon as the message
/// is queued; outcomes are observed through the [`TripBook`].
#[derive(Clone)]
pub struct RideClient {
    system: ActorSystem,
    trip_book: TripBook,
    mailbox_capacity: usize,
}

impl RideClient {
    pub fn new(system: ActorSystem, trip_book: TripBook) -> Self {
        let mailbox_capacity = system.config().default_mailbox_capacity;
        Self {
            system,
            trip_book,
            mailbox_capacity,
        }
    }

    /// Overrides the mailbox capacity used for actors spawned by this client.
    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn trip_book(&self) -> &TripBook {
        &self.trip_book
    }

    /// Spawns a driver actor and publishes its starting position.
    #[instrument(skip(self))]
    pub fn register_driver(
        &self,
        driver_id: &str,
        location: Location,
    ) -> Result<ActorRef, RideError> {
        let actor = self.system.spawn_actor(
            DRIVER,
            driver_id,
            self.mailbox_capacity,
            DriverHandler::new(driver_id, self.trip_book.clone()),
            SupervisionPolicy::Restart,
        )?;
        self.tell(driver_id, LOCATION_UPDATE, &LocationUpdate { location })?;
        info!(%driver_id, "Driver registered");
        Ok(actor)
    }

    #[instrument(skip(self))]
    pub fn register_passenger(&self, passenger_id: &str) -> Result<ActorRef, RideError> {
        let actor = self.system.spawn_actor(
            PASSENGER,
            passenger_id,
            self.mailbox_capacity,
            PassengerHandler::new(passenger_id, self.trip_book.clone()),
            SupervisionPolicy::Restart,
        )?;
        info!(%passenger_id, "Passenger registered");
        Ok(actor)
    }

    #[instrument(skip(self))]
    pub fn update_driver_location(
        &self,
        driver_id: &str,
        location: Location,
    ) -> Result<(), RideError> {
        self.tell(driver_id, LOCATION_UPDATE, &LocationUpdate { location })
    }

    /// Opens a ride request for `passenger_id` and returns the new trip id.
    #[instrument(skip(self))]
    pub fn request_ride(
        &self,
        passenger_id: &str,
        pickup: Location,
        dropoff: Location,
    ) -> Result<String, RideError> {
        let trip_id = format!("trip_{}", Uuid::new_v4().simple());
        let request = RideRequest {
            trip_id: trip_id.clone(),
            pickup,
            dropoff,
        };
        let message = Message::typed(REQUEST_RIDE, &request, None)?
            .with_correlation_id(trip_id.as_str());
        self.send(passenger_id, message)?;
        debug!(%trip_id, "Ride request queued");
        Ok(trip_id)
    }

    #[instrument(skip(self))]
    pub fn complete_trip(&self, driver_id: &str, trip_id: &str) -> Result<(), RideError> {
        let message = Message::typed(
            COMPLETE_TRIP,
            &TripRef {
                trip_id: trip_id.to_string(),
            },
            None,
        )?
        .with_correlation_id(trip_id);
        self.send(driver_id, message)
    }

    /// Takes a driver off the road: the matcher forgets it and its actor is stopped.
    #[instrument(skip(self))]
    pub async fn remove_driver(&self, driver_id: &str) -> Result<(), RideError> {
        self.system.stop_actor(driver_id).await?;
        info!(%driver_id, "Driver removed");
        Ok(())
    }

    fn tell<T: Serialize>(&self, id: &str, kind: &str, payload: &T) -> Result<(), RideError> {
        self.send(id, Message::typed(kind, payload, None)?)
    }
}

impl ActorClient for RideClient {
    type Error = RideError;

    fn system(&self) -> &ActorSystem {
        &self.system
    }
}

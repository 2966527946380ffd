//! Error types for the ride actors and the ride client.

use crate::framework::{HandlerError, RuntimeError};
use thiserror::Error;

/// Errors that can occur during ride operations.
#[derive(Debug, Error)]
pub enum RideError {
    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(#[from] RuntimeError),

    /// A payload could not be encoded or decoded.
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("Driver {driver_id} is busy with trip {trip_id}")]
    DriverBusy { driver_id: String, trip_id: String },

    #[error("Passenger {passenger_id} already has trip {trip_id}")]
    PassengerBusy {
        passenger_id: String,
        trip_id: String,
    },

    /// The referenced trip is not the one the actor is working on.
    #[error("Unknown trip: {0}")]
    UnknownTrip(String),

    #[error("Unsupported message kind: {0}")]
    UnsupportedMessage(String),
}

impl From<RideError> for HandlerError {
    fn from(e: RideError) -> Self {
        HandlerError::from_source(e)
    }
}

//! Message kinds and payloads exchanged by the ride actors.
//!
//! Payloads travel as JSON inside [`Message`](crate::framework::Message); these structs are
//! what handlers serialize with `Message::typed` and read back with `payload_as`.

use serde::{Deserialize, Serialize};

/// Identity of the single matcher actor.
pub const MATCHER_ID: &str = "matcher";

pub const DRIVER: &str = "driver";
pub const PASSENGER: &str = "passenger";
pub const MATCHER: &str = "matcher";

// Driver inbox
pub const LOCATION_UPDATE: &str = "location_update";
pub const ASSIGN_TRIP: &str = "assign_trip";
pub const COMPLETE_TRIP: &str = "complete_trip";

// Passenger inbox
pub const REQUEST_RIDE: &str = "request_ride";
pub const TRIP_ASSIGNED: &str = "trip_assigned";
pub const NO_DRIVER_AVAILABLE: &str = "no_driver_available";
pub const TRIP_COMPLETED: &str = "trip_completed";

// Matcher inbox
pub const DRIVER_AVAILABLE: &str = "driver_available";
pub const DRIVER_UNAVAILABLE: &str = "driver_unavailable";
pub const MATCH_REQUEST: &str = "match_request";

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the map, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &Location) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub trip_id: String,
    pub pickup: Location,
    pub dropoff: Location,
}

/// Sent by a passenger to the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRequest {
    pub trip_id: String,
    pub passenger_id: String,
    pub pickup: Location,
    pub dropoff: Location,
}

/// Sent by the matcher to the chosen driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripAssignment {
    pub trip_id: String,
    pub passenger_id: String,
    pub pickup: Location,
    pub dropoff: Location,
}

/// Sent by the matcher to the passenger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripAssigned {
    pub trip_id: String,
    pub driver_id: String,
    pub pickup_distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRef {
    pub trip_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverAvailable {
    pub driver_id: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverUnavailable {
    pub driver_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let paris = Location::new(48.8566, 2.3522);
        let london = Location::new(51.5074, -0.1278);
        let d = paris.distance_km(&london);
        assert!((d - 343.5).abs() < 1.0, "got {d}");
        assert_eq!(paris.distance_km(&paris), 0.0);
    }
}

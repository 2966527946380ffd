//! In-memory record of trips, shared by the ride actors.
//!
//! Actors write their outcomes here so callers outside the actor system (the client, tests,
//! the demo) can observe the result of asynchronous message flows.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TripStatus {
    Requested,
    Assigned,
    Unmatched,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub trip_id: String,
    pub passenger_id: String,
    pub driver_id: Option<String>,
    pub status: TripStatus,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cheap-to-clone handle to the shared trip table.
#[derive(Debug, Clone, Default)]
pub struct TripBook {
    trips: Arc<Mutex<HashMap<String, TripRecord>>>,
}

impl TripBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, trip_id: &str, passenger_id: &str) {
        let now = Utc::now();
        self.trips.lock().insert(
            trip_id.to_string(),
            TripRecord {
                trip_id: trip_id.to_string(),
                passenger_id: passenger_id.to_string(),
                driver_id: None,
                status: TripStatus::Requested,
                requested_at: now,
                updated_at: now,
            },
        );
    }

    pub fn assign(&self, trip_id: &str, driver_id: &str) {
        self.update(trip_id, |trip| {
            trip.driver_id = Some(driver_id.to_string());
            trip.status = TripStatus::Assigned;
        });
    }

    pub fn mark_unmatched(&self, trip_id: &str) {
        self.update(trip_id, |trip| trip.status = TripStatus::Unmatched);
    }

    pub fn complete(&self, trip_id: &str) {
        self.update(trip_id, |trip| trip.status = TripStatus::Completed);
    }

    pub fn get(&self, trip_id: &str) -> Option<TripRecord> {
        self.trips.lock().get(trip_id).cloned()
    }

    pub fn status(&self, trip_id: &str) -> Option<TripStatus> {
        self.trips.lock().get(trip_id).map(|trip| trip.status)
    }

    /// All trips, oldest request first.
    pub fn trips(&self) -> Vec<TripRecord> {
        let mut trips: Vec<TripRecord> = self.trips.lock().values().cloned().collect();
        trips.sort_by_key(|trip| trip.requested_at);
        trips
    }

    pub fn count(&self, status: TripStatus) -> usize {
        self.trips
            .lock()
            .values()
            .filter(|trip| trip.status == status)
            .count()
    }

    fn update(&self, trip_id: &str, f: impl FnOnce(&mut TripRecord)) {
        if let Some(trip) = self.trips.lock().get_mut(trip_id) {
            f(trip);
            trip.updated_at = Utc::now();
        }
    }
}

//! The matcher actor: pairs ride requests with the nearest available driver.

use crate::framework::{ActorContext, ActorHandler, HandlerError, Message, RuntimeError};
use crate::rides::error::RideError;
use crate::rides::messages::*;
use crate::rides::trip_book::TripBook;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Handler for the single matcher actor. Spawned with the `Resume` policy so the driver
/// pool survives a bad message.
pub struct MatcherHandler {
    available: HashMap<String, Location>,
    matched: u64,
    unmatched: u64,
    trip_book: TripBook,
}

impl MatcherHandler {
    pub fn new(trip_book: TripBook) -> Self {
        Self {
            available: HashMap::new(),
            matched: 0,
            unmatched: 0,
            trip_book,
        }
    }

    /// Closest available driver to `pickup`, ties broken by id.
    fn nearest(&self, pickup: &Location) -> Option<(String, f64)> {
        self.available
            .iter()
            .map(|(id, location)| (id, location.distance_km(pickup)))
            .min_by(|(a_id, a), (b_id, b)| a.total_cmp(b).then_with(|| a_id.cmp(b_id)))
            .map(|(id, distance)| (id.clone(), distance))
    }

    fn on_match(&mut self, request: MatchRequest, ctx: &ActorContext) -> Result<(), HandlerError> {
        while let Some((driver_id, distance)) = self.nearest(&request.pickup) {
            self.available.remove(&driver_id);

            let assignment = TripAssignment {
                trip_id: request.trip_id.clone(),
                passenger_id: request.passenger_id.clone(),
                pickup: request.pickup,
                dropoff: request.dropoff,
            };
            let message = Message::typed(ASSIGN_TRIP, &assignment, Some(MATCHER_ID))?
                .with_correlation_id(request.trip_id.as_str());
            match ctx.send(&driver_id, message) {
                Ok(()) => {}
                Err(RuntimeError::ActorNotFound(_)) | Err(RuntimeError::MailboxFull(_)) => {
                    warn!(
                        %driver_id,
                        trip_id = %request.trip_id,
                        "Driver unreachable, trying next"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            self.matched += 1;
            info!(%driver_id, trip_id = %request.trip_id, distance_km = distance, "Trip matched");
            let notice = Message::typed(
                TRIP_ASSIGNED,
                &TripAssigned {
                    trip_id: request.trip_id.clone(),
                    driver_id,
                    pickup_distance_km: distance,
                },
                Some(MATCHER_ID),
            )?
            .with_correlation_id(request.trip_id.as_str());
            ctx.send(&request.passenger_id, notice)?;
            return Ok(());
        }

        self.unmatched += 1;
        self.trip_book.mark_unmatched(&request.trip_id);
        info!(trip_id = %request.trip_id, "No driver available");
        let notice = Message::typed(
            NO_DRIVER_AVAILABLE,
            &TripRef {
                trip_id: request.trip_id.clone(),
            },
            Some(MATCHER_ID),
        )?
        .with_correlation_id(request.trip_id.as_str());
        ctx.send(&request.passenger_id, notice)?;
        Ok(())
    }
}

#[async_trait]
impl ActorHandler for MatcherHandler {
    async fn handle(&mut self, message: Message, ctx: &ActorContext) -> Result<(), HandlerError> {
        match message.kind() {
            DRIVER_AVAILABLE => {
                let available: DriverAvailable = message.payload_as()?;
                debug!(
                    driver_id = %available.driver_id,
                    pool = self.available.len() + 1,
                    "Driver available"
                );
                self.available.insert(available.driver_id, available.location);
                Ok(())
            }
            DRIVER_UNAVAILABLE => {
                let gone: DriverUnavailable = message.payload_as()?;
                self.available.remove(&gone.driver_id);
                Ok(())
            }
            MATCH_REQUEST => self.on_match(message.payload_as()?, ctx),
            other => Err(RideError::UnsupportedMessage(other.to_string()).into()),
        }
    }

    async fn on_stop(&mut self, _ctx: &ActorContext) {
        info!(
            matched = self.matched,
            unmatched = self.unmatched,
            pool = self.available.len(),
            "Matcher stopped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_prefers_closest_then_id() {
        let mut matcher = MatcherHandler::new(TripBook::new());
        let pickup = Location::new(52.52, 13.405);
        matcher.available.insert("d-far".into(), Location::new(52.60, 13.50));
        matcher.available.insert("d-b".into(), Location::new(52.521, 13.405));
        matcher.available.insert("d-a".into(), Location::new(52.521, 13.405));

        let (id, distance) = matcher.nearest(&pickup).unwrap();
        assert_eq!(id, "d-a");
        assert!(distance < 0.2);

        matcher.available.clear();
        assert!(matcher.nearest(&pickup).is_none());
    }
}

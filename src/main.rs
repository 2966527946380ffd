//! Demo: a handful of drivers and passengers in one city.
//!
//! Registers drivers and passengers, requests rides (more than there are drivers, so some
//! go unmatched), completes the matched trips and prints the final metrics.

use ride_actors::config::SystemConfig;
use ride_actors::lifecycle::{setup_tracing, RideSystem};
use ride_actors::rides::{Location, RideError, TripStatus};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

#[tokio::main]
async fn main() -> Result<(), RideError> {
    setup_tracing();

    let config = SystemConfig::from_env();
    info!(system = %config.name, "Starting ride demo");
    let interrupt = CancellationToken::new();
    let signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping actors");
            signal.cancel();
        }
    });

    let system = RideSystem::with_parent(config, &interrupt)?;
    let client = &system.client;

    let drivers = [
        ("driver-1", Location::new(52.5200, 13.4050)),
        ("driver-2", Location::new(52.5070, 13.3900)),
        ("driver-3", Location::new(52.5400, 13.4200)),
    ];
    for (id, location) in drivers {
        client.register_driver(id, location)?;
    }

    let passengers = ["alice", "bob", "carol", "dave"];
    for id in passengers {
        client.register_passenger(id)?;
    }

    // Let the drivers announce themselves to the matcher.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let trips = async {
        let mut trips = Vec::new();
        for (i, passenger) in passengers.iter().enumerate() {
            let offset = i as f64 * 0.004;
            let pickup = Location::new(52.515 + offset, 13.400 + offset);
            let dropoff = Location::new(52.490 - offset, 13.450);
            trips.push(client.request_ride(passenger, pickup, dropoff)?);
        }
        Ok::<_, RideError>(trips)
    }
    .instrument(info_span!("ride_requests"))
    .await?;

    tokio::time::sleep(Duration::from_millis(100)).await;

    for trip_id in &trips {
        let Some(trip) = system.trip_book.get(trip_id) else {
            continue;
        };
        match (trip.status, trip.driver_id) {
            (TripStatus::Assigned, Some(driver_id)) => {
                client.complete_trip(&driver_id, trip_id)?
            }
            (status, _) => warn!(
                %trip_id,
                passenger_id = %trip.passenger_id,
                ?status,
                "Trip not assigned"
            ),
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;

    info!(
        completed = system.trip_book.count(TripStatus::Completed),
        unmatched = system.trip_book.count(TripStatus::Unmatched),
        "Trips settled"
    );
    let metrics = system.metrics();
    println!("{}", serde_json::to_string_pretty(&metrics)?);

    system.shutdown().await?;
    info!("Demo completed successfully");
    Ok(())
}

//! Ride-matching actors built on the [`framework`](crate::framework) runtime.
//!
//! - [`DriverHandler`] - one per driver (`Restart`)
//! - [`PassengerHandler`] - one per passenger (`Restart`)
//! - [`MatcherHandler`] - a single matcher with the pool of idle drivers (`Resume`)
//!
//! A ride flows passenger → matcher → driver and passenger; outcomes land in the shared
//! [`TripBook`].

pub mod driver;
pub mod error;
pub mod matcher;
pub mod messages;
pub mod passenger;
pub mod trip_book;

pub use driver::DriverHandler;
pub use error::RideError;
pub use matcher::MatcherHandler;
pub use messages::Location;
pub use passenger::PassengerHandler;
pub use trip_book::{TripBook, TripRecord, TripStatus};

//! Typed clients over the [`ActorSystem`](crate::framework::ActorSystem).

pub mod ride_client;
pub mod traits;

pub use ride_client::*;
pub use traits::*;

//! Collaborator traits injected into the dispatch engine.

pub mod clock;
pub mod store;
pub mod transport;

pub use clock::{Clock, FixedClock, SystemClock};
pub use store::BirthdayStore;
pub use transport::PushTransport;

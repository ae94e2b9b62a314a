//! # Cakeday Core
//! Shared error type, configuration, record types, and the collaborator
//! traits (store, push transport, clock) the dispatch engine is built on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CakedayConfig;
pub use error::{CakedayError, Result};

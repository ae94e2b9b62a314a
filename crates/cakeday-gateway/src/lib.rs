//! # Cakeday Gateway
//! HTTP API: register birthdays, trigger passes, send greetings, and look
//! up public holidays.

pub mod holidays;
pub mod routes;
pub mod server;

pub use holidays::HolidayClient;
pub use server::{AppState, build_router, start_server};

//! HTTP client for the Courier platform API.

pub mod api;
pub mod middleware;

pub use api::{BotIdentity, CourierApiClient};

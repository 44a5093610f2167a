//! HTTP boundary of the matchmaking service

pub mod handlers;
pub mod server;

pub use handlers::{ApiError, ApiState};
pub use server::{router, ApiServer};

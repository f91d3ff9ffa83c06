//! FleetDesk API Library
//!
//! HTTP handlers, middleware and application setup for the FleetDesk back office.

mod api_doc;
pub mod constants;
mod handlers;
mod middleware;
pub mod utils;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use api_doc::get_openapi_spec;
pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, DbState};

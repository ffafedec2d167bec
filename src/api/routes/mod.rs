//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] — Job submission and inspection
//! - [`system`] — Health, host metrics, events, OpenAPI

mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` works in the router
pub use jobs::*;
pub use system::*;

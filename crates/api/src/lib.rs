//! PropDesk API server library.
//!
//! Config, state, error handling, auth, middleware, handlers and routes are
//! exposed here so the binary and the integration tests build the same app.

pub mod ai;
pub mod auth;
pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;

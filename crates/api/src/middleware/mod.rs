//! Request extractors and middleware.
//!
//! - [`auth::AuthUser`] -- the caller identified by a Bearer access token.
//! - [`rbac::RequireAdmin`] / [`rbac::RequireManager`] -- role gates.
//! - [`rate_limit`] -- fixed-window limits keyed by user or client IP.

pub mod auth;
pub mod rate_limit;
pub mod rbac;

//! Domain logic for PropDesk.
//!
//! This crate has no I/O. It holds the types, lifecycles, validation rules,
//! plan catalog and analytics reductions shared by the database, storage
//! and API layers.

pub mod access;
pub mod analytics;
pub mod billing;
pub mod blog;
pub mod error;
pub mod hashing;
pub mod pagination;
pub mod property;
pub mod rate_limit;
pub mod roles;
pub mod types;
pub mod uploads;
pub mod workflow;

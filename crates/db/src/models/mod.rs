//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod analytics;
pub mod blog_post;
pub mod inspection;
pub mod job;
pub mod notification;
pub mod property;
pub mod service_request;
pub mod session;
pub mod subscription;
pub mod unit;
pub mod upload;
pub mod user;

//! Credential handling.
//!
//! - [`password`] -- Argon2id hashing and strength checks.
//! - [`jwt`] -- access tokens and opaque refresh tokens.

pub mod jwt;
pub mod password;

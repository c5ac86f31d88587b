//! Refresh-token sessions.
//!
//! Only the SHA-256 hash of a refresh token is ever stored; the plaintext
//! goes to the client once and is never persisted.

use chrono::Duration;
use propdesk_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Row of `user_sessions`. Revoked rows are kept until housekeeping purges
/// them after expiry.
#[derive(Debug, Clone, FromRow)]
pub struct UserSession {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserSession {
    /// Whether the refresh token behind this row can still be exchanged.
    pub fn is_live(&self, now: Timestamp) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl CreateSession {
    /// A session for `user_id` that expires `lifetime_days` after `now`.
    pub fn lasting(
        user_id: DbId,
        refresh_token_hash: String,
        now: Timestamp,
        lifetime_days: i64,
    ) -> Self {
        Self {
            user_id,
            refresh_token_hash,
            expires_at: now + Duration::days(lifetime_days),
            user_agent: None,
            ip_address: None,
        }
    }

    /// Record where the token was issued to.
    pub fn issued_to(mut self, user_agent: Option<String>, ip_address: Option<String>) -> Self {
        self.user_agent = user_agent;
        self.ip_address = ip_address;
        self
    }
}

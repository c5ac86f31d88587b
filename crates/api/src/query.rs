//! Query-string types shared across handler modules.

use propdesk_core::pagination::{clamp_limit, clamp_offset, DEFAULT_LIMIT, MAX_LIMIT};
use serde::Deserialize;

/// `?limit=&offset=`.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PaginationParams {
    /// Clamped `(limit, offset)`.
    pub fn window(&self) -> (i64, i64) {
        (
            clamp_limit(self.limit, DEFAULT_LIMIT, MAX_LIMIT),
            clamp_offset(self.offset),
        )
    }
}

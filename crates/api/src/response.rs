//! Response envelopes.
//!
//! Successful responses are wrapped as `{"data": ...}`; list endpoints add
//! the total row count and the applied window.

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

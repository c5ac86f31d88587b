//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

use propdesk_core::workflow::StampColumn;

pub mod analytics_repo;
pub mod blog_post_repo;
pub mod inspection_repo;
pub mod job_repo;
pub mod notification_repo;
pub mod property_repo;
pub mod service_request_repo;
pub mod session_repo;
pub mod subscription_repo;
pub mod unit_repo;
pub mod upload_repo;
pub mod user_repo;

pub use analytics_repo::AnalyticsRepo;
pub use blog_post_repo::BlogPostRepo;
pub use inspection_repo::InspectionRepo;
pub use job_repo::JobRepo;
pub use notification_repo::NotificationRepo;
pub use property_repo::PropertyRepo;
pub use service_request_repo::ServiceRequestRepo;
pub use session_repo::SessionRepo;
pub use subscription_repo::SubscriptionRepo;
pub use unit_repo::UnitRepo;
pub use upload_repo::UploadRepo;
pub use user_repo::UserRepo;

/// Prefix every column in a `COLUMNS` list with `alias.`.
pub(crate) fn qualify(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `%term%` pattern for `ILIKE`, with LIKE wildcards in `term` escaped.
pub(crate) fn contains_pattern(term: Option<&str>) -> Option<String> {
    let term = term?.trim();
    if term.is_empty() {
        return None;
    }
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{escaped}%"))
}

/// `SET` fragment stamping the column a status change records.
pub(crate) fn stamp_assignment(stamp: Option<StampColumn>) -> &'static str {
    match stamp {
        Some(StampColumn::StartedAt) => ", started_at = NOW()",
        Some(StampColumn::CompletedAt) => ", completed_at = NOW()",
        Some(StampColumn::CancelledAt) => ", cancelled_at = NOW()",
        Some(StampColumn::ReviewedAt) => ", reviewed_at = NOW()",
        None => "",
    }
}

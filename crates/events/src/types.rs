//! Event type names published by the API.

pub const SERVICE_REQUEST_SUBMITTED: &str = "service_request.submitted";
pub const SERVICE_REQUEST_REVIEWED: &str = "service_request.reviewed";
pub const JOB_ASSIGNED: &str = "job.assigned";
pub const JOB_COMPLETED: &str = "job.completed";
pub const INSPECTION_SCHEDULED: &str = "inspection.scheduled";
pub const SUBSCRIPTION_CHANGED: &str = "subscription.changed";

/// Entity kinds carried in `PlatformEvent::source_entity_type`.
pub const ENTITY_SERVICE_REQUEST: &str = "service_request";
pub const ENTITY_JOB: &str = "job";
pub const ENTITY_INSPECTION: &str = "inspection";
pub const ENTITY_SUBSCRIPTION: &str = "subscription";

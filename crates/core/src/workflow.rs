//! Status lifecycles for inspections, maintenance jobs and service requests.
//!
//! Statuses are persisted as upper-case strings. Every change goes through
//! [`Lifecycle::transition`], which rejects moves the lifecycle does not
//! allow and reports which timestamp column the new status stamps.

use crate::error::CoreError;

/// Timestamp column set as a side effect of entering a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampColumn {
    StartedAt,
    CompletedAt,
    CancelledAt,
    ReviewedAt,
}

/// Shared behaviour of the status enums below.
pub trait Lifecycle: Copy + PartialEq + Sized + 'static {
    /// Entity name used in error messages.
    const ENTITY: &'static str;

    fn as_str(self) -> &'static str;
    fn parse(value: &str) -> Result<Self, CoreError>;
    fn allowed_next(self) -> &'static [Self];

    /// Column stamped with `NOW()` when entering this status.
    fn stamps(self) -> Option<StampColumn> {
        None
    }

    fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Validate `self -> next`, returning `next` on success.
    fn transition(self, next: Self) -> Result<Self, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidTransition {
                entity: Self::ENTITY,
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

macro_rules! define_lifecycle {
    (
        $(#[$meta:meta])*
        $name:ident ($entity:literal) {
            $( $variant:ident = $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant ),+
        }

        impl $name {
            /// Every status, in lifecycle order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(Lifecycle::as_str(*self))
            }
        }

        impl $name {
            fn wire(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }

            fn from_wire(value: &str) -> Result<Self, CoreError> {
                match value {
                    $( $wire => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        "Unknown {} status '{other}'",
                        $entity
                    ))),
                }
            }
        }
    };
}

define_lifecycle! {
    /// Inspection lifecycle.
    InspectionStatus ("Inspection") {
        Scheduled = "SCHEDULED",
        InProgress = "IN_PROGRESS",
        Completed = "COMPLETED",
        Cancelled = "CANCELLED",
    }
}

impl Lifecycle for InspectionStatus {
    const ENTITY: &'static str = "Inspection";

    fn as_str(self) -> &'static str {
        self.wire()
    }

    fn parse(value: &str) -> Result<Self, CoreError> {
        Self::from_wire(value)
    }

    fn allowed_next(self) -> &'static [Self] {
        use InspectionStatus::*;
        match self {
            Scheduled => &[InProgress, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    fn stamps(self) -> Option<StampColumn> {
        match self {
            Self::InProgress => Some(StampColumn::StartedAt),
            Self::Completed => Some(StampColumn::CompletedAt),
            Self::Cancelled => Some(StampColumn::CancelledAt),
            Self::Scheduled => None,
        }
    }
}

define_lifecycle! {
    /// Maintenance job lifecycle.
    JobStatus ("Job") {
        Open = "OPEN",
        Assigned = "ASSIGNED",
        InProgress = "IN_PROGRESS",
        Completed = "COMPLETED",
        Cancelled = "CANCELLED",
    }
}

impl Lifecycle for JobStatus {
    const ENTITY: &'static str = "Job";

    fn as_str(self) -> &'static str {
        self.wire()
    }

    fn parse(value: &str) -> Result<Self, CoreError> {
        Self::from_wire(value)
    }

    fn allowed_next(self) -> &'static [Self] {
        use JobStatus::*;
        match self {
            Open => &[Assigned, Cancelled],
            Assigned => &[InProgress, Open, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    fn stamps(self) -> Option<StampColumn> {
        match self {
            Self::InProgress => Some(StampColumn::StartedAt),
            Self::Completed => Some(StampColumn::CompletedAt),
            _ => None,
        }
    }
}

define_lifecycle! {
    /// Service request lifecycle.
    ServiceRequestStatus ("Service request") {
        Submitted = "SUBMITTED",
        UnderReview = "UNDER_REVIEW",
        Approved = "APPROVED",
        Rejected = "REJECTED",
        ConvertedToJob = "CONVERTED_TO_JOB",
        Completed = "COMPLETED",
        Cancelled = "CANCELLED",
    }
}

impl Lifecycle for ServiceRequestStatus {
    const ENTITY: &'static str = "Service request";

    fn as_str(self) -> &'static str {
        self.wire()
    }

    fn parse(value: &str) -> Result<Self, CoreError> {
        Self::from_wire(value)
    }

    fn allowed_next(self) -> &'static [Self] {
        use ServiceRequestStatus::*;
        match self {
            Submitted => &[UnderReview, Approved, Rejected, Cancelled],
            UnderReview => &[Approved, Rejected],
            Approved => &[ConvertedToJob],
            ConvertedToJob => &[Completed],
            Rejected | Completed | Cancelled => &[],
        }
    }

    fn stamps(self) -> Option<StampColumn> {
        match self {
            Self::Approved | Self::Rejected => Some(StampColumn::ReviewedAt),
            _ => None,
        }
    }
}

/// Job priority, shared by jobs and service requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "URGENT" => Ok(Self::Urgent),
            other => Err(CoreError::Validation(format!("Unknown priority '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }
}

/// Inspection kinds.
pub const INSPECTION_TYPES: &[&str] = &["ROUTINE", "MOVE_IN", "MOVE_OUT", "EMERGENCY"];

/// Service request categories.
pub const SERVICE_CATEGORIES: &[&str] = &[
    "PLUMBING",
    "ELECTRICAL",
    "HVAC",
    "APPLIANCE",
    "STRUCTURAL",
    "PEST",
    "OTHER",
];

/// Validate `value` against a fixed list of upper-case codes.
pub fn validate_code(kind: &str, value: &str, allowed: &[&str]) -> Result<(), CoreError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid {kind} '{value}'. Must be one of: {allowed:?}"
        )))
    }
}

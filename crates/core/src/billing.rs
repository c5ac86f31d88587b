//! Subscription plans, pricing and billing webhook verification.

use serde::Serialize;

use crate::error::CoreError;
use crate::hashing::{hmac_sha256_hex, verify_hmac_sha256_hex};
use crate::types::{Cents, Timestamp};

/// Length of the free trial granted to new property managers.
pub const TRIAL_DAYS: i64 = 14;

/// Plan a new property manager trials.
pub const TRIAL_PLAN: Plan = Plan::Basic;

/// Annual billing charges this many months for twelve months of service.
pub const ANNUAL_MONTHS_CHARGED: i64 = 10;

/// Maximum age of a signed webhook timestamp.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Basic,
    Professional,
    Enterprise,
}

/// Catalog entry returned by `GET /billing/plans`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub plan: Plan,
    pub name: &'static str,
    pub monthly_price_cents: Cents,
    pub annual_price_cents: Cents,
    /// `None` means unlimited.
    pub max_properties: Option<i64>,
}

impl Plan {
    pub const ALL: [Plan; 4] = [Plan::Free, Plan::Basic, Plan::Professional, Plan::Enterprise];

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "free" => Ok(Self::Free),
            "basic" => Ok(Self::Basic),
            "professional" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            other => Err(CoreError::Validation(format!("Unknown plan '{other}'"))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Basic => "basic",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Free => "Free",
            Self::Basic => "Basic",
            Self::Professional => "Professional",
            Self::Enterprise => "Enterprise",
        }
    }

    pub fn monthly_price_cents(self) -> Cents {
        match self {
            Self::Free => 0,
            Self::Basic => 2_900,
            Self::Professional => 7_900,
            Self::Enterprise => 19_900,
        }
    }

    pub fn max_properties(self) -> Option<i64> {
        match self {
            Self::Free => Some(1),
            Self::Basic => Some(10),
            Self::Professional => Some(50),
            Self::Enterprise => None,
        }
    }

    pub fn is_paid(self) -> bool {
        self != Self::Free
    }

    pub fn info(self) -> PlanInfo {
        PlanInfo {
            plan: self,
            name: self.display_name(),
            monthly_price_cents: self.monthly_price_cents(),
            annual_price_cents: self.monthly_price_cents() * ANNUAL_MONTHS_CHARGED,
            max_properties: self.max_properties(),
        }
    }
}

/// The full plan catalog in ascending price order.
pub fn catalog() -> Vec<PlanInfo> {
    Plan::ALL.iter().map(|p| p.info()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BillingInterval {
    Monthly,
    Annual,
}

impl BillingInterval {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "monthly" => Ok(Self::Monthly),
            "annual" => Ok(Self::Annual),
            other => Err(CoreError::Validation(format!(
                "Unknown billing interval '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Annual => "annual",
        }
    }

    /// Length of one billing period in days.
    pub fn period_days(self) -> i64 {
        match self {
            Self::Monthly => 30,
            Self::Annual => 365,
        }
    }
}

/// Price charged per billing period.
pub fn period_price_cents(plan: Plan, interval: BillingInterval) -> Cents {
    match interval {
        BillingInterval::Monthly => plan.monthly_price_cents(),
        BillingInterval::Annual => plan.monthly_price_cents() * ANNUAL_MONTHS_CHARGED,
    }
}

/// Recurring value per month. Annual prices are spread over twelve months,
/// rounded half-up to whole cents.
pub fn monthly_value_cents(plan: Plan, interval: BillingInterval) -> Cents {
    match interval {
        BillingInterval::Monthly => plan.monthly_price_cents(),
        BillingInterval::Annual => {
            let annual = period_price_cents(plan, interval);
            (annual + 6) / 12
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "trialing" => Ok(Self::Trialing),
            "active" => Ok(Self::Active),
            "past_due" => Ok(Self::PastDue),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(CoreError::Validation(format!(
                "Unknown subscription status '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Whether the subscription currently produces recurring revenue.
    pub fn is_revenue_generating(self) -> bool {
        matches!(self, Self::Active | Self::PastDue)
    }
}

/// The fields of a subscription row that decide which plan applies.
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionState {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
}

/// Plan whose limits apply right now.
///
/// Lapsed trials, expired subscriptions and cancellations past the end of
/// the paid period fall back to the free plan. `past_due` keeps its plan
/// while the provider retries the charge.
pub fn effective_plan(state: Option<&SubscriptionState>, now: Timestamp) -> Plan {
    let Some(state) = state else {
        return Plan::Free;
    };
    match state.status {
        SubscriptionStatus::Active | SubscriptionStatus::PastDue => state.plan,
        SubscriptionStatus::Trialing => match state.trial_ends_at {
            Some(end) if end > now => state.plan,
            _ => Plan::Free,
        },
        SubscriptionStatus::Cancelled => match state.current_period_end {
            Some(end) if end > now => state.plan,
            _ => Plan::Free,
        },
        SubscriptionStatus::Expired => Plan::Free,
    }
}

/// Error for a manager whose plan allows no more than `max` properties.
pub fn property_limit_error(plan: Plan, max: i64) -> CoreError {
    CoreError::LimitExceeded(format!(
        "The {} plan allows {max} propert{}; upgrade to add more",
        plan.display_name(),
        if max == 1 { "y" } else { "ies" }
    ))
}

// ---------------------------------------------------------------------------
// Webhook signatures
// ---------------------------------------------------------------------------

/// Build the signature header value for `payload` signed at `timestamp`.
///
/// Format: `t=<unix seconds>,v1=<hex hmac-sha256 of "{t}.{payload}">`.
pub fn sign_webhook(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = webhook_hmac(secret, timestamp, payload);
    format!("t={timestamp},v1={signature}")
}

fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    signed
}

fn webhook_hmac(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    hmac_sha256_hex(secret.as_bytes(), &signed_payload(timestamp, payload))
}

/// Verify a webhook signature header against the raw request body.
///
/// Any `v1` entry may match (providers send several during secret
/// rotation). Stale or future timestamps beyond the tolerance fail.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> Result<(), CoreError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| CoreError::Unauthorized("Webhook signature missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(CoreError::Unauthorized(
            "Webhook signature missing v1 entry".into(),
        ));
    }
    if now_unix.abs_diff(timestamp) > WEBHOOK_TOLERANCE_SECS.unsigned_abs() {
        return Err(CoreError::Unauthorized(
            "Webhook timestamp outside tolerance".into(),
        ));
    }

    let signed = signed_payload(timestamp, payload);
    if signatures
        .iter()
        .any(|sig| verify_hmac_sha256_hex(secret.as_bytes(), &signed, sig))
    {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("Webhook signature mismatch".into()))
    }
}

//! Subscription entity model and DTOs.

use propdesk_core::billing::{BillingInterval, Plan, SubscriptionState, SubscriptionStatus};
use propdesk_core::error::CoreError;
use propdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subscription {
    pub id: DbId,
    pub user_id: DbId,
    pub plan: String,
    pub billing_interval: String,
    pub status: String,
    pub trial_ends_at: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: bool,
    pub cancelled_at: Option<Timestamp>,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Typed view used for plan-limit decisions.
    pub fn state(&self) -> Result<SubscriptionState, CoreError> {
        Ok(SubscriptionState {
            plan: Plan::parse(&self.plan)?,
            status: SubscriptionStatus::parse(&self.status)?,
            trial_ends_at: self.trial_ends_at,
            current_period_end: self.current_period_end,
        })
    }

    pub fn interval(&self) -> Result<BillingInterval, CoreError> {
        BillingInterval::parse(&self.billing_interval)
    }
}

/// Full upsert of a user's subscription.
#[derive(Debug)]
pub struct UpsertSubscription {
    pub user_id: DbId,
    pub plan: String,
    pub billing_interval: String,
    pub status: String,
    pub trial_ends_at: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
}

/// Body for `POST /billing/subscription`.
#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan: String,
    pub billing_interval: Option<String>,
}

/// Body for `POST /billing/subscription/cancel`.
#[derive(Debug, Default, Deserialize)]
pub struct CancelSubscriptionRequest {
    /// Cancel right away instead of at the end of the paid period.
    #[serde(default)]
    pub immediately: bool,
}

/// Fields a payment-provider webhook may update. Matched by
/// `external_subscription_id`, falling back to `user_id`.
#[derive(Debug, Default)]
pub struct WebhookSubscriptionUpdate {
    pub user_id: Option<DbId>,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub plan: Option<String>,
    pub billing_interval: Option<String>,
    pub status: Option<String>,
    pub current_period_end: Option<Timestamp>,
    pub cancel_at_period_end: Option<bool>,
}

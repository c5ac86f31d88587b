//! Handlers for `/billing`: plan catalog, the caller's subscription and the
//! payment-provider webhook.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use propdesk_core::billing::{
    catalog, effective_plan, monthly_value_cents, verify_webhook_signature, BillingInterval,
    Plan, PlanInfo, SubscriptionStatus,
};
use propdesk_core::error::CoreError;
use propdesk_core::types::{Cents, DbId};
use propdesk_db::models::subscription::{
    CancelSubscriptionRequest, ChangePlanRequest, Subscription, UpsertSubscription,
    WebhookSubscriptionUpdate,
};
use propdesk_db::repositories::{PropertyRepo, SubscriptionRepo};
use propdesk_events::types::{ENTITY_SUBSCRIPTION, SUBSCRIPTION_CHANGED};
use propdesk_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireManager;
use crate::response::DataResponse;
use crate::state::AppState;

/// Header carrying `t=<unix>,v1=<hex>`.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-billing-signature";

/// The subscription row (if any) and the plan whose limits apply now.
pub(crate) async fn current_plan(
    state: &AppState,
    user_id: DbId,
) -> AppResult<(Option<Subscription>, Plan)> {
    let subscription = SubscriptionRepo::find_by_user(&state.pool, user_id).await?;
    let subscription_state = subscription.as_ref().map(Subscription::state).transpose()?;
    let plan = effective_plan(subscription_state.as_ref(), Utc::now());
    Ok((subscription, plan))
}

#[derive(Debug, Serialize)]
pub struct SubscriptionOverview {
    pub subscription: Option<Subscription>,
    pub effective_plan: PlanInfo,
    pub monthly_value_cents: Cents,
    pub property_count: i64,
}

/// GET /api/billing/plans
pub async fn list_plans() -> Json<DataResponse<Vec<PlanInfo>>> {
    Json(DataResponse { data: catalog() })
}

/// GET /api/billing/subscription
pub async fn get_subscription(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<SubscriptionOverview>>> {
    let ((subscription, plan), property_count) = tokio::try_join!(
        current_plan(&state, user.user_id),
        async {
            PropertyRepo::count_active_for_manager(&state.pool, user.user_id)
                .await
                .map_err(AppError::from)
        },
    )?;

    let interval = match &subscription {
        Some(sub) => sub.interval()?,
        None => BillingInterval::Monthly,
    };
    Ok(Json(DataResponse {
        data: SubscriptionOverview {
            subscription,
            effective_plan: plan.info(),
            monthly_value_cents: monthly_value_cents(plan, interval),
            property_count,
        },
    }))
}

/// POST /api/billing/subscription
///
/// Switches plan and starts a fresh billing period. Downgrades that would
/// leave the manager over the new plan's property allowance are refused.
pub async fn change_plan(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    Json(input): Json<ChangePlanRequest>,
) -> AppResult<Json<DataResponse<Subscription>>> {
    let plan = Plan::parse(&input.plan)?;
    let (existing, _) = current_plan(&state, user.user_id).await?;
    let interval = match (input.billing_interval.as_deref(), &existing) {
        (Some(raw), _) => BillingInterval::parse(raw)?,
        (None, Some(sub)) => sub.interval()?,
        (None, None) => BillingInterval::Monthly,
    };

    let owned = PropertyRepo::count_active_for_manager(&state.pool, user.user_id).await?;
    if let Some(max) = plan.max_properties() {
        if owned > max {
            return Err(CoreError::LimitExceeded(format!(
                "The {} plan allows {max} properties but {owned} are active; archive some first",
                plan.display_name()
            ))
            .into());
        }
    }

    let period_end = Utc::now() + chrono::Duration::days(interval.period_days());
    let subscription = SubscriptionRepo::upsert(
        &state.pool,
        &UpsertSubscription {
            user_id: user.user_id,
            plan: plan.as_str().to_string(),
            billing_interval: interval.as_str().to_string(),
            status: SubscriptionStatus::Active.as_str().to_string(),
            trial_ends_at: None,
            current_period_end: Some(period_end),
        },
    )
    .await?;

    publish_changed(&state, &subscription, Some(user.user_id));
    tracing::info!(
        user_id = user.user_id,
        plan = plan.as_str(),
        interval = interval.as_str(),
        "Subscription plan changed"
    );
    Ok(Json(DataResponse { data: subscription }))
}

/// POST /api/billing/subscription/cancel
///
/// By default the subscription runs to the end of the paid period;
/// `{"immediately": true}` ends it now.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<CancelSubscriptionRequest>>,
) -> AppResult<Json<DataResponse<Subscription>>> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let updated = if input.immediately {
        SubscriptionRepo::cancel_now(&state.pool, user.user_id).await?
    } else {
        SubscriptionRepo::schedule_cancellation(&state.pool, user.user_id).await?
    };
    let subscription = updated
        .ok_or_else(|| CoreError::Conflict("No active subscription to cancel".into()))?;

    publish_changed(&state, &subscription, Some(user.user_id));
    tracing::info!(
        user_id = user.user_id,
        immediately = input.immediately,
        "Subscription cancelled"
    );
    Ok(Json(DataResponse { data: subscription }))
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

/// Provider event envelope.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookSubscriptionData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookSubscriptionData {
    pub user_id: Option<DbId>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub plan: Option<String>,
    pub interval: Option<String>,
    pub status: Option<String>,
    /// Unix seconds.
    pub current_period_end: Option<i64>,
    pub cancel_at_period_end: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    pub applied: bool,
}

/// Translate a provider event into a subscription update. `None` for event
/// types that do not touch subscriptions.
pub fn webhook_update(event: WebhookEvent) -> Result<Option<WebhookSubscriptionUpdate>, CoreError> {
    let data = event.data;
    let forced_status = match event.event_type.as_str() {
        "subscription.created" | "subscription.updated" => None,
        "subscription.deleted" => Some(SubscriptionStatus::Cancelled),
        "invoice.paid" => Some(SubscriptionStatus::Active),
        "invoice.payment_failed" => Some(SubscriptionStatus::PastDue),
        _ => return Ok(None),
    };

    if data.user_id.is_none() && data.subscription_id.is_none() {
        return Err(CoreError::Validation(
            "Webhook data needs user_id or subscription_id".into(),
        ));
    }
    let plan = data.plan.as_deref().map(Plan::parse).transpose()?;
    let interval = data
        .interval
        .as_deref()
        .map(BillingInterval::parse)
        .transpose()?;
    let status = match forced_status {
        Some(status) => Some(status),
        None => data
            .status
            .as_deref()
            .map(SubscriptionStatus::parse)
            .transpose()?,
    };
    let current_period_end = match data.current_period_end {
        Some(secs) => Some(DateTime::<Utc>::from_timestamp(secs, 0).ok_or_else(|| {
            CoreError::Validation(format!("Invalid current_period_end {secs}"))
        })?),
        None => None,
    };

    Ok(Some(WebhookSubscriptionUpdate {
        user_id: data.user_id,
        external_customer_id: data.customer_id,
        external_subscription_id: data.subscription_id,
        plan: plan.map(|p| p.as_str().to_string()),
        billing_interval: interval.map(|i| i.as_str().to_string()),
        status: status.map(|s| s.as_str().to_string()),
        current_period_end,
        cancel_at_period_end: data.cancel_at_period_end,
    }))
}

/// POST /api/billing/webhook
///
/// Authenticated by the HMAC signature header, not a bearer token.
/// Unknown event types and unmatched subscriptions are acknowledged so the
/// provider does not retry them.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let secret = state
        .config
        .billing
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("Billing webhooks are not configured".into()))?;
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| CoreError::Unauthorized("Missing webhook signature".into()))?;
    verify_webhook_signature(secret, signature, &body, Utc::now().timestamp())?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook payload: {e}")))?;
    let event_type = event.event_type.clone();

    let Some(update) = webhook_update(event)? else {
        tracing::debug!(event_type, "Ignoring webhook event");
        return Ok(Json(WebhookAck {
            received: true,
            applied: false,
        }));
    };

    match SubscriptionRepo::apply_webhook(&state.pool, &update).await? {
        Some(subscription) => {
            publish_changed(&state, &subscription, None);
            tracing::info!(
                event_type,
                subscription_id = subscription.id,
                status = %subscription.status,
                "Webhook applied"
            );
            Ok(Json(WebhookAck {
                received: true,
                applied: true,
            }))
        }
        None => {
            tracing::warn!(
                event_type,
                external_subscription_id = ?update.external_subscription_id,
                user_id = ?update.user_id,
                "Webhook matched no subscription"
            );
            Ok(Json(WebhookAck {
                received: true,
                applied: false,
            }))
        }
    }
}

fn publish_changed(state: &AppState, subscription: &Subscription, actor: Option<DbId>) {
    let mut event = PlatformEvent::new(SUBSCRIPTION_CHANGED)
        .with_source(ENTITY_SUBSCRIPTION, subscription.id)
        .with_payload(json!({ "plan": subscription.plan, "status": subscription.status }));
    if let Some(actor) = actor {
        event = event.with_actor(actor);
    }
    state.event_bus.publish(event);
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn event(event_type: &str, data: WebhookSubscriptionData) -> WebhookEvent {
        WebhookEvent {
            event_type: event_type.into(),
            data,
        }
    }

    #[test]
    fn payment_failure_marks_past_due() {
        let update = webhook_update(event(
            "invoice.payment_failed",
            WebhookSubscriptionData {
                subscription_id: Some("sub_1".into()),
                status: Some("active".into()),
                ..Default::default()
            },
        ))
        .unwrap()
        .unwrap();
        assert_eq!(update.status.as_deref(), Some("past_due"));
        assert_eq!(update.external_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn period_end_is_converted_from_unix_seconds() {
        let update = webhook_update(event(
            "subscription.updated",
            WebhookSubscriptionData {
                user_id: Some(7),
                plan: Some("professional".into()),
                current_period_end: Some(1_700_000_000),
                ..Default::default()
            },
        ))
        .unwrap()
        .unwrap();
        assert_eq!(update.plan.as_deref(), Some("professional"));
        assert_eq!(update.current_period_end.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let update = webhook_update(event("charge.refunded", WebhookSubscriptionData::default()));
        assert_matches!(update, Ok(None));
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let update = webhook_update(event(
            "subscription.updated",
            WebhookSubscriptionData {
                user_id: Some(1),
                plan: Some("platinum".into()),
                ..Default::default()
            },
        ));
        assert_matches!(update, Err(CoreError::Validation(_)));
    }

    #[test]
    fn events_without_a_key_are_rejected() {
        let update = webhook_update(event(
            "subscription.updated",
            WebhookSubscriptionData::default(),
        ));
        assert_matches!(update, Err(CoreError::Validation(_)));
    }
}

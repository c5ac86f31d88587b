//! Repository for the `subscriptions` table.

use propdesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::subscription::{Subscription, UpsertSubscription, WebhookSubscriptionUpdate};

const COLUMNS: &str = "id, user_id, plan, billing_interval, status, trial_ends_at, \
                        current_period_end, cancel_at_period_end, cancelled_at, \
                        external_customer_id, external_subscription_id, created_at, updated_at";

pub struct SubscriptionRepo;

impl SubscriptionRepo {
    pub async fn find_by_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subscriptions WHERE user_id = $1");
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Start a trial. Does nothing if the user already has a subscription.
    pub async fn create_trial(
        pool: &PgPool,
        user_id: DbId,
        plan: &str,
        trial_ends_at: Timestamp,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions (user_id, plan, status, trial_ends_at)
             VALUES ($1, $2, 'trialing', $3)
             ON CONFLICT ON CONSTRAINT uq_subscriptions_user DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .bind(plan)
            .bind(trial_ends_at)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the user's subscription, clearing any pending
    /// cancellation.
    pub async fn upsert(
        pool: &PgPool,
        input: &UpsertSubscription,
    ) -> Result<Subscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO subscriptions (user_id, plan, billing_interval, status, trial_ends_at,
                                        current_period_end)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT ON CONSTRAINT uq_subscriptions_user DO UPDATE SET
                plan = EXCLUDED.plan,
                billing_interval = EXCLUDED.billing_interval,
                status = EXCLUDED.status,
                trial_ends_at = EXCLUDED.trial_ends_at,
                current_period_end = EXCLUDED.current_period_end,
                cancel_at_period_end = false,
                cancelled_at = NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(input.user_id)
            .bind(&input.plan)
            .bind(&input.billing_interval)
            .bind(&input.status)
            .bind(input.trial_ends_at)
            .bind(input.current_period_end)
            .fetch_one(pool)
            .await
    }

    /// Flag the subscription to end with its current period.
    pub async fn schedule_cancellation(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET cancel_at_period_end = true
             WHERE user_id = $1 AND status IN ('active', 'past_due')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Cancel now. Trials and paid plans both end immediately.
    pub async fn cancel_now(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = NOW(),
                cancel_at_period_end = false,
                current_period_end = LEAST(COALESCE(current_period_end, NOW()), NOW())
             WHERE user_id = $1 AND status IN ('trialing', 'active', 'past_due')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply a provider webhook. Rows are matched by external subscription
    /// id first, then by user id.
    pub async fn apply_webhook(
        pool: &PgPool,
        update: &WebhookSubscriptionUpdate,
    ) -> Result<Option<Subscription>, sqlx::Error> {
        let query = format!(
            "UPDATE subscriptions SET
                external_customer_id = COALESCE($3, external_customer_id),
                external_subscription_id = COALESCE($2, external_subscription_id),
                plan = COALESCE($4, plan),
                billing_interval = COALESCE($5, billing_interval),
                status = COALESCE($6, status),
                current_period_end = COALESCE($7, current_period_end),
                cancel_at_period_end = COALESCE($8, cancel_at_period_end),
                cancelled_at = CASE
                    WHEN $6 = 'cancelled' AND cancelled_at IS NULL THEN NOW()
                    ELSE cancelled_at END
             WHERE id = (
                SELECT id FROM subscriptions
                WHERE ($2::TEXT IS NOT NULL AND external_subscription_id = $2)
                   OR ($1::BIGINT IS NOT NULL AND user_id = $1)
                ORDER BY (external_subscription_id = $2) DESC NULLS LAST
                LIMIT 1
             )
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Subscription>(&query)
            .bind(update.user_id)
            .bind(&update.external_subscription_id)
            .bind(&update.external_customer_id)
            .bind(&update.plan)
            .bind(&update.billing_interval)
            .bind(&update.status)
            .bind(update.current_period_end)
            .bind(update.cancel_at_period_end)
            .fetch_optional(pool)
            .await
    }

    /// Mark trials past their end date as expired. Returns the count.
    pub async fn expire_lapsed_trials(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired'
             WHERE status = 'trialing' AND trial_ends_at < NOW()",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Cancel subscriptions flagged `cancel_at_period_end` whose period has
    /// ended. Returns the user ids affected.
    pub async fn roll_scheduled_cancellations(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = NOW(),
                cancel_at_period_end = false
             WHERE cancel_at_period_end = true
               AND current_period_end < NOW()
               AND status IN ('active', 'past_due')
             RETURNING user_id",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn owner_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT user_id FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

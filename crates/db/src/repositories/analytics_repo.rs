//! Row fetches behind the admin dashboard and analytics endpoints.
//!
//! Aggregation beyond simple counts happens in `propdesk_core::analytics`.

use propdesk_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::analytics::{DashboardCounts, SubscriptionFactRow, UserFactRow};

pub struct AnalyticsRepo;

impl AnalyticsRepo {
    pub async fn dashboard_counts(pool: &PgPool) -> Result<DashboardCounts, sqlx::Error> {
        sqlx::query_as::<_, DashboardCounts>(
            "SELECT
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM users WHERE is_active) AS active_users,
                (SELECT COUNT(*) FROM properties WHERE archived_at IS NULL) AS total_properties,
                (SELECT COUNT(*) FROM units u JOIN properties p ON p.id = u.property_id
                  WHERE p.archived_at IS NULL) AS total_units,
                (SELECT COUNT(*) FROM units u JOIN properties p ON p.id = u.property_id
                  WHERE p.archived_at IS NULL AND u.status = 'OCCUPIED') AS occupied_units,
                (SELECT COUNT(*) FROM jobs
                  WHERE archived_at IS NULL
                    AND status IN ('OPEN', 'ASSIGNED', 'IN_PROGRESS')) AS open_jobs,
                (SELECT COUNT(*) FROM service_requests
                  WHERE status IN ('SUBMITTED', 'UNDER_REVIEW')) AS pending_service_requests,
                (SELECT COUNT(*) FROM inspections
                  WHERE status = 'SCHEDULED' AND scheduled_date >= NOW()) AS upcoming_inspections",
        )
        .fetch_one(pool)
        .await
    }

    pub async fn subscription_facts(pool: &PgPool) -> Result<Vec<SubscriptionFactRow>, sqlx::Error> {
        sqlx::query_as::<_, SubscriptionFactRow>(
            "SELECT plan, billing_interval, status, created_at, cancelled_at FROM subscriptions",
        )
        .fetch_all(pool)
        .await
    }

    /// One row per user with the facts the signup funnel needs.
    ///
    /// `started_trial` covers anyone whose subscription began as a trial;
    /// `converted_to_paid` anyone currently on a paid, revenue-generating
    /// plan.
    pub async fn user_facts(pool: &PgPool) -> Result<Vec<UserFactRow>, sqlx::Error> {
        sqlx::query_as::<_, UserFactRow>(
            "SELECT
                u.role,
                u.created_at,
                u.last_login_at,
                EXISTS(SELECT 1 FROM properties p WHERE p.manager_id = u.id) AS has_property,
                EXISTS(SELECT 1 FROM subscriptions s
                        WHERE s.user_id = u.id AND s.trial_ends_at IS NOT NULL) AS started_trial,
                EXISTS(SELECT 1 FROM subscriptions s
                        WHERE s.user_id = u.id
                          AND s.plan <> 'free'
                          AND s.status IN ('active', 'past_due')) AS converted_to_paid
             FROM users u",
        )
        .fetch_all(pool)
        .await
    }

    /// Signup times since `since`, for the daily signups series.
    pub async fn signups_since(pool: &PgPool, since: Timestamp) -> Result<Vec<Timestamp>, sqlx::Error> {
        sqlx::query_scalar("SELECT created_at FROM users WHERE created_at >= $1")
            .bind(since)
            .fetch_all(pool)
            .await
    }

    /// Status of every live job.
    pub async fn job_statuses(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT status FROM jobs WHERE archived_at IS NULL")
            .fetch_all(pool)
            .await
    }

    pub async fn service_request_statuses(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT status FROM service_requests")
            .fetch_all(pool)
            .await
    }

    pub async fn user_roles(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT role FROM users WHERE is_active")
            .fetch_all(pool)
            .await
    }
}

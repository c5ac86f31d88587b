//! Periodic database housekeeping.
//!
//! One pass runs five independent tasks. A failing task is logged and the
//! rest still run; the pass itself never fails.

use std::time::Duration;

use propdesk_db::repositories::{JobRepo, NotificationRepo, SessionRepo, SubscriptionRepo};
use serde::Serialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::HousekeepingConfig;

/// Rows touched by one pass. `None` marks a task that failed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HousekeepingReport {
    pub archived_jobs: Option<u64>,
    pub purged_sessions: Option<u64>,
    pub expired_trials: Option<u64>,
    pub purged_notifications: Option<u64>,
    pub cancelled_subscriptions: Option<u64>,
}

impl HousekeepingReport {
    pub fn failures(&self) -> usize {
        [
            self.archived_jobs,
            self.purged_sessions,
            self.expired_trials,
            self.purged_notifications,
            self.cancelled_subscriptions,
        ]
        .iter()
        .filter(|r| r.is_none())
        .count()
    }
}

fn record(task: &'static str, result: Result<u64, sqlx::Error>) -> Option<u64> {
    match result {
        Ok(0) => {
            tracing::debug!(task, "Housekeeping: nothing to do");
            Some(0)
        }
        Ok(count) => {
            tracing::info!(task, count, "Housekeeping: task completed");
            Some(count)
        }
        Err(e) => {
            tracing::error!(task, error = %e, "Housekeeping: task failed");
            None
        }
    }
}

/// Run every housekeeping task once.
pub async fn run_once(pool: &PgPool, config: &HousekeepingConfig) -> HousekeepingReport {
    let archived_jobs = record(
        "archive_completed_jobs",
        JobRepo::archive_completed_older_than(pool, config.job_archive_after_days).await,
    );
    let purged_sessions = record("purge_sessions", SessionRepo::cleanup_expired(pool).await);
    let expired_trials = record(
        "expire_trials",
        SubscriptionRepo::expire_lapsed_trials(pool).await,
    );
    let purged_notifications = record(
        "purge_notifications",
        NotificationRepo::purge_read_older_than(pool, config.notification_retention_days).await,
    );
    let cancelled_subscriptions = record(
        "roll_cancellations",
        SubscriptionRepo::roll_scheduled_cancellations(pool)
            .await
            .map(|users| users.len() as u64),
    );

    HousekeepingReport {
        archived_jobs,
        purged_sessions,
        expired_trials,
        purged_notifications,
        cancelled_subscriptions,
    }
}

/// Run [`run_once`] every `interval_secs` until `cancel` fires. The first
/// pass runs immediately.
pub async fn run(pool: PgPool, config: HousekeepingConfig, cancel: CancellationToken) {
    let period = Duration::from_secs(config.interval_secs.max(1));
    tracing::info!(
        interval_secs = period.as_secs(),
        job_archive_after_days = config.job_archive_after_days,
        "Housekeeping job started"
    );

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Housekeeping job stopping");
                break;
            }
            _ = interval.tick() => {
                let report = run_once(&pool, &config).await;
                if report.failures() > 0 {
                    tracing::warn!(failures = report.failures(), "Housekeeping pass had failures");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_count_missing_results() {
        let report = HousekeepingReport {
            archived_jobs: Some(3),
            purged_sessions: None,
            expired_trials: Some(0),
            purged_notifications: None,
            cancelled_subscriptions: Some(1),
        };
        assert_eq!(report.failures(), 2);
        assert_eq!(HousekeepingReport::default().failures(), 5);
    }
}

//! Admin analytics reductions.
//!
//! Repositories fetch raw rows; everything here is pure so the dashboard
//! numbers can be tested without a database.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::billing::{monthly_value_cents, BillingInterval, Plan, SubscriptionStatus};
use crate::roles::Role;
use crate::types::{Cents, Timestamp};

/// Subscription fields analytics needs.
#[derive(Debug, Clone)]
pub struct SubscriptionFact {
    pub plan: Plan,
    pub interval: BillingInterval,
    pub status: SubscriptionStatus,
    pub created_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
}

/// User fields analytics needs, pre-joined with property and billing facts.
#[derive(Debug, Clone)]
pub struct UserFact {
    pub role: Role,
    pub created_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
    pub has_property: bool,
    pub started_trial: bool,
    pub converted_to_paid: bool,
}

fn rate(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

// ---------------------------------------------------------------------------
// Revenue
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlanRevenue {
    pub subscribers: i64,
    pub mrr_cents: Cents,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MrrSummary {
    pub mrr_cents: Cents,
    pub arr_cents: Cents,
    pub paying_subscribers: i64,
    pub trialing_subscribers: i64,
    pub by_plan: BTreeMap<String, PlanRevenue>,
}

/// Monthly and annual recurring revenue.
///
/// Only `active` and `past_due` subscriptions count. Annual plans
/// contribute a twelfth of their yearly price.
pub fn mrr_summary(subs: &[SubscriptionFact]) -> MrrSummary {
    let mut summary = MrrSummary::default();
    for sub in subs {
        if sub.status == SubscriptionStatus::Trialing {
            summary.trialing_subscribers += 1;
        }
        if !sub.status.is_revenue_generating() || !sub.plan.is_paid() {
            continue;
        }
        let value = monthly_value_cents(sub.plan, sub.interval);
        summary.mrr_cents += value;
        summary.paying_subscribers += 1;
        let entry = summary.by_plan.entry(sub.plan.as_str().to_string()).or_default();
        entry.subscribers += 1;
        entry.mrr_cents += value;
    }
    summary.arr_cents = summary.mrr_cents * 12;
    summary
}

/// Share of subscriptions active at `period_start` that were cancelled
/// before `period_end`.
pub fn churn_rate(subs: &[SubscriptionFact], period_start: Timestamp, period_end: Timestamp) -> f64 {
    let active_at_start: Vec<&SubscriptionFact> = subs
        .iter()
        .filter(|s| s.plan.is_paid())
        .filter(|s| s.created_at <= period_start)
        .filter(|s| s.cancelled_at.map_or(true, |c| c > period_start))
        .collect();
    let churned = active_at_start
        .iter()
        .filter(|s| s.cancelled_at.is_some_and(|c| c <= period_end))
        .count();
    rate(churned as i64, active_at_start.len() as i64)
}

// ---------------------------------------------------------------------------
// Funnel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelStage {
    pub stage: &'static str,
    pub count: i64,
    /// Conversion from the previous stage.
    pub step_rate: f64,
    /// Conversion from the first stage.
    pub overall_rate: f64,
}

pub const FUNNEL_STAGES: [&str; 4] = [
    "registered",
    "created_property",
    "started_trial",
    "converted_to_paid",
];

/// Property-manager signup funnel.
pub fn signup_funnel(users: &[UserFact]) -> Vec<FunnelStage> {
    let managers: Vec<&UserFact> = users
        .iter()
        .filter(|u| u.role == Role::PropertyManager)
        .collect();

    let counts = [
        managers.len() as i64,
        managers.iter().filter(|u| u.has_property).count() as i64,
        managers.iter().filter(|u| u.started_trial).count() as i64,
        managers.iter().filter(|u| u.converted_to_paid).count() as i64,
    ];

    let top = counts[0];
    FUNNEL_STAGES
        .iter()
        .zip(counts)
        .enumerate()
        .map(|(i, (&stage, count))| FunnelStage {
            stage,
            count,
            step_rate: if i == 0 {
                rate(count, top)
            } else {
                rate(count, counts[i - 1])
            },
            overall_rate: rate(count, top),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortRetention {
    /// `YYYY-MM` of signup.
    pub cohort: String,
    pub size: i64,
    pub retained: i64,
    pub retention_rate: f64,
}

/// Monthly signup cohorts and how many users logged in within the last
/// `active_window_days`.
pub fn cohort_retention(
    users: &[UserFact],
    now: Timestamp,
    active_window_days: i64,
) -> Vec<CohortRetention> {
    let active_since = now - Duration::days(active_window_days);
    let mut cohorts: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for user in users {
        let key = format!("{:04}-{:02}", user.created_at.year(), user.created_at.month());
        let entry = cohorts.entry(key).or_default();
        entry.0 += 1;
        if user.last_login_at.is_some_and(|t| t >= active_since) {
            entry.1 += 1;
        }
    }

    cohorts
        .into_iter()
        .map(|(cohort, (size, retained))| CohortRetention {
            cohort,
            size,
            retained,
            retention_rate: rate(retained, size),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

/// Per-day counts for the `days` days ending today, oldest first, with
/// missing days filled with zero.
pub fn daily_series(timestamps: &[Timestamp], days: i64, now: Timestamp) -> Vec<DailyCount> {
    let days = days.max(1);
    let today = now.date_naive();
    let first = today - Duration::days(days - 1);

    let mut counts: BTreeMap<NaiveDate, i64> = (0..days)
        .map(|offset| (first + Duration::days(offset), 0))
        .collect();
    for ts in timestamps {
        if let Some(count) = counts.get_mut(&ts.date_naive()) {
            *count += 1;
        }
    }
    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Count occurrences of each status string.
pub fn status_breakdown<I, S>(statuses: I) -> BTreeMap<String, i64>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut out = BTreeMap::new();
    for status in statuses {
        *out.entry(status.into()).or_insert(0) += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn sub(plan: Plan, interval: BillingInterval, status: SubscriptionStatus) -> SubscriptionFact {
        SubscriptionFact {
            plan,
            interval,
            status,
            created_at: at(2026, 1, 1),
            cancelled_at: None,
        }
    }

    fn manager(has_property: bool, started_trial: bool, converted: bool) -> UserFact {
        UserFact {
            role: Role::PropertyManager,
            created_at: at(2026, 1, 5),
            last_login_at: None,
            has_property,
            started_trial,
            converted_to_paid: converted,
        }
    }

    #[test]
    fn mrr_counts_active_and_past_due_only() {
        let subs = vec![
            sub(Plan::Basic, BillingInterval::Monthly, SubscriptionStatus::Active),
            sub(Plan::Professional, BillingInterval::Annual, SubscriptionStatus::PastDue),
            sub(Plan::Enterprise, BillingInterval::Monthly, SubscriptionStatus::Trialing),
            sub(Plan::Enterprise, BillingInterval::Monthly, SubscriptionStatus::Cancelled),
            sub(Plan::Free, BillingInterval::Monthly, SubscriptionStatus::Active),
        ];
        let summary = mrr_summary(&subs);
        // 2900 + round(79000 / 12) = 2900 + 6583
        assert_eq!(summary.mrr_cents, 9_483);
        assert_eq!(summary.arr_cents, 9_483 * 12);
        assert_eq!(summary.paying_subscribers, 2);
        assert_eq!(summary.trialing_subscribers, 1);
        assert_eq!(summary.by_plan["basic"].mrr_cents, 2_900);
        assert!(!summary.by_plan.contains_key("enterprise"));
    }

    #[test]
    fn empty_inputs_produce_zero_rates() {
        assert_eq!(mrr_summary(&[]), MrrSummary::default());
        let funnel = signup_funnel(&[]);
        assert_eq!(funnel.len(), 4);
        assert!(funnel.iter().all(|s| s.count == 0 && s.step_rate == 0.0));
        assert!(cohort_retention(&[], at(2026, 3, 1), 30).is_empty());
        assert_eq!(churn_rate(&[], at(2026, 1, 1), at(2026, 2, 1)), 0.0);
    }

    #[test]
    fn funnel_rates() {
        let mut users = vec![
            manager(true, true, true),
            manager(true, true, false),
            manager(true, false, false),
            manager(false, false, false),
        ];
        users.push(UserFact {
            role: Role::Tenant,
            ..manager(true, true, true)
        });
        let funnel = signup_funnel(&users);
        assert_eq!(funnel[0].count, 4);
        assert_eq!(funnel[1].count, 3);
        assert_eq!(funnel[1].step_rate, 0.75);
        assert_eq!(funnel[2].count, 2);
        assert_eq!(funnel[3].count, 1);
        assert_eq!(funnel[3].step_rate, 0.5);
        assert_eq!(funnel[3].overall_rate, 0.25);
    }

    #[test]
    fn retention_groups_by_month() {
        let now = at(2026, 3, 15);
        let users = vec![
            UserFact {
                created_at: at(2026, 1, 3),
                last_login_at: Some(at(2026, 3, 10)),
                ..manager(false, false, false)
            },
            UserFact {
                created_at: at(2026, 1, 20),
                last_login_at: Some(at(2026, 1, 21)),
                ..manager(false, false, false)
            },
            UserFact {
                created_at: at(2026, 2, 2),
                last_login_at: None,
                ..manager(false, false, false)
            },
        ];
        let cohorts = cohort_retention(&users, now, 30);
        assert_eq!(cohorts.len(), 2);
        assert_eq!(cohorts[0].cohort, "2026-01");
        assert_eq!(cohorts[0].size, 2);
        assert_eq!(cohorts[0].retained, 1);
        assert_eq!(cohorts[0].retention_rate, 0.5);
        assert_eq!(cohorts[1].cohort, "2026-02");
        assert_eq!(cohorts[1].retention_rate, 0.0);
    }

    #[test]
    fn churn_counts_cancellations_in_period() {
        let mut cancelled = sub(Plan::Basic, BillingInterval::Monthly, SubscriptionStatus::Cancelled);
        cancelled.cancelled_at = Some(at(2026, 2, 10));
        let mut cancelled_before = cancelled.clone();
        cancelled_before.cancelled_at = Some(at(2026, 1, 15));
        let mut joined_later = sub(Plan::Basic, BillingInterval::Monthly, SubscriptionStatus::Active);
        joined_later.created_at = at(2026, 2, 5);

        let subs = vec![
            cancelled,
            cancelled_before,
            joined_later,
            sub(Plan::Basic, BillingInterval::Monthly, SubscriptionStatus::Active),
        ];
        // active at Feb 1: `cancelled` and the last one
        assert_eq!(churn_rate(&subs, at(2026, 2, 1), at(2026, 3, 1)), 0.5);
    }

    #[test]
    fn daily_series_zero_fills_oldest_first() {
        let now = at(2026, 3, 10);
        let series = daily_series(&[at(2026, 3, 10), at(2026, 3, 10), at(2026, 3, 8), at(2026, 1, 1)], 3, now);
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
        assert_eq!(
            series.iter().map(|d| d.count).collect::<Vec<_>>(),
            vec![1, 0, 2]
        );
    }

    #[test]
    fn breakdown_counts() {
        let b = status_breakdown(["OPEN", "OPEN", "COMPLETED"]);
        assert_eq!(b["OPEN"], 2);
        assert_eq!(b["COMPLETED"], 1);
    }
}

//! Repository for the `jobs` table.

use propdesk_core::types::DbId;
use propdesk_core::workflow::{JobStatus, Lifecycle, ServiceRequestStatus};
use sqlx::PgPool;

use crate::models::job::{CreateJob, Job, JobFilter, UpdateJob};
use crate::repositories::{qualify, stamp_assignment};
use crate::scope::AccessScope;

pub(crate) const COLUMNS: &str = "id, property_id, unit_id, service_request_id, created_by, \
                        assigned_to, title, description, priority, status, scheduled_date, \
                        started_at, completed_at, estimated_cost_cents, actual_cost_cents, \
                        archived_at, created_at, updated_at";

fn list_conditions(scope: &AccessScope) -> String {
    format!(
        "j.archived_at IS NULL
           AND {}
           AND ($2::BIGINT IS NULL OR j.property_id = $2)
           AND ($3::TEXT IS NULL OR j.status = $3)
           AND ($4::TEXT IS NULL OR j.priority = $4)
           AND ($5::BIGINT IS NULL OR j.assigned_to = $5)",
        scope.job_predicate("j", 1)
    )
}

pub struct JobRepo;

impl JobRepo {
    /// Insert a new `OPEN` job.
    pub async fn create(
        pool: &PgPool,
        input: &CreateJob,
        priority: &str,
        created_by: DbId,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (property_id, unit_id, created_by, title, description, priority,
                               scheduled_date, estimated_cost_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(input.property_id)
            .bind(input.unit_id)
            .bind(created_by)
            .bind(&input.title)
            .bind(&input.description)
            .bind(priority)
            .bind(input.scheduled_date)
            .bind(input.estimated_cost_cents)
            .fetch_one(pool)
            .await
    }

    /// Find a non-archived job by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = $1 AND archived_at IS NULL");
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Jobs visible in `scope`, most urgent and newest first.
    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &JobFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM jobs j
             WHERE {}
             ORDER BY CASE j.priority
                        WHEN 'URGENT' THEN 0 WHEN 'HIGH' THEN 1
                        WHEN 'MEDIUM' THEN 2 ELSE 3 END,
                      j.created_at DESC
             LIMIT $6 OFFSET $7",
            qualify(COLUMNS, "j"),
            list_conditions(scope)
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(scope.bind_value())
            .bind(filter.property_id)
            .bind(&filter.status)
            .bind(&filter.priority)
            .bind(filter.assigned_to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &JobFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM jobs j WHERE {}", list_conditions(scope));
        sqlx::query_scalar(&query)
            .bind(scope.bind_value())
            .bind(filter.property_id)
            .bind(&filter.status)
            .bind(&filter.priority)
            .bind(filter.assigned_to)
            .fetch_one(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateJob,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                priority = COALESCE($4, priority),
                scheduled_date = COALESCE($5, scheduled_date),
                estimated_cost_cents = COALESCE($6, estimated_cost_cents),
                actual_cost_cents = COALESCE($7, actual_cost_cents)
             WHERE id = $1 AND archived_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.priority)
            .bind(input.scheduled_date)
            .bind(input.estimated_cost_cents)
            .bind(input.actual_cost_cents)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear the assignee together with the matching status change.
    ///
    /// Compare-and-set on `from`; `None` means the job moved meanwhile.
    pub async fn assign(
        pool: &PgPool,
        id: DbId,
        technician_id: Option<DbId>,
        from: JobStatus,
        to: JobStatus,
    ) -> Result<Option<Job>, sqlx::Error> {
        let query = format!(
            "UPDATE jobs SET assigned_to = $2, status = $4
             WHERE id = $1 AND status = $3 AND archived_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(technician_id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Move `from -> to`, stamping lifecycle timestamps.
    ///
    /// Completing a job also completes the service request it came from, in
    /// the same transaction.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: JobStatus,
        to: JobStatus,
        actual_cost_cents: Option<i64>,
    ) -> Result<Option<Job>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "UPDATE jobs SET
                status = $3,
                actual_cost_cents = COALESCE($4, actual_cost_cents){}
             WHERE id = $1 AND status = $2 AND archived_at IS NULL
             RETURNING {COLUMNS}",
            stamp_assignment(to.stamps())
        );
        let job = sqlx::query_as::<_, Job>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(actual_cost_cents)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(job) = job else {
            tx.rollback().await?;
            return Ok(None);
        };

        if to == JobStatus::Completed {
            if let Some(request_id) = job.service_request_id {
                sqlx::query(
                    "UPDATE service_requests SET status = $3
                     WHERE id = $1 AND status = $2",
                )
                .bind(request_id)
                .bind(ServiceRequestStatus::ConvertedToJob.as_str())
                .bind(ServiceRequestStatus::Completed.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(Some(job))
    }

    /// Soft-delete a job. Returns `true` if the row was archived.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE jobs SET archived_at = NOW() WHERE id = $1 AND archived_at IS NULL")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Archive jobs completed more than `days` ago. Returns the count.
    pub async fn archive_completed_older_than(pool: &PgPool, days: i32) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE jobs SET archived_at = NOW()
             WHERE archived_at IS NULL
               AND status = 'COMPLETED'
               AND completed_at < NOW() - make_interval(days => $1)",
        )
        .bind(days)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Technician currently holding the job, if any.
    pub async fn assignee_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        let assignee: Option<Option<DbId>> =
            sqlx::query_scalar("SELECT assigned_to FROM jobs WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        Ok(assignee.flatten())
    }

    pub async fn property_manager_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT p.manager_id FROM jobs j
             JOIN properties p ON p.id = j.property_id
             WHERE j.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

//! Repository for the `service_requests` table.

use propdesk_core::types::DbId;
use propdesk_core::workflow::{Lifecycle, ServiceRequestStatus};
use sqlx::PgPool;

use crate::models::job::Job;
use crate::models::service_request::{
    ConvertToJob, CreateServiceRequest, ServiceRequest, ServiceRequestFilter,
};
use crate::repositories::{job_repo, qualify, stamp_assignment};
use crate::scope::AccessScope;

const COLUMNS: &str = "id, property_id, unit_id, requested_by, reviewed_by, title, description, \
                        category, priority, status, review_notes, job_id, reviewed_at, \
                        created_at, updated_at";

fn list_conditions(scope: &AccessScope) -> String {
    format!(
        "{}
           AND ($2::BIGINT IS NULL OR sr.property_id = $2)
           AND ($3::TEXT IS NULL OR sr.status = $3)
           AND ($4::TEXT IS NULL OR sr.category = $4)",
        scope.service_request_predicate("sr", 1)
    )
}

pub struct ServiceRequestRepo;

impl ServiceRequestRepo {
    /// Insert a new `SUBMITTED` request.
    pub async fn create(
        pool: &PgPool,
        input: &CreateServiceRequest,
        category: &str,
        priority: &str,
        requested_by: DbId,
    ) -> Result<ServiceRequest, sqlx::Error> {
        let query = format!(
            "INSERT INTO service_requests (property_id, unit_id, requested_by, title, description,
                                           category, priority)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(input.property_id)
            .bind(input.unit_id)
            .bind(requested_by)
            .bind(&input.title)
            .bind(&input.description)
            .bind(category)
            .bind(priority)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM service_requests WHERE id = $1");
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &ServiceRequestFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM service_requests sr
             WHERE {}
             ORDER BY sr.created_at DESC
             LIMIT $5 OFFSET $6",
            qualify(COLUMNS, "sr"),
            list_conditions(scope)
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(scope.bind_value())
            .bind(filter.property_id)
            .bind(&filter.status)
            .bind(&filter.category)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &ServiceRequestFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM service_requests sr WHERE {}",
            list_conditions(scope)
        );
        sqlx::query_scalar(&query)
            .bind(scope.bind_value())
            .bind(filter.property_id)
            .bind(&filter.status)
            .bind(&filter.category)
            .fetch_one(pool)
            .await
    }

    /// Compare-and-set status change. Review outcomes record the reviewer.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: ServiceRequestStatus,
        to: ServiceRequestStatus,
        reviewer_id: Option<DbId>,
        review_notes: Option<&str>,
    ) -> Result<Option<ServiceRequest>, sqlx::Error> {
        let query = format!(
            "UPDATE service_requests SET
                status = $3,
                reviewed_by = COALESCE($4, reviewed_by),
                review_notes = COALESCE($5, review_notes){}
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}",
            stamp_assignment(to.stamps())
        );
        sqlx::query_as::<_, ServiceRequest>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(reviewer_id)
            .bind(review_notes)
            .fetch_optional(pool)
            .await
    }

    /// Create a job from an approved request and link the two, atomically.
    ///
    /// Returns `None` (and writes nothing) if the request is no longer
    /// `APPROVED`.
    pub async fn convert_to_job(
        pool: &PgPool,
        request: &ServiceRequest,
        input: &ConvertToJob,
        priority: &str,
        created_by: DbId,
    ) -> Result<Option<(ServiceRequest, Job)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let job_status = if input.assigned_to.is_some() {
            "ASSIGNED"
        } else {
            "OPEN"
        };
        let job_query = format!(
            "INSERT INTO jobs (property_id, unit_id, service_request_id, created_by, assigned_to,
                               title, description, priority, status, scheduled_date,
                               estimated_cost_cents)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {}",
            job_repo::COLUMNS
        );
        let job = sqlx::query_as::<_, Job>(&job_query)
            .bind(request.property_id)
            .bind(request.unit_id)
            .bind(request.id)
            .bind(created_by)
            .bind(input.assigned_to)
            .bind(input.title.as_deref().unwrap_or(&request.title))
            .bind(&request.description)
            .bind(priority)
            .bind(job_status)
            .bind(input.scheduled_date)
            .bind(input.estimated_cost_cents)
            .fetch_one(&mut *tx)
            .await?;

        let request_query = format!(
            "UPDATE service_requests SET status = $3, job_id = $4
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, ServiceRequest>(&request_query)
            .bind(request.id)
            .bind(ServiceRequestStatus::Approved.as_str())
            .bind(ServiceRequestStatus::ConvertedToJob.as_str())
            .bind(job.id)
            .fetch_optional(&mut *tx)
            .await?;

        match updated {
            Some(updated) => {
                tx.commit().await?;
                Ok(Some((updated, job)))
            }
            None => {
                tx.rollback().await?;
                Ok(None)
            }
        }
    }

    /// Manager of the property a request was filed against.
    pub async fn property_manager_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        let manager: Option<DbId> = sqlx::query_scalar(
            "SELECT p.manager_id FROM service_requests sr
             JOIN properties p ON p.id = sr.property_id
             WHERE sr.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(manager)
    }

    pub async fn requester_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT requested_by FROM service_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

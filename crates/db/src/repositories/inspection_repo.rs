//! Repository for the `inspections` table.

use propdesk_core::types::DbId;
use propdesk_core::workflow::{InspectionStatus, Lifecycle};
use sqlx::PgPool;

use crate::models::inspection::{CreateInspection, Inspection, InspectionFilter, UpdateInspection};
use crate::repositories::{qualify, stamp_assignment};
use crate::scope::AccessScope;

const COLUMNS: &str = "id, property_id, unit_id, inspector_id, inspection_type, status, \
                        scheduled_date, started_at, completed_at, cancelled_at, notes, \
                        findings, created_at, updated_at";

fn list_conditions(scope: &AccessScope) -> String {
    format!(
        "{}
           AND ($2::BIGINT IS NULL OR i.property_id = $2)
           AND ($3::TEXT IS NULL OR i.status = $3)
           AND ($4::TIMESTAMPTZ IS NULL OR i.scheduled_date >= $4)
           AND ($5::TIMESTAMPTZ IS NULL OR i.scheduled_date < $5)",
        scope.property_predicate("i.property_id", 1)
    )
}

pub struct InspectionRepo;

impl InspectionRepo {
    /// Insert a new inspection in the `SCHEDULED` state.
    pub async fn create(
        pool: &PgPool,
        input: &CreateInspection,
        inspection_type: &str,
    ) -> Result<Inspection, sqlx::Error> {
        let query = format!(
            "INSERT INTO inspections (property_id, unit_id, inspector_id, inspection_type,
                                      scheduled_date, notes)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(input.property_id)
            .bind(input.unit_id)
            .bind(input.inspector_id)
            .bind(inspection_type)
            .bind(input.scheduled_date)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM inspections WHERE id = $1");
        sqlx::query_as::<_, Inspection>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Inspections visible in `scope`, soonest first.
    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &InspectionFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Inspection>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM inspections i
             WHERE {}
             ORDER BY i.scheduled_date ASC, i.id ASC
             LIMIT $6 OFFSET $7",
            qualify(COLUMNS, "i"),
            list_conditions(scope)
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(scope.bind_value())
            .bind(filter.property_id)
            .bind(&filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &InspectionFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM inspections i WHERE {}",
            list_conditions(scope)
        );
        sqlx::query_scalar(&query)
            .bind(scope.bind_value())
            .bind(filter.property_id)
            .bind(&filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_one(pool)
            .await
    }

    /// Edit a scheduled inspection. Returns `None` once it has started.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateInspection,
    ) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!(
            "UPDATE inspections SET
                inspector_id = COALESCE($2, inspector_id),
                inspection_type = COALESCE($3, inspection_type),
                scheduled_date = COALESCE($4, scheduled_date),
                notes = COALESCE($5, notes)
             WHERE id = $1 AND status = 'SCHEDULED'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(id)
            .bind(input.inspector_id)
            .bind(&input.inspection_type)
            .bind(input.scheduled_date)
            .bind(&input.notes)
            .fetch_optional(pool)
            .await
    }

    /// Move `from -> to`, stamping the lifecycle timestamp.
    ///
    /// The `WHERE status = from` guard makes the change a compare-and-set;
    /// `None` means another request changed the status first.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: InspectionStatus,
        to: InspectionStatus,
        findings: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Option<Inspection>, sqlx::Error> {
        let query = format!(
            "UPDATE inspections SET
                status = $3,
                findings = COALESCE($4, findings),
                notes = COALESCE($5, notes){}
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}",
            stamp_assignment(to.stamps())
        );
        sqlx::query_as::<_, Inspection>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(findings)
            .bind(notes)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM inspections WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Tenant of the inspected unit. `None` for whole-property inspections
    /// and vacant units.
    pub async fn unit_tenant_of(pool: &PgPool, id: DbId) -> Result<Option<DbId>, sqlx::Error> {
        let tenant: Option<Option<DbId>> = sqlx::query_scalar(
            "SELECT u.tenant_id FROM inspections i
             JOIN units u ON u.id = i.unit_id
             WHERE i.id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(tenant.flatten())
    }
}

//! Repository for the `units` table.

use propdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::unit::{CreateUnit, Unit, UpdateUnit};

const COLUMNS: &str = "id, property_id, unit_number, bedrooms, bathrooms, area, rent_cents, \
                        status, tenant_id, created_at, updated_at";

pub struct UnitRepo;

impl UnitRepo {
    pub async fn create(pool: &PgPool, input: &CreateUnit) -> Result<Unit, sqlx::Error> {
        let query = format!(
            "INSERT INTO units (property_id, unit_number, bedrooms, bathrooms, area, rent_cents, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Unit>(&query)
            .bind(input.property_id)
            .bind(&input.unit_number)
            .bind(input.bedrooms)
            .bind(input.bathrooms)
            .bind(input.area)
            .bind(input.rent_cents)
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Unit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM units WHERE id = $1");
        sqlx::query_as::<_, Unit>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All units of a property ordered by unit number.
    pub async fn list_for_property(
        pool: &PgPool,
        property_id: DbId,
    ) -> Result<Vec<Unit>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM units WHERE property_id = $1 ORDER BY unit_number"
        );
        sqlx::query_as::<_, Unit>(&query)
            .bind(property_id)
            .fetch_all(pool)
            .await
    }

    /// Units rented by `tenant_id`.
    pub async fn list_for_tenant(pool: &PgPool, tenant_id: DbId) -> Result<Vec<Unit>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM units WHERE tenant_id = $1 ORDER BY id");
        sqlx::query_as::<_, Unit>(&query)
            .bind(tenant_id)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUnit,
    ) -> Result<Option<Unit>, sqlx::Error> {
        let query = format!(
            "UPDATE units SET
                unit_number = COALESCE($2, unit_number),
                bedrooms = COALESCE($3, bedrooms),
                bathrooms = COALESCE($4, bathrooms),
                area = COALESCE($5, area),
                rent_cents = COALESCE($6, rent_cents),
                status = COALESCE($7, status)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Unit>(&query)
            .bind(id)
            .bind(&input.unit_number)
            .bind(input.bedrooms)
            .bind(input.bathrooms)
            .bind(input.area)
            .bind(input.rent_cents)
            .bind(&input.status)
            .fetch_optional(pool)
            .await
    }

    /// Move a tenant in (`Some`) or out (`None`). Occupancy status follows.
    pub async fn set_tenant(
        pool: &PgPool,
        id: DbId,
        tenant_id: Option<DbId>,
    ) -> Result<Option<Unit>, sqlx::Error> {
        let query = format!(
            "UPDATE units SET
                tenant_id = $2,
                status = CASE WHEN $2::BIGINT IS NULL THEN 'VACANT' ELSE 'OCCUPIED' END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Unit>(&query)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

//! Repository for the `properties` and `property_owners` tables.

use propdesk_core::access::PropertyRelation;
use propdesk_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::property::{
    CreateProperty, Property, PropertyFilter, PropertyOwner, PropertySummary, UpdateProperty,
};
use crate::repositories::{contains_pattern, qualify};
use crate::scope::AccessScope;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, manager_id, name, address_line1, address_line2, city, state, \
                        postcode, country, property_type, status, total_area, year_built, \
                        description, image_url, archived_at, created_at, updated_at";

/// Shared `WHERE` body for list and count. Placeholders: `$1` scope,
/// `$2` status, `$3` type, `$4` city, `$5` search pattern.
fn list_conditions(scope: &AccessScope) -> String {
    format!(
        "p.archived_at IS NULL
           AND {}
           AND ($2::TEXT IS NULL OR p.status = $2)
           AND ($3::TEXT IS NULL OR p.property_type = $3)
           AND ($4::TEXT IS NULL OR p.city ILIKE $4)
           AND ($5::TEXT IS NULL OR p.name ILIKE $5 OR p.address_line1 ILIKE $5)",
        scope.property_predicate("p.id", 1)
    )
}

pub struct PropertyRepo;

impl PropertyRepo {
    pub async fn create(pool: &PgPool, input: &CreateProperty) -> Result<Property, sqlx::Error> {
        insert(pool, input).await
    }

    /// Insert a property unless the manager already has `max` active ones.
    ///
    /// The manager's user row is locked for the count and insert, so
    /// concurrent creates for one manager cannot both take the last slot.
    /// `None` when the limit is reached; `max = None` means unlimited.
    pub async fn create_within_limit(
        pool: &PgPool,
        input: &CreateProperty,
        max: Option<i64>,
    ) -> Result<Option<Property>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(input.manager_id)
            .execute(&mut *tx)
            .await?;

        if let Some(max) = max {
            let owned: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM properties WHERE manager_id = $1 AND archived_at IS NULL",
            )
            .bind(input.manager_id)
            .fetch_one(&mut *tx)
            .await?;
            if owned >= max {
                tx.rollback().await?;
                return Ok(None);
            }
        }

        let property = insert(&mut *tx, input).await?;
        tx.commit().await?;
        Ok(Some(property))
    }

    /// Find a non-archived property by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Property>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM properties WHERE id = $1 AND archived_at IS NULL");
        sqlx::query_as::<_, Property>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List properties visible in `scope`, newest first, with unit counts.
    pub async fn list(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &PropertyFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PropertySummary>, sqlx::Error> {
        let query = format!(
            "SELECT {},
                    COUNT(u.id) AS unit_count,
                    COUNT(u.id) FILTER (WHERE u.status = 'OCCUPIED') AS occupied_units
             FROM properties p
             LEFT JOIN units u ON u.property_id = p.id
             WHERE {}
             GROUP BY p.id
             ORDER BY p.created_at DESC
             LIMIT $6 OFFSET $7",
            qualify(COLUMNS, "p"),
            list_conditions(scope),
        );
        sqlx::query_as::<_, PropertySummary>(&query)
            .bind(scope.bind_value())
            .bind(&filter.status)
            .bind(&filter.property_type)
            .bind(contains_pattern(filter.city.as_deref()))
            .bind(contains_pattern(filter.search.as_deref()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn count(
        pool: &PgPool,
        scope: &AccessScope,
        filter: &PropertyFilter,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM properties p WHERE {}",
            list_conditions(scope)
        );
        sqlx::query_scalar(&query)
            .bind(scope.bind_value())
            .bind(&filter.status)
            .bind(&filter.property_type)
            .bind(contains_pattern(filter.city.as_deref()))
            .bind(contains_pattern(filter.search.as_deref()))
            .fetch_one(pool)
            .await
    }

    /// Update a property. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProperty,
    ) -> Result<Option<Property>, sqlx::Error> {
        let query = format!(
            "UPDATE properties SET
                name = COALESCE($2, name),
                address_line1 = COALESCE($3, address_line1),
                address_line2 = COALESCE($4, address_line2),
                city = COALESCE($5, city),
                state = COALESCE($6, state),
                postcode = COALESCE($7, postcode),
                country = COALESCE($8, country),
                property_type = COALESCE($9, property_type),
                status = COALESCE($10, status),
                total_area = COALESCE($11, total_area),
                year_built = COALESCE($12, year_built),
                description = COALESCE($13, description),
                image_url = COALESCE($14, image_url)
             WHERE id = $1 AND archived_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Property>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.address_line1)
            .bind(&input.address_line2)
            .bind(&input.city)
            .bind(&input.state)
            .bind(&input.postcode)
            .bind(&input.country)
            .bind(&input.property_type)
            .bind(&input.status)
            .bind(input.total_area)
            .bind(input.year_built)
            .bind(&input.description)
            .bind(&input.image_url)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a property. Returns `true` if the row was archived.
    pub async fn archive(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE properties SET archived_at = NOW() WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Non-archived properties managed by `manager_id`; drives plan limits.
    pub async fn count_active_for_manager(
        pool: &PgPool,
        manager_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM properties WHERE manager_id = $1 AND archived_at IS NULL",
        )
        .bind(manager_id)
        .fetch_one(pool)
        .await
    }

    /// How `user_id` relates to a property. `None` when the property does
    /// not exist or is archived.
    pub async fn relation(
        pool: &PgPool,
        property_id: DbId,
        user_id: DbId,
    ) -> Result<Option<PropertyRelation>, sqlx::Error> {
        let row: Option<(bool, bool, bool, bool)> = sqlx::query_as(
            "SELECT
                p.manager_id = $2,
                EXISTS(SELECT 1 FROM property_owners o
                       WHERE o.property_id = p.id AND o.owner_id = $2),
                EXISTS(SELECT 1 FROM units u
                       WHERE u.property_id = p.id AND u.tenant_id = $2),
                EXISTS(SELECT 1 FROM jobs j
                       WHERE j.property_id = p.id AND j.assigned_to = $2
                         AND j.archived_at IS NULL)
             FROM properties p
             WHERE p.id = $1 AND p.archived_at IS NULL",
        )
        .bind(property_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(
            |(is_manager, is_owner, is_tenant, is_assigned_technician)| PropertyRelation {
                is_manager,
                is_owner,
                is_tenant,
                is_assigned_technician,
            },
        ))
    }

    // -----------------------------------------------------------------------
    // Owners
    // -----------------------------------------------------------------------

    /// Link an owner. Returns `false` if the link already existed.
    pub async fn add_owner(
        pool: &PgPool,
        property_id: DbId,
        owner_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO property_owners (property_id, owner_id) VALUES ($1, $2)
             ON CONFLICT ON CONSTRAINT uq_property_owners_pair DO NOTHING",
        )
        .bind(property_id)
        .bind(owner_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_owner(
        pool: &PgPool,
        property_id: DbId,
        owner_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM property_owners WHERE property_id = $1 AND owner_id = $2")
                .bind(property_id)
                .bind(owner_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_owners(
        pool: &PgPool,
        property_id: DbId,
    ) -> Result<Vec<PropertyOwner>, sqlx::Error> {
        sqlx::query_as::<_, PropertyOwner>(
            "SELECT o.property_id, o.owner_id, u.email, u.first_name, u.last_name, o.created_at
             FROM property_owners o
             JOIN users u ON u.id = o.owner_id
             WHERE o.property_id = $1
             ORDER BY o.created_at",
        )
        .bind(property_id)
        .fetch_all(pool)
        .await
    }
}

async fn insert<'e>(
    executor: impl PgExecutor<'e>,
    input: &CreateProperty,
) -> Result<Property, sqlx::Error> {
    let query = format!(
        "INSERT INTO properties (manager_id, name, address_line1, address_line2, city, state,
                                 postcode, country, property_type, total_area, year_built,
                                 description, image_url)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {COLUMNS}"
    );
    sqlx::query_as::<_, Property>(&query)
        .bind(input.manager_id)
        .bind(&input.name)
        .bind(&input.address_line1)
        .bind(&input.address_line2)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.postcode)
        .bind(&input.country)
        .bind(&input.property_type)
        .bind(input.total_area)
        .bind(input.year_built)
        .bind(&input.description)
        .bind(&input.image_url)
        .fetch_one(executor)
        .await
}

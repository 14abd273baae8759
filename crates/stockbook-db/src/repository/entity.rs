//! # Entity Repository
//!
//! Database operations for customers and suppliers. Balance follows the
//! same split as product stock: ledger effects are relative
//! (`balance = balance + ?`), manual overrides are absolute.

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::from_millis;
use crate::error::DbResult;
use stockbook_core::{Entity, EntityType, Money};

const ENTITY_COLUMNS: &str =
    "id, name, phone, email, address, type, balance, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct EntityRow {
    id: String,
    name: String,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    #[sqlx(rename = "type")]
    entity_type: EntityType,
    balance: i64,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<EntityRow> for Entity {
    type Error = crate::error::DbError;

    fn try_from(row: EntityRow) -> DbResult<Self> {
        Ok(Entity {
            created_at: from_millis("entities", "created_at", row.created_at)?,
            updated_at: from_millis("entities", "updated_at", row.updated_at)?,
            id: row.id,
            name: row.name,
            phone: row.phone,
            email: row.email,
            address: row.address,
            entity_type: row.entity_type,
            balance: Money::from_units(row.balance),
        })
    }
}

/// Repository for entity reads.
#[derive(Debug, Clone)]
pub struct EntityRepository {
    pool: SqlitePool,
}

impl EntityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        EntityRepository { pool }
    }

    /// Gets an entity by its ID, `None` when it does not exist.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Entity>> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1");
        let row = sqlx::query_as::<_, EntityRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Entity::try_from).transpose()
    }

    /// Lists every entity, ordered by id.
    pub async fn list_all(&self) -> DbResult<Vec<Entity>> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities ORDER BY id");
        let rows = sqlx::query_as::<_, EntityRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded entities");
        rows.into_iter().map(Entity::try_from).collect()
    }

    /// Lists customers or suppliers, ordered by name.
    ///
    /// Transaction forms use this to offer suppliers for `in` and customers
    /// for `out`.
    pub async fn list_by_type(&self, entity_type: EntityType) -> DbResult<Vec<Entity>> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE type = ?1 ORDER BY name");
        let rows = sqlx::query_as::<_, EntityRow>(&sql)
            .bind(entity_type)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Entity::try_from).collect()
    }
}

// =============================================================================
// Writes
// =============================================================================

pub async fn insert<'e, E>(executor: E, entity: &Entity) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %entity.id, entity_type = %entity.entity_type, "Inserting entity");

    sqlx::query(
        r#"
        INSERT INTO entities (
            id, name, phone, email, address, type, balance, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&entity.id)
    .bind(&entity.name)
    .bind(&entity.phone)
    .bind(&entity.email)
    .bind(&entity.address)
    .bind(entity.entity_type)
    .bind(entity.balance.units())
    .bind(entity.created_at.timestamp_millis())
    .bind(entity.updated_at.timestamp_millis())
    .execute(executor)
    .await?;

    Ok(())
}

/// Writes contact details and `updated_at`. Type, balance and
/// `created_at` are left alone.
pub async fn update_details<'e, E>(executor: E, entity: &Entity) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %entity.id, "Updating entity details");

    let result = sqlx::query(
        r#"
        UPDATE entities
        SET name = ?2, phone = ?3, email = ?4, address = ?5, updated_at = ?6
        WHERE id = ?1
        "#,
    )
    .bind(&entity.id)
    .bind(&entity.name)
    .bind(&entity.phone)
    .bind(&entity.email)
    .bind(&entity.address)
    .bind(entity.updated_at.timestamp_millis())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn set_balance<'e, E>(executor: E, id: &str, balance: Money) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, balance = %balance, "Overwriting balance");

    let result = sqlx::query("UPDATE entities SET balance = ?2 WHERE id = ?1")
        .bind(id)
        .bind(balance.units())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Adds `delta` to the balance column. `false` when the entity is gone,
/// `DbError::Overflow` when the sum leaves `i64`.
pub async fn adjust_balance<'e, E>(executor: E, id: &str, delta: Money) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, delta = %delta, "Adjusting balance");

    let result = sqlx::query("UPDATE entities SET balance = balance + ?2 WHERE id = ?1")
        .bind(id)
        .bind(delta.units())
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, "Deleting entity");

    let result = sqlx::query("DELETE FROM entities WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

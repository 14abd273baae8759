//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Stock Is Written Two Ways
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Ledger effect (record / revert)                                        │
//! │     UPDATE products SET stock = stock + ?2 WHERE id = ?1                │
//! │     Relative: concurrent writers never lose each other's increments.   │
//! │                                                                         │
//! │  Manual override (update_product with a stock value)                   │
//! │     UPDATE products SET stock = ?2 WHERE id = ?1                        │
//! │     Absolute: only issued when the override actually changes stock.    │
//! │                                                                         │
//! │  Detail edits (name, price, ...) never touch the stock column.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteExecutor, SqlitePool};
use tracing::debug;

use super::from_millis;
use crate::error::DbResult;
use stockbook_core::{Money, Product, Size};

// =============================================================================
// Row Mapping
// =============================================================================

const PRODUCT_COLUMNS: &str = "id, name, description, price, cost, stock, min_stock, \
                               category, size, supplier_id, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    description: Option<String>,
    price: i64,
    cost: i64,
    stock: i64,
    min_stock: i64,
    category: Option<String>,
    size: Option<Size>,
    supplier_id: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = crate::error::DbError;

    fn try_from(row: ProductRow) -> DbResult<Self> {
        Ok(Product {
            created_at: from_millis("products", "created_at", row.created_at)?,
            updated_at: from_millis("products", "updated_at", row.updated_at)?,
            id: row.id,
            name: row.name,
            description: row.description,
            price: Money::from_units(row.price),
            cost: Money::from_units(row.cost),
            stock: row.stock,
            min_stock: row.min_stock,
            category: row.category,
            size: row.size,
            supplier_id: row.supplier_id,
        })
    }
}

// =============================================================================
// Repository (reads)
// =============================================================================

/// Repository for product reads.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let product = repo.get_by_id("p-1").await?;
/// let all = repo.list_all().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found (never created, or deleted)
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Product::try_from).transpose()
    }

    /// Lists every product, ordered by id.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Loaded products");
        rows.into_iter().map(Product::try_from).collect()
    }

    /// Lists products at or below their reorder threshold.
    pub async fn list_low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock <= min_stock ORDER BY stock, name"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    /// Counts products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Writes
// =============================================================================

/// Inserts a product row.
pub async fn insert<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %product.id, name = %product.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, description, price, cost, stock, min_stock,
            category, size, supplier_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price.units())
    .bind(product.cost.units())
    .bind(product.stock)
    .bind(product.min_stock)
    .bind(&product.category)
    .bind(product.size)
    .bind(&product.supplier_id)
    .bind(product.created_at.timestamp_millis())
    .bind(product.updated_at.timestamp_millis())
    .execute(executor)
    .await?;

    Ok(())
}

/// Writes every column except `stock` and `created_at`.
///
/// Returns `false` when the product does not exist.
pub async fn update_details<'e, E>(executor: E, product: &Product) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %product.id, "Updating product details");

    let result = sqlx::query(
        r#"
        UPDATE products
        SET
            name = ?2,
            description = ?3,
            price = ?4,
            cost = ?5,
            min_stock = ?6,
            category = ?7,
            size = ?8,
            supplier_id = ?9,
            updated_at = ?10
        WHERE id = ?1
        "#,
    )
    .bind(&product.id)
    .bind(&product.name)
    .bind(&product.description)
    .bind(product.price.units())
    .bind(product.cost.units())
    .bind(product.min_stock)
    .bind(&product.category)
    .bind(product.size)
    .bind(&product.supplier_id)
    .bind(product.updated_at.timestamp_millis())
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Overwrites the stock column. Used for manual corrections only.
pub async fn set_stock<'e, E>(executor: E, id: &str, stock: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, stock = %stock, "Overwriting stock");

    let result = sqlx::query("UPDATE products SET stock = ?2 WHERE id = ?1")
        .bind(id)
        .bind(stock)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Adds `delta` to the stock column.
///
/// ## Returns
/// * `Ok(true)` - Stock adjusted
/// * `Ok(false)` - No such product; nothing changed
/// * `Err(DbError::Overflow)` - The sum leaves `i64`; nothing changed
pub async fn adjust_stock<'e, E>(executor: E, id: &str, delta: i64) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, delta = %delta, "Adjusting stock");

    let result = sqlx::query("UPDATE products SET stock = stock + ?2 WHERE id = ?1")
        .bind(id)
        .bind(delta)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Deletes a product row. Transactions that reference it are untouched.
pub async fn delete<'e, E>(executor: E, id: &str) -> DbResult<bool>
where
    E: SqliteExecutor<'e>,
{
    debug!(id = %id, "Deleting product");

    let result = sqlx::query("DELETE FROM products WHERE id = ?1")
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Unit Tests
// =============================================================================

//! # Database Pool Management
//!
//! Connection pool creation, configuration and atomic batch application.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) ← Configure pool settings                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  apply_batch(writes)                                                   │
//! │    BEGIN ──► write 1 ──► write 2 ──► ... ──► COMMIT                    │
//! │                 │ any error                                            │
//! │                 └──────────► ROLLBACK (transaction dropped)            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! File databases run in WAL mode so readers don't block the writer. The
//! in-memory database used by tests skips it.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::entity::EntityRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::{self, TransactionRepository};
use crate::repository::apply_write;
use stockbook_core::LedgerWrite;

const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust
/// use stockbook_db::DbConfig;
///
/// let config = DbConfig::new("/tmp/stockbook.db")
///     .max_connections(5)
///     .min_connections(1);
/// assert_eq!(config.max_connections, 5);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (sufficient for a single-user ledger)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection timeout duration.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// The file is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// Each `Database::new` call gets its own isolated database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }

    /// True for the configuration built by [`DbConfig::in_memory`].
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access and batch writes.
///
/// Cloning is cheap: clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite: WAL mode and NORMAL synchronous for files
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&config.database_path)
                // Readers don't block writers, writers don't block readers
                .journal_mode(SqliteJournalMode::Wal)
                // Safe from corruption, may lose the last batch on power loss
                .synchronous(SqliteSynchronous::Normal)
                .create_if_missing(true)
        };

        debug!("Connection options configured");

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout);

        // An in-memory database lives only as long as its connection.
        pool_options = if config.is_in_memory() {
            pool_options.idle_timeout(None).max_lifetime(None)
        } else {
            pool_options.idle_timeout(Some(config.idle_timeout))
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// For queries not covered by repositories.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Returns the product repository.
    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    /// Returns the entity repository.
    pub fn entities(&self) -> EntityRepository {
        EntityRepository::new(self.pool.clone())
    }

    /// Returns the transaction repository.
    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.pool.clone())
    }

    /// Applies a batch of writes inside one SQL transaction.
    ///
    /// ## Returns
    /// One flag per write: `true` if it changed a row, `false` if its
    /// target did not exist.
    ///
    /// ## Atomicity
    /// Any failing write rolls back every earlier write of the batch.
    pub async fn apply_batch(&self, writes: &[LedgerWrite]) -> DbResult<Vec<bool>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let mut applied = Vec::with_capacity(writes.len());
        for write in writes {
            applied.push(apply_write(&mut tx, write).await?);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(writes = writes.len(), "Batch committed");
        Ok(applied)
    }

    /// Applies a single write on its own connection.
    pub async fn apply(&self, write: &LedgerWrite) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        apply_write(&mut conn, write).await
    }

    /// Deletes every transaction. Returns the number removed.
    pub async fn clear_transactions(&self) -> DbResult<u64> {
        transaction::delete_all(&self.pool).await
    }

    /// Closes the database connection pool.
    ///
    /// After calling close, all repository operations will fail.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use stockbook_core::{Money, Product};

    fn product(id: &str) -> Product {
        let now = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        Product {
            id: id.to_string(),
            name: "Scarf".to_string(),
            description: None,
            price: Money::from_units(50),
            cost: Money::from_units(20),
            stock: 4,
            min_stock: 0,
            category: None,
            size: None,
            supplier_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
    }

    #[tokio::test]
    async fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[tokio::test]
    async fn test_apply_batch_reports_missing_targets() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let writes = vec![
            LedgerWrite::InsertProduct(product("p-1")),
            LedgerWrite::AdjustStock {
                product_id: "p-1".to_string(),
                delta: 3,
            },
            LedgerWrite::AdjustStock {
                product_id: "gone".to_string(),
                delta: 3,
            },
        ];

        let applied = db.apply_batch(&writes).await.unwrap();
        assert_eq!(applied, vec![true, true, false]);

        let stored = db.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(stored.stock, 7);
    }

    #[tokio::test]
    async fn test_apply_batch_rolls_back_on_failure() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.apply(&LedgerWrite::InsertProduct(product("p-1")))
            .await
            .unwrap();

        // Second insert of the same id violates the primary key.
        let writes = vec![
            LedgerWrite::AdjustStock {
                product_id: "p-1".to_string(),
                delta: -4,
            },
            LedgerWrite::InsertProduct(product("p-1")),
        ];

        let err = db.apply_batch(&writes).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let stored = db.products().get_by_id("p-1").await.unwrap().unwrap();
        assert_eq!(stored.stock, 4);
    }

    #[tokio::test]
    async fn test_clear_transactions_on_empty_ledger() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.clear_transactions().await.unwrap(), 0);
    }
}

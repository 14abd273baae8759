//! # Engine Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  EngineError (what callers see)                                         │
//! │  ├── Validation          bad input, nothing written                     │
//! │  ├── InsufficientStock   reject policy, nothing written                 │
//! │  ├── NotFound            update of a missing product or entity          │
//! │  ├── PartialBatch        bulk delete stopped part way                   │
//! │  └── Store(StoreError)                                                  │
//! │        ├── Db                    SQLite rejected the write              │
//! │        ├── Duplicate             id already taken (memory store)        │
//! │        ├── Unavailable           backend could not be reached           │
//! │        ├── Overflow              stock or balance would leave i64       │
//! │        ├── Compensated           batch failed, earlier writes undone    │
//! │        └── CompensationFailed    undo failed, ledger is inconsistent    │
//! │                                                                         │
//! │  ConfigError (startup only)                                             │
//! │  ├── Io / Parse          config file unreadable or malformed            │
//! │  └── InvalidValue        bad policy name or pool size                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use stockbook_core::{CoreError, ValidationError};
use stockbook_db::DbError;

// =============================================================================
// Store Error
// =============================================================================

/// Failures raised by a [`LedgerStore`](crate::store::LedgerStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Applying a delta would push `field` of record `id` outside `i64`.
    /// Nothing was written.
    #[error("{field} of {id} would overflow")]
    Overflow { field: &'static str, id: String },

    /// A batch failed part way on a store without atomic batches, and every
    /// write applied before the failure was undone.
    ///
    /// ## When This Occurs
    /// - Write `step` (zero-based) was rejected by the backend
    /// - `undone` earlier writes were reverted with their inverse
    ///
    /// The store is back to its pre-batch state.
    #[error("Write {step} ({kind}) failed: {reason}; {undone} earlier write(s) undone")]
    Compensated {
        step: usize,
        kind: &'static str,
        reason: String,
        undone: usize,
    },

    /// Undoing a failed batch failed too. Stock or balances no longer match
    /// the ledger; `audit_stock` shows the damage.
    #[error(
        "Write {step} ({kind}) failed: {reason}; undoing {undo_kind} also failed: {undo_reason}"
    )]
    CompensationFailed {
        step: usize,
        kind: &'static str,
        reason: String,
        undo_kind: &'static str,
        undo_reason: String,
    },
}

impl StoreError {
    pub(crate) fn overflow(field: &'static str, id: &str) -> Self {
        StoreError::Overflow {
            field,
            id: id.to_string(),
        }
    }

    /// True when a failed batch left no trace in the store.
    pub fn is_clean(&self) -> bool {
        !matches!(self, StoreError::CompensationFailed { .. })
    }

    /// True when a stock or balance delta was refused for leaving `i64`,
    /// whichever backend refused it.
    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            StoreError::Overflow { .. } | StoreError::Db(DbError::Overflow { .. })
        )
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Engine Error
// =============================================================================

/// Errors returned by [`LedgerEngine`](crate::LedgerEngine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Bulk deletion stopped at the first failure. The first `completed`
    /// ids were processed and stay processed.
    #[error("Bulk delete stopped after {completed} of {total}: {source}")]
    PartialBatch {
        completed: usize,
        total: usize,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub(crate) fn not_found(kind: &'static str, id: &str) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => EngineError::Validation(v),
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => EngineError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CoreError::TotalOverflow { quantity, price } => {
                EngineError::Validation(ValidationError::InvalidFormat {
                    field: "total".to_string(),
                    reason: format!("{quantity} x {price} is too large"),
                })
            }
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        EngineError::Store(StoreError::Db(err))
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Config Error
// =============================================================================

/// Failures loading [`EngineConfig`](crate::config::EngineConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_engine_errors() {
        let err: EngineError = CoreError::InsufficientStock {
            product_id: "p-1".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert!(matches!(err, EngineError::InsufficientStock { available: 1, .. }));

        let err: EngineError = CoreError::TotalOverflow {
            quantity: 2,
            price: i64::MAX,
        }
        .into();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_partial_batch_message() {
        let err = EngineError::PartialBatch {
            completed: 2,
            total: 5,
            source: Box::new(EngineError::Store(StoreError::Unavailable("disk".into()))),
        };
        assert_eq!(
            err.to_string(),
            "Bulk delete stopped after 2 of 5: Store unavailable: disk"
        );
    }

    #[test]
    fn test_compensation_cleanliness() {
        let compensated = StoreError::Compensated {
            step: 1,
            kind: "adjust_stock",
            reason: "x".into(),
            undone: 1,
        };
        assert!(compensated.is_clean());

        let failed = StoreError::CompensationFailed {
            step: 1,
            kind: "adjust_stock",
            reason: "x".into(),
            undo_kind: "remove_transaction",
            undo_reason: "y".into(),
        };
        assert!(!failed.is_clean());
    }
}

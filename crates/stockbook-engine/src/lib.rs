//! # stockbook-engine: Ledger Orchestration
//!
//! Turns intents ("sell 2 shirts to Sara", "delete that purchase") into
//! write batches planned by `stockbook-core` and commits them through a
//! [`LedgerStore`].
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        stockbook-engine                                 │
//! │                                                                         │
//! │   EngineConfig ──► SqliteStore::open(config.to_db_config())             │
//! │                         │                                               │
//! │                         ▼                                               │
//! │   LedgerEngine<S: LedgerStore> { store, clock, policy }                 │
//! │        │                                                                │
//! │        ├── record_transaction / delete_transaction(s) / clear           │
//! │        ├── create / update / delete  product                            │
//! │        ├── create / update / delete  entity                             │
//! │        └── audit_stock                                                  │
//! │                                                                         │
//! │   store ──► LiveFeed ──► LedgerWatch (products, entities, ledger)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - `LedgerEngine` and operation outcomes
//! - [`store`] - `LedgerStore` trait, memory and SQLite stores, live feed
//! - [`clock`] - Injected time source
//! - [`config`] - TOML and environment configuration
//! - [`error`] - Store, engine and config errors

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::{EntityUpdated, LedgerEngine, ProductCreated, ProductUpdated};
pub use error::{ConfigError, EngineError, EngineResult, StoreError, StoreResult};
pub use store::{LedgerStore, LedgerWatch, MemoryStore, SqliteStore};

use tracing_subscriber::EnvFilter;

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,stockbook=debug,sqlx=warn";

/// Installs the global `tracing` subscriber for a binary.
///
/// `RUST_LOG` wins over `default_filter`. Calling it twice is harmless.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

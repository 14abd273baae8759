//! SQLite store against a real database file.

mod common;

use std::path::{Path, PathBuf};

use common::*;
use stockbook_db::DbConfig;
use stockbook_engine::{EngineConfig, LedgerEngine, LedgerStore, SqliteStore};

struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("stockbook-{}.db", uuid::Uuid::new_v4()));
        TempDb { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

#[tokio::test]
async fn test_ledger_survives_reopen() {
    let db = TempDb::new();

    let (product_id, recorded) = {
        let store = SqliteStore::open(DbConfig::new(db.path())).await.unwrap();
        let engine = LedgerEngine::new(store).with_clock(clock());

        let p = scenario_product(&engine).await;
        let buyer = customer(&engine, "Sara Haddad").await;
        let recorded = engine
            .record_transaction(
                sale(&p, 2, 100)
                    .with_entity(&buyer.id)
                    .with_notes("  gift wrap "),
            )
            .await
            .unwrap();

        engine.store().database().close().await;
        (p.id, recorded)
    };

    let store = SqliteStore::open(DbConfig::new(db.path())).await.unwrap();

    // Snapshots are published on open.
    let watch = store.watch();
    assert_eq!(watch.products()[&product_id].stock, 3);
    assert_eq!(watch.transactions().len(), 2);

    let engine = LedgerEngine::new(store);
    let stored = engine.transaction(&recorded.id).await.unwrap().unwrap();
    assert_eq!(stored, recorded);
    assert_eq!(stored.notes.as_deref(), Some("gift wrap"));
}

#[tokio::test]
async fn test_open_from_config() {
    let db = TempDb::new();

    let mut config = EngineConfig::default();
    config.database.path = Some(db.path().to_path_buf());
    config.database.max_connections = 2;

    let store = SqliteStore::open(config.to_db_config()).await.unwrap();
    assert!(store.database().health_check().await);

    let engine = LedgerEngine::new(store).with_policy(config.policy());
    let p = product(&engine, "Cardigan", 0, 2, 120, 70).await;
    engine.record_transaction(purchase(&p, 6, 70)).await.unwrap();

    assert_eq!(stock_of(&engine, &p).await, 6);
    assert_eq!(
        engine
            .store()
            .database()
            .transactions()
            .stock_sum(&p.id)
            .await
            .unwrap(),
        6
    );
}

//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::DateTime;
use stockbook_core::{
    Entity, EntityType, Money, NewEntity, NewProduct, NewTransaction, Product, TransactionType,
};
use stockbook_db::DbConfig;
use stockbook_engine::{LedgerEngine, LedgerStore, ManualClock, MemoryStore, SqliteStore};

pub const START_MS: i64 = 1_700_000_000_000;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        DateTime::from_timestamp_millis(START_MS).unwrap(),
    ))
}

pub fn memory_engine() -> LedgerEngine<MemoryStore> {
    LedgerEngine::new(MemoryStore::new()).with_clock(clock())
}

pub async fn sqlite_engine() -> LedgerEngine<SqliteStore> {
    let store = SqliteStore::open(DbConfig::in_memory()).await.unwrap();
    LedgerEngine::new(store).with_clock(clock())
}

/// The product from the reference scenario: stock 5, min 3, price 100, cost 60.
pub async fn scenario_product<S: LedgerStore>(engine: &LedgerEngine<S>) -> Product {
    product(engine, "Oxford Shirt", 5, 3, 100, 60).await
}

pub async fn product<S: LedgerStore>(
    engine: &LedgerEngine<S>,
    name: &str,
    stock: i64,
    min_stock: i64,
    price: i64,
    cost: i64,
) -> Product {
    engine
        .create_product(NewProduct {
            name: name.to_string(),
            price: Money::from_units(price),
            cost: Money::from_units(cost),
            stock,
            min_stock,
            ..Default::default()
        })
        .await
        .unwrap()
        .product
}

pub async fn customer<S: LedgerStore>(engine: &LedgerEngine<S>, name: &str) -> Entity {
    engine
        .create_entity(NewEntity::new(name, EntityType::Customer))
        .await
        .unwrap()
}

pub async fn supplier<S: LedgerStore>(engine: &LedgerEngine<S>, name: &str) -> Entity {
    engine
        .create_entity(NewEntity::new(name, EntityType::Supplier))
        .await
        .unwrap()
}

pub fn sale(product: &Product, quantity: i64, price: i64) -> NewTransaction {
    NewTransaction::new(
        &product.id,
        TransactionType::Out,
        quantity,
        Money::from_units(price),
    )
}

pub fn purchase(product: &Product, quantity: i64, price: i64) -> NewTransaction {
    NewTransaction::new(
        &product.id,
        TransactionType::In,
        quantity,
        Money::from_units(price),
    )
}

pub async fn stock_of<S: LedgerStore>(engine: &LedgerEngine<S>, product: &Product) -> i64 {
    engine.product(&product.id).await.unwrap().unwrap().stock
}

pub async fn balance_of<S: LedgerStore>(engine: &LedgerEngine<S>, entity: &Entity) -> Money {
    engine.entity(&entity.id).await.unwrap().unwrap().balance
}

//! # Demo Ledger Generator
//!
//! Populates a database with suppliers, customers, products and a few weeks
//! of sales, all recorded through the engine so stock and balances follow
//! the ledger rules.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (stockbook.toml / STOCKBOOK_DB_PATH)
//! cargo run -p stockbook-engine --bin seed
//!
//! # Specify database path and product count
//! cargo run -p stockbook-engine --bin seed -- --db ./data/stockbook.db --products 40
//! ```
//!
//! Configuration is loaded the usual way; `--db` wins over it.

use std::env;
use std::path::PathBuf;

use stockbook_core::reports::{inventory_value, low_stock};
use stockbook_core::{
    Entity, EntityType, Money, NewEntity, NewProduct, NewTransaction, Size, TransactionType,
};
use stockbook_engine::{init_tracing, EngineConfig, LedgerEngine, SqliteStore, DEFAULT_LOG_FILTER};

const SUPPLIERS: &[&str] = &["Cedar Textiles", "Blue Loom Co.", "Harbor Garments"];

const CUSTOMERS: &[&str] = &[
    "Sara Haddad",
    "Omar Khalil",
    "Lina Mansour",
    "Karim Nassar",
    "Maya Saab",
];

/// (category, model names, base cost)
const CATALOG: &[(&str, &[&str], i64)] = &[
    ("Shirts", &["Linen Shirt", "Oxford Shirt", "Polo"], 40),
    ("Trousers", &["Chino", "Denim Jeans", "Cargo Pants"], 55),
    ("Knitwear", &["Crew Sweater", "Cardigan"], 70),
    ("Accessories", &["Leather Belt", "Wool Scarf"], 20),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(DEFAULT_LOG_FILTER);

    let args: Vec<String> = env::args().collect();

    let mut product_count: usize = 20;
    let mut db_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    product_count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Demo Ledger Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --products <N>  Number of products to create (default: 20)");
                println!("  -d, --db <PATH>     Database file path (default: from config)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = EngineConfig::load(None)?;
    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    let path = config.database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    println!("🌱 Stockbook Demo Ledger Generator");
    println!("==================================");
    println!("Database: {}", path.display());
    println!("Products: {}", product_count);
    println!(
        "Policy:   stock={} balance={}",
        config.ledger.stock, config.ledger.balance
    );
    println!();

    let store = SqliteStore::open(config.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let engine = LedgerEngine::new(store).with_policy(config.policy());

    let existing = engine.products().await?.len();
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Counterparties
    let mut suppliers: Vec<Entity> = Vec::new();
    for name in SUPPLIERS {
        suppliers.push(
            engine
                .create_entity(NewEntity::new(*name, EntityType::Supplier))
                .await?,
        );
    }
    let mut customers: Vec<Entity> = Vec::new();
    for name in CUSTOMERS {
        customers.push(
            engine
                .create_entity(NewEntity::new(*name, EntityType::Customer))
                .await?,
        );
    }
    println!(
        "✓ Created {} suppliers, {} customers",
        suppliers.len(),
        customers.len()
    );

    // Products, each with a seed transaction for its opening stock
    let mut products = Vec::new();
    'catalog: for (category, models, base_cost) in CATALOG {
        for model in models.iter() {
            for size in Size::ALL {
                if products.len() >= product_count {
                    break 'catalog;
                }
                let n = products.len();
                let supplier = &suppliers[n % suppliers.len()];
                let cost = base_cost + (n as i64 % 5) * 2;

                let created = engine
                    .create_product(NewProduct {
                        name: format!("{} {}", model, size),
                        description: None,
                        price: Money::from_units(cost * 18 / 10),
                        cost: Money::from_units(cost),
                        stock: (n as i64 * 7) % 25,
                        min_stock: 3,
                        category: Some(category.to_string()),
                        size: Some(size),
                        supplier_id: Some(supplier.id.clone()),
                    })
                    .await?;
                products.push(created.product);
            }
        }
    }
    println!("✓ Created {} products", products.len());

    // Sales and restocks
    let mut recorded = 0;
    for (n, product) in products.iter().enumerate() {
        let customer = &customers[n % customers.len()];
        let sold = (n as i64 % 4) + 1;
        engine
            .record_transaction(
                NewTransaction::new(&product.id, TransactionType::Out, sold, product.price)
                    .with_entity(&customer.id),
            )
            .await?;
        recorded += 1;

        if n % 3 == 0 {
            let supplier = &suppliers[n % suppliers.len()];
            engine
                .record_transaction(
                    NewTransaction::new(&product.id, TransactionType::In, 10, product.cost)
                        .with_entity(&supplier.id)
                        .with_notes("Restock"),
                )
                .await?;
            recorded += 1;
        }
    }
    println!("✓ Recorded {} transactions", recorded);

    // Summary
    let products = engine.products().await?;
    let low = low_stock(&products);
    println!();
    println!("Inventory value: {}", inventory_value(&products));
    println!("Low stock:       {} products", low.len());
    if let Some(first) = low.first() {
        println!("{}", serde_json::to_string_pretty(first)?);
    }

    let drift = engine.audit_stock().await?;
    println!("Stock drift:     {} products", drift.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

//! # Seed Data Generator
//!
//! Prepares a development database with the starter catalogue and a stock
//! count for every good.
//!
//! ## Usage
//! ```bash
//! # Seed ./tally_dev.db (or $TALLY_DB_PATH) with 25 units per good
//! cargo run -p tally-ledger --bin seed
//!
//! # Custom database and stock count
//! cargo run -p tally-ledger --bin seed -- --db ./data/tally.db --stock 40
//! ```
//!
//! Seeding is idempotent: an existing catalogue is left as it is and only
//! goods without a stock row get one.

use std::env;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use tally_db::{Database, DbConfig};
use tally_ledger::{LedgerEngine, LedgerSettings};
use tally_sync::{SyncEngine, SystemClock};

const DEFAULT_DB_PATH: &str = "./tally_dev.db";
const DEFAULT_STOCK: i64 = 25;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut config = DbConfig::from_env_or(DEFAULT_DB_PATH);
    let mut stock = DEFAULT_STOCK;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if let Some(path) = args.get(i + 1) {
                    config = DbConfig::new(path);
                    i += 1;
                }
            }
            "--stock" | "-s" => {
                if let Some(raw) = args.get(i + 1) {
                    stock = raw.parse().unwrap_or(DEFAULT_STOCK).max(0);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file (default: $TALLY_DB_PATH or {})", DEFAULT_DB_PATH);
                println!("  -s, --stock <N>     Stock level for each good (default: {})", DEFAULT_STOCK);
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    println!("Tally Seed Data Generator");
    println!("=========================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config).await?;
    let clock = Arc::new(SystemClock);
    let sync = SyncEngine::builder(&db).clock(clock.clone()).build();
    let ledger = LedgerEngine::new(db.clone(), sync, clock).with_settings(LedgerSettings::from_env());

    let added = ledger.seed_sample_goods().await?;
    if added == 0 {
        println!("Catalogue already populated, keeping existing goods");
    } else {
        println!("Added {} sample goods", added);
    }

    let stocked: Vec<String> = ledger
        .list_inventory()
        .await?
        .into_iter()
        .map(|item| item.item_id)
        .collect();

    let mut counted = 0;
    for good in ledger.list_goods().await? {
        if stocked.contains(&good.id) {
            continue;
        }
        ledger.set_stock_level(&good.id, stock).await?;
        counted += 1;
    }
    println!("Set stock level {} on {} goods", stock, counted);

    let report = ledger.stock_report("").await?;
    let status = ledger.sync_status().await;

    println!();
    println!("Summary");
    println!("-------");
    println!("Goods:          {}", report.item_count);
    println!("Units in stock: {}", report.total_units);
    println!("Low stock:      {}", report.low_count);
    println!("Out of stock:   {}", report.out_of_stock_count);
    println!("Pending sync:   {}", status.pending_count);

    db.close().await;
    Ok(())
}

//! Shared fixtures for the ledger unit tests.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use tally_db::{Database, DbConfig};
use tally_sync::{ManualClock, SyncEngine};

use crate::engine::LedgerEngine;

/// 2026-03-01 12:00:00 UTC, where every test clock starts.
pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// A ledger over a fresh in-memory database with no remote endpoint.
pub(crate) async fn ledger() -> (LedgerEngine, Arc<ManualClock>) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let clock = Arc::new(ManualClock::new(t0()));
    let sync = SyncEngine::builder(&db).clock(clock.clone()).build();
    (LedgerEngine::new(db, sync, clock.clone()), clock)
}

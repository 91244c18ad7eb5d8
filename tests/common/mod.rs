// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use slotbook::application::{AppointmentLedger, LedgerConfig};
use slotbook::domain::FixedClock;
use tempfile::TempDir;

pub const TODAY: &str = "2024-01-01";

/// Helper to parse a date string into NaiveDate
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
}

/// Seven-day window, standard catalog
pub fn test_config() -> LedgerConfig {
    LedgerConfig::default().with_window_days(7)
}

/// Helper to create a SQLite-backed ledger in a temporary directory, pinned to TODAY
pub async fn test_ledger() -> Result<(AppointmentLedger, TempDir)> {
    test_ledger_with(test_config()).await
}

pub async fn test_ledger_with(config: LedgerConfig) -> Result<(AppointmentLedger, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let ledger = AppointmentLedger::init(db_path.to_str().unwrap(), config)
        .await?
        .with_clock(FixedClock(date(TODAY)));
    Ok((ledger, temp_dir))
}

/// In-memory ledger pinned to TODAY
pub fn memory_ledger() -> AppointmentLedger {
    AppointmentLedger::in_memory(test_config()).with_clock(FixedClock(date(TODAY)))
}

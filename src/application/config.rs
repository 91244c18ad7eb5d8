use std::env;
use std::time::Duration;

use tracing::warn;

use crate::domain::{BookingWindow, SlotCatalog};

pub const ENV_WINDOW_DAYS: &str = "SLOTBOOK_WINDOW_DAYS";
pub const ENV_SLOTS: &str = "SLOTBOOK_SLOTS";
pub const ENV_STORAGE_TIMEOUT_MS: &str = "SLOTBOOK_STORAGE_TIMEOUT_MS";

pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Booking rules and storage limits for a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub catalog: SlotCatalog,
    pub window: BookingWindow,
    /// Upper bound for every single call into the store.
    pub storage_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            catalog: SlotCatalog::standard(),
            window: BookingWindow::default(),
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    /// Read overrides from the environment. Values that don't parse are
    /// reported and replaced by the defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(ENV_WINDOW_DAYS) {
            match raw.trim().parse::<u32>() {
                Ok(days) => config.window = BookingWindow::new(days),
                Err(_) => warn!(
                    "{}='{}' is not a day count, using {}",
                    ENV_WINDOW_DAYS, raw, config.window.days
                ),
            }
        }

        if let Ok(raw) = env::var(ENV_SLOTS) {
            match SlotCatalog::parse_list(&raw) {
                Ok(catalog) => config.catalog = catalog,
                Err(e) => warn!("{} is invalid ({}), using {}", ENV_SLOTS, e, config.catalog),
            }
        }

        if let Ok(raw) = env::var(ENV_STORAGE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config.storage_timeout = Duration::from_millis(ms),
                _ => warn!(
                    "{}='{}' is not a positive number of milliseconds, using {:?}",
                    ENV_STORAGE_TIMEOUT_MS, raw, config.storage_timeout
                ),
            }
        }

        config
    }

    pub fn with_catalog(mut self, catalog: SlotCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window = BookingWindow::new(days);
        self
    }

    pub fn with_storage_timeout(mut self, timeout: Duration) -> Self {
        self.storage_timeout = timeout;
        self
    }
}

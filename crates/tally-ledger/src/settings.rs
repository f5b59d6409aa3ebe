//! # Ledger Settings
//!
//! Tunables for the ledger rules, read once at startup.
//!
//! ## Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Defaults (this file)

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::warn;

use tally_core::{DEFAULT_EDIT_WINDOW_HOURS, LOW_STOCK_THRESHOLD, OVERDUE_AFTER_DAYS};

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSettings {
    /// How long after creation a purchase may be edited directly.
    /// Default: 24
    pub edit_window_hours: i64,

    /// Stock levels below this are reported as low.
    /// Default: 10
    pub low_stock_threshold: i64,

    /// A debtor with a positive balance and no purchase for this many days
    /// is reported as overdue.
    /// Default: 30
    pub overdue_after_days: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            edit_window_hours: DEFAULT_EDIT_WINDOW_HOURS,
            low_stock_threshold: LOW_STOCK_THRESHOLD,
            overdue_after_days: OVERDUE_AFTER_DAYS,
        }
    }
}

impl LedgerSettings {
    /// Defaults overridden by the process environment.
    ///
    /// ## Environment Variables
    /// - `TALLY_EDIT_WINDOW_HOURS`
    /// - `TALLY_LOW_STOCK_THRESHOLD`
    /// - `TALLY_OVERDUE_AFTER_DAYS`
    pub fn from_env() -> Self {
        let mut settings = LedgerSettings::default();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Applies overrides from a variable lookup. Unparseable, negative, or
    /// out-of-range values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut i64, fn(i64) -> bool); 3] = [
            ("TALLY_EDIT_WINDOW_HOURS", &mut self.edit_window_hours, |v| {
                Duration::try_hours(v).is_some()
            }),
            ("TALLY_LOW_STOCK_THRESHOLD", &mut self.low_stock_threshold, |_| true),
            ("TALLY_OVERDUE_AFTER_DAYS", &mut self.overdue_after_days, |v| {
                Duration::try_days(v).is_some()
            }),
        ];

        for (key, field, in_range) in fields {
            let Some(raw) = lookup(key) else { continue };
            match raw.trim().parse::<i64>() {
                Ok(value) if value >= 0 && in_range(value) => *field = value,
                _ => warn!(key = key, value = %raw, "Ignoring invalid ledger setting"),
            }
        }
    }

    /// Clamps to [`Duration::MAX`] when the fields were set out of range
    /// directly.
    pub fn edit_window(&self) -> Duration {
        Duration::try_hours(self.edit_window_hours).unwrap_or(Duration::MAX)
    }

    pub fn overdue_after(&self) -> Duration {
        Duration::try_days(self.overdue_after_days).unwrap_or(Duration::MAX)
    }
}

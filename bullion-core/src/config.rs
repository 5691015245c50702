//! Desk tunables.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Configuration of the trading desk core.
///
/// Hosts deserialize this from whatever configuration source they use; the
/// defaults are the production values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeskConfig {
    /// Market closing cutoff. Trades confirmed at or after this time settle
    /// one business day later.
    market_cutoff: NaiveTime,
    /// How long an issued quote stays executable.
    quote_validity_secs: i64,
    /// Upper bound on waiting for a request lock.
    lock_timeout_ms: u64,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            market_cutoff: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
            quote_validity_secs: 120,
            lock_timeout_ms: 5_000,
        }
    }
}

impl DeskConfig {
    pub fn new(market_cutoff: NaiveTime, quote_validity_secs: i64, lock_timeout_ms: u64) -> Self {
        Self {
            market_cutoff,
            quote_validity_secs,
            lock_timeout_ms,
        }
    }

    pub fn market_cutoff(&self) -> NaiveTime {
        self.market_cutoff
    }

    pub fn quote_validity(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.quote_validity_secs)
    }

    pub fn lock_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.lock_timeout_ms)
    }
}

//! Post-commit fact bus.
//!
//! The core announces what happened only after the unit of work has made it
//! durable; downstream processors (notifications, settlement jobs) consume
//! the facts without the core knowing them. If a fact was published, the
//! state change behind it is committed.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use uuid::Uuid;

use bullion_api::model::balance::BalanceType;

/// A durable state change, announced after commit.
#[derive(Debug, Clone)]
pub enum Fact {
    QuoteIssued {
        quote_id: Uuid,
        quote_key: String,
        expires_at: DateTime<Utc>,
    },

    QuoteExpired {
        quote_id: Uuid,
    },

    TradeConfirmed {
        trade_id: Uuid,
        trade_number: u64,
        value_date: NaiveDate,
    },

    TradeCancelled {
        trade_id: Uuid,
        offset_trade_id: Uuid,
    },

    PositionSettled {
        trade_id: Uuid,
        at: DateTime<Utc>,
    },

    FinanciallySettled {
        trade_id: Uuid,
        at: DateTime<Utc>,
    },

    BalancePosted {
        transaction_id: Uuid,
        balance_type: BalanceType,
        resulting_balance: Decimal,
    },
}

/// A wrapper around a tokio broadcast channel.
///
/// Wrapping enforces strong typing on the facts and leaves room to swap the
/// transport without touching publishers.
#[derive(Clone)]
pub struct FactBus {
    sender: broadcast::Sender<Fact>,
}

impl Default for FactBus {
    fn default() -> Self {
        Self::new()
    }
}

impl FactBus {
    pub fn new() -> Self {
        // Slow subscribers lag and skip old facts rather than block the
        // publishing operation.
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Publishes a fact to all subscribers. A bus with no subscribers is
    /// fine; the fact is simply dropped.
    pub fn publish(&self, fact: Fact) {
        let _ = self.sender.send(fact);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Fact> {
        self.sender.subscribe()
    }
}

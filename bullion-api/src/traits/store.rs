//! Persistence boundary.
//!
//! The core never talks to storage technology directly: it reads the
//! persisted chains through these traits and makes everything durable in a
//! single [`UnitOfWork::commit`]. Whatever backs them (relational store,
//! document store, the in-memory store used in tests) must make the commit
//! atomic across every staged record.

use thiserror::Error;
use uuid::Uuid;

use crate::model::balance::{BalanceType, Transaction};
use crate::model::position::{Position, PositionKey};
use crate::model::quote::{QuoteStatus, TradeQuote};
use crate::model::trade::Trade;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("commit failed: {0}")]
    Commit(String),
}

/// Read side of the two append-only chains.
pub trait LedgerReader: Send + Sync {
    /// Most recent transaction for a balance type, by record timestamp
    /// descending. `None` means the chain is empty (balance 0).
    fn latest_transaction(&self, balance_type: BalanceType) -> Option<Transaction>;

    /// Most recent position record for a key. `None` means no inventory.
    fn latest_position(&self, key: &PositionKey) -> Option<Position>;
}

/// Trade and quote lookups plus the records attached to a trade.
pub trait TradeStore: Send + Sync {
    fn trade(&self, id: Uuid) -> Option<Trade>;

    fn quote(&self, id: Uuid) -> Option<TradeQuote>;

    fn quotes_in_status(&self, status: QuoteStatus) -> Vec<TradeQuote>;

    /// Cash transactions whose related activity is the given trade or cash
    /// operation.
    fn transactions_for_activity(&self, activity_id: Uuid) -> Vec<Transaction>;

    /// Inventory records created by the given trade.
    fn positions_for_trade(&self, trade_id: Uuid) -> Vec<Position>;

    /// Allocates the next trade number in the desk's sequence.
    fn next_trade_number(&self) -> u64;
}

/// Everything one logical operation wants to make durable.
///
/// Trades and quotes are upserted by id; chain records are appended.
#[derive(Debug, Default)]
pub struct StagedChanges {
    pub trades: Vec<Trade>,
    pub quotes: Vec<TradeQuote>,
    pub transactions: Vec<Transaction>,
    pub positions: Vec<Position>,
}

impl StagedChanges {
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
            && self.quotes.is_empty()
            && self.transactions.is_empty()
            && self.positions.is_empty()
    }
}

/// The sole durability point of an operation.
pub trait UnitOfWork: Send + Sync {
    /// Commits every staged record atomically: either all of them become
    /// visible or none do.
    fn commit(&self, changes: StagedChanges) -> Result<(), StoreError>;
}

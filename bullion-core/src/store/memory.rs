//! In-memory implementation of the persistence boundary.
//!
//! Backs the test suites and doubles as a reference for what a real store
//! must guarantee: chain reads ordered by record timestamp, and a commit
//! that applies every staged record under one lock (all-or-nothing).

use std::sync::Mutex as StdMutex;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use bullion_api::model::balance::{
    ActivityType, BalanceType, EntrySide, Transaction,
};
use bullion_api::model::position::{Position, PositionKey, PositionSide};
use bullion_api::model::quote::{QuoteStatus, TradeQuote};
use bullion_api::model::trade::Trade;
use bullion_api::traits::store::{LedgerReader, StagedChanges, StoreError, TradeStore, UnitOfWork};

#[derive(Default)]
struct Inner {
    trades: Vec<Trade>,
    quotes: Vec<TradeQuote>,
    transactions: Vec<Transaction>,
    positions: Vec<Position>,
    trade_seq: u64,
    chain_reads: u64,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    inner: StdMutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chain queries served so far. Lets tests assert the
    /// at-most-one-read-per-key property of the scope caches.
    pub fn chain_reads(&self) -> u64 {
        self.lock().chain_reads
    }

    /// Seeds an opening balance by appending a deposit transaction.
    pub fn seed_balance(&self, balance_type: BalanceType, amount: Decimal) {
        let mut inner = self.lock();
        inner.transactions.push(Transaction {
            id: Uuid::new_v4(),
            side: EntrySide::Credit,
            balance_type,
            activity_type: ActivityType::Deposit,
            amount,
            resulting_balance: amount,
            related_activity_id: None,
            recorded_at: Utc::now(),
        });
    }

    /// Seeds an opening inventory level for a position key.
    pub fn seed_position(&self, key: PositionKey, quantity: Decimal) {
        let mut inner = self.lock();
        inner.positions.push(Position {
            id: Uuid::new_v4(),
            key,
            side: PositionSide::In,
            quantity_units: quantity,
            resulting_units: quantity,
            related_trade_id: None,
            recorded_at: Utc::now(),
        });
    }

    pub fn transaction_count(&self) -> usize {
        self.lock().transactions.len()
    }

    pub fn position_count(&self) -> usize {
        self.lock().positions.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LedgerReader for MemoryStore {
    fn latest_transaction(&self, balance_type: BalanceType) -> Option<Transaction> {
        let mut inner = self.lock();
        inner.chain_reads += 1;
        // Appends are timestamp-ordered, so the last match is the most
        // recent record.
        inner
            .transactions
            .iter()
            .rev()
            .find(|t| t.balance_type == balance_type)
            .cloned()
    }

    fn latest_position(&self, key: &PositionKey) -> Option<Position> {
        let mut inner = self.lock();
        inner.chain_reads += 1;
        inner
            .positions
            .iter()
            .rev()
            .find(|p| &p.key == key)
            .cloned()
    }
}

impl TradeStore for MemoryStore {
    fn trade(&self, id: Uuid) -> Option<Trade> {
        self.lock().trades.iter().find(|t| t.id == id).cloned()
    }

    fn quote(&self, id: Uuid) -> Option<TradeQuote> {
        self.lock().quotes.iter().find(|q| q.id == id).cloned()
    }

    fn quotes_in_status(&self, status: QuoteStatus) -> Vec<TradeQuote> {
        self.lock()
            .quotes
            .iter()
            .filter(|q| q.status == status)
            .cloned()
            .collect()
    }

    fn transactions_for_activity(&self, activity_id: Uuid) -> Vec<Transaction> {
        self.lock()
            .transactions
            .iter()
            .filter(|t| t.related_activity_id == Some(activity_id))
            .cloned()
            .collect()
    }

    fn positions_for_trade(&self, trade_id: Uuid) -> Vec<Position> {
        self.lock()
            .positions
            .iter()
            .filter(|p| p.related_trade_id == Some(trade_id))
            .cloned()
            .collect()
    }

    fn next_trade_number(&self) -> u64 {
        let mut inner = self.lock();
        inner.trade_seq += 1;
        inner.trade_seq
    }
}

impl UnitOfWork for MemoryStore {
    fn commit(&self, changes: StagedChanges) -> Result<(), StoreError> {
        let mut inner = self.lock();
        for trade in changes.trades {
            match inner.trades.iter_mut().find(|t| t.id == trade.id) {
                Some(existing) => *existing = trade,
                None => inner.trades.push(trade),
            }
        }
        for quote in changes.quotes {
            match inner.quotes.iter_mut().find(|q| q.id == quote.id) {
                Some(existing) => *existing = quote,
                None => inner.quotes.push(quote),
            }
        }
        inner.transactions.extend(changes.transactions);
        inner.positions.extend(changes.positions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_latest_transaction_is_most_recent_append() {
        let store = MemoryStore::new();
        store.seed_balance(BalanceType::Effective, dec!(100));
        store.seed_balance(BalanceType::Effective, dec!(250));
        store.seed_balance(BalanceType::Actual, dec!(999));

        let latest = store.latest_transaction(BalanceType::Effective).unwrap();
        assert_eq!(latest.resulting_balance, dec!(250));
    }

    #[test]
    fn test_commit_upserts_trades_and_appends_chains() {
        let store = MemoryStore::new();
        store.seed_balance(BalanceType::Effective, dec!(100));
        assert_eq!(store.transaction_count(), 1);

        store
            .commit(StagedChanges {
                transactions: vec![Transaction {
                    id: Uuid::new_v4(),
                    side: EntrySide::Debit,
                    balance_type: BalanceType::Effective,
                    activity_type: ActivityType::Withdrawal,
                    amount: dec!(40),
                    resulting_balance: dec!(60),
                    related_activity_id: None,
                    recorded_at: Utc::now(),
                }],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(store.transaction_count(), 2);
        let latest = store.latest_transaction(BalanceType::Effective).unwrap();
        assert_eq!(latest.resulting_balance, dec!(60));
    }

    #[test]
    fn test_trade_numbers_are_sequential() {
        let store = MemoryStore::new();
        assert_eq!(store.next_trade_number(), 1);
        assert_eq!(store.next_trade_number(), 2);
    }
}

//! Request-scoped caches over the two append-only chains.
//!
//! A cache belongs to exactly one logical operation: created at scope
//! start, discarded at scope end, never shared. Within that scope it reads
//! each chain at most once per key and sequences multi-step arithmetic over
//! the not-yet-persisted records it created itself. Serialization across
//! scopes is the request lock's job, not the cache's.

pub mod positions;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use rust_decimal::Decimal;
use uuid::Uuid;

use bullion_api::model::balance::{ActivityType, BalanceType, EntrySide, Transaction};
use bullion_api::model::money::round_cash;
use bullion_api::traits::store::LedgerReader;

use crate::error::{CoreError, Result};

/// Per-operation cache of the current cash balance for each balance type.
pub struct BalanceCache {
    reader: Arc<dyn LedgerReader>,
    current: HashMap<BalanceType, Decimal>,
    pending: Vec<Transaction>,
}

impl BalanceCache {
    pub fn new(reader: Arc<dyn LedgerReader>) -> Self {
        Self {
            reader,
            current: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Current balance for `balance_type`, including the effect of pending
    /// entries created in this scope.
    ///
    /// Hits the store at most once per balance type per scope; an empty
    /// chain reads as zero.
    pub fn current(&mut self, balance_type: BalanceType) -> Decimal {
        if let Some(value) = self.current.get(&balance_type) {
            return *value;
        }
        let value = self
            .reader
            .latest_transaction(balance_type)
            .map(|t| t.resulting_balance)
            .unwrap_or(Decimal::ZERO);
        debug!("balance chain read: {:?} = {}", balance_type, value);
        self.current.insert(balance_type, value);
        value
    }

    /// Creates the next link of the chain without persisting it.
    ///
    /// The record lands on the scope's pending list; durability belongs to
    /// the unit of work. Amounts must be strictly positive and are rounded
    /// to cash precision.
    pub fn post(
        &mut self,
        balance_type: BalanceType,
        side: EntrySide,
        activity_type: ActivityType,
        amount: Decimal,
        related_activity_id: Option<Uuid>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(amount));
        }
        let amount = round_cash(amount);
        let resulting = round_cash(self.current(balance_type) + side.signed(amount));
        let transaction = Transaction {
            id: Uuid::new_v4(),
            side,
            balance_type,
            activity_type,
            amount,
            resulting_balance: resulting,
            related_activity_id,
            recorded_at: Utc::now(),
        };
        self.current.insert(balance_type, resulting);
        self.pending.push(transaction.clone());
        Ok(transaction)
    }

    /// True iff debiting `amount` would not take the balance below zero.
    pub fn is_sufficient_for_debit(&mut self, amount: Decimal, balance_type: BalanceType) -> bool {
        self.current(balance_type) - amount >= Decimal::ZERO
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Hands the pending records to the unit of work, emptying the list.
    pub fn take_pending(&mut self) -> Vec<Transaction> {
        std::mem::take(&mut self.pending)
    }
}

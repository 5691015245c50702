//! Offset-based trade cancellation.
//!
//! A cancellation never deletes anything: it appends an offset trade whose
//! records exactly reverse the original's financial and position effects,
//! leaving both chains intact for audit.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use uuid::Uuid;

use bullion_api::model::balance::ActivityType;
use bullion_api::model::trade::{CancellationState, Trade, TradeItem, TradeType};
use bullion_api::traits::store::TradeStore;

use crate::error::{CoreError, Result};
use crate::ledger::positions::PositionCache;
use crate::ledger::BalanceCache;

/// Builds the mirror trade that reverses a confirmed trade.
pub struct OffsetCancellationEngine {
    trades: Arc<dyn TradeStore>,
}

impl OffsetCancellationEngine {
    pub fn new(trades: Arc<dyn TradeStore>) -> Self {
        Self { trades }
    }

    /// Produces the offset trade and the cancelled original.
    ///
    /// Every position and transaction attached to the original gets exactly
    /// one mirror record (opposite side, identical magnitude) created
    /// through the scope caches so running values stay correct. Nothing is
    /// persisted here; the caller commits the whole set in one unit of
    /// work.
    pub fn build_offset(
        &self,
        original: &Trade,
        balances: &mut BalanceCache,
        book: &mut PositionCache,
        now: DateTime<Utc>,
        value_date: NaiveDate,
        trade_number: u64,
    ) -> Result<(Trade, Trade)> {
        if original.is_cancelled() {
            return Err(CoreError::AlreadyCancelled(original.id));
        }
        if !original.is_cancellation_allowed() {
            return Err(CoreError::CancellationNotAllowed(original.id));
        }

        let offset_id = Uuid::new_v4();

        for position in self.trades.positions_for_trade(original.id) {
            book.post(
                position.key.clone(),
                position.side.opposite(),
                position.quantity_units,
                Some(offset_id),
            )?;
        }
        for transaction in self.trades.transactions_for_activity(original.id) {
            balances.post(
                transaction.balance_type,
                transaction.side.opposite(),
                ActivityType::TradeCancellation,
                transaction.amount,
                Some(offset_id),
            )?;
        }

        // Cancellation is a wash, not a new revenue event.
        let items: Vec<TradeItem> = original.items.iter().map(TradeItem::mirrored).collect();

        let offset = Trade {
            id: offset_id,
            trade_number,
            trade_type: TradeType::Offset,
            side: original.side.opposite(),
            location: original.location,
            items,
            external_ticket: None,
            quote_id: None,
            offsets_trade_id: Some(original.id),
            traded_at: now,
            value_date,
            position_settled_at: None,
            financially_settled_at: None,
            cancellation: CancellationState::None,
        };

        let mut cancelled = original.clone();
        cancelled.cancellation = CancellationState::CancelledWithOffset {
            offset_trade_id: offset_id,
            cancelled_at: now,
        };

        info!(
            "built offset trade {} reversing trade {} ({} position(s), {} transaction(s))",
            trade_number,
            original.trade_number,
            book.pending().len(),
            balances.pending().len()
        );
        Ok((offset, cancelled))
    }
}

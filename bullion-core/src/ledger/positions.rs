//! Per-operation cache of inventory positions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use rust_decimal::Decimal;
use uuid::Uuid;

use bullion_api::model::position::{Position, PositionKey, PositionSide};
use bullion_api::traits::store::LedgerReader;

use crate::error::{CoreError, Result};

/// Per-operation cache of the current quantity for each
/// (product, location, position type) chain.
///
/// Same contract as [`crate::ledger::BalanceCache`]: one chain read per
/// distinct key per scope, pending records sequenced in call order.
pub struct PositionCache {
    reader: Arc<dyn LedgerReader>,
    current: HashMap<PositionKey, Decimal>,
    pending: Vec<Position>,
}

impl PositionCache {
    pub fn new(reader: Arc<dyn LedgerReader>) -> Self {
        Self {
            reader,
            current: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Current quantity for `key`, including pending same-scope records.
    pub fn current(&mut self, key: &PositionKey) -> Decimal {
        if let Some(value) = self.current.get(key) {
            return *value;
        }
        let value = self
            .reader
            .latest_position(key)
            .map(|p| p.resulting_units)
            .unwrap_or(Decimal::ZERO);
        debug!("position chain read: {:?} = {}", key, value);
        self.current.insert(key.clone(), value);
        value
    }

    /// Creates the next link of the chain without persisting it.
    pub fn post(
        &mut self,
        key: PositionKey,
        side: PositionSide,
        quantity_units: Decimal,
        related_trade_id: Option<Uuid>,
    ) -> Result<Position> {
        if quantity_units <= Decimal::ZERO {
            return Err(CoreError::InvalidAmount(quantity_units));
        }
        let resulting = self.current(&key) + side.signed(quantity_units);
        let position = Position {
            id: Uuid::new_v4(),
            key: key.clone(),
            side,
            quantity_units,
            resulting_units: resulting,
            related_trade_id,
            recorded_at: Utc::now(),
        };
        self.current.insert(key, resulting);
        self.pending.push(position.clone());
        Ok(position)
    }

    /// True iff selling `quantity` would not take the position below zero.
    pub fn is_sufficient_for_sell(&mut self, quantity: Decimal, key: &PositionKey) -> bool {
        self.current(key) - quantity >= Decimal::ZERO
    }

    pub fn pending(&self) -> &[Position] {
        &self.pending
    }

    /// Hands the pending records to the unit of work, emptying the list.
    pub fn take_pending(&mut self) -> Vec<Position> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use bullion_api::model::position::{LocationType, PositionType};
    use rust_decimal_macros::dec;

    fn key() -> PositionKey {
        PositionKey::new(
            Uuid::nil(),
            LocationType::NewYork,
            PositionType::AvailableForTrading,
        )
    }

    #[test]
    fn test_running_quantity_and_single_read() {
        let store = Arc::new(MemoryStore::new());
        store.seed_position(key(), dec!(100));
        let seeded_reads = store.chain_reads();

        let mut cache = PositionCache::new(store.clone());
        let p1 = cache
            .post(key(), PositionSide::Out, dec!(30), None)
            .unwrap();
        let p2 = cache.post(key(), PositionSide::In, dec!(5), None).unwrap();

        assert_eq!(p1.resulting_units, dec!(70));
        assert_eq!(p2.resulting_units, dec!(75));
        assert_eq!(store.chain_reads() - seeded_reads, 1);
    }

    #[test]
    fn test_sell_sufficiency_boundary() {
        let store = Arc::new(MemoryStore::new());
        store.seed_position(key(), dec!(10));

        let mut cache = PositionCache::new(store);
        assert!(cache.is_sufficient_for_sell(dec!(10), &key()));
        assert!(!cache.is_sufficient_for_sell(dec!(10.001), &key()));
    }

    #[test]
    fn test_distinct_keys_have_independent_chains() {
        let store = Arc::new(MemoryStore::new());
        store.seed_position(key(), dec!(10));
        let other = PositionKey::new(
            Uuid::nil(),
            LocationType::London,
            PositionType::AvailableForTrading,
        );

        let mut cache = PositionCache::new(store);
        assert_eq!(cache.current(&key()), dec!(10));
        assert_eq!(cache.current(&other), Decimal::ZERO);
    }
}

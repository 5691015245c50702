//! Chain-level properties of the scope caches against a real store.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bullion_api::model::balance::{ActivityType, BalanceType, EntrySide};
use bullion_api::model::position::{LocationType, PositionKey, PositionSide, PositionType};
use bullion_api::traits::store::{LedgerReader, StagedChanges, UnitOfWork};
use bullion_core::{BalanceCache, MemoryStore, PositionCache};

#[test]
fn test_sequential_ledger_property() {
    // v0 = 1000; debit 200 -> 800; debit 300 -> 500; debit 150 -> 350.
    let store = Arc::new(MemoryStore::new());
    store.seed_balance(BalanceType::Effective, dec!(1000));
    let reads_before = store.chain_reads();

    let mut cache = BalanceCache::new(store.clone());
    let deltas = [dec!(200), dec!(300), dec!(150)];
    let expected = [dec!(800), dec!(500), dec!(350)];
    for (delta, want) in deltas.iter().zip(expected) {
        let tx = cache
            .post(
                BalanceType::Effective,
                EntrySide::Debit,
                ActivityType::TradeSettlement,
                *delta,
                None,
            )
            .unwrap();
        assert_eq!(tx.resulting_balance, want);
    }

    // Exactly one persistence read occurred for the key in this scope.
    assert_eq!(store.chain_reads() - reads_before, 1);
}

#[test]
fn test_pending_records_survive_commit_and_feed_the_next_scope() {
    let store = Arc::new(MemoryStore::new());
    store.seed_balance(BalanceType::Effective, dec!(1000));

    let mut scope_one = BalanceCache::new(store.clone());
    scope_one
        .post(
            BalanceType::Effective,
            EntrySide::Debit,
            ActivityType::TradeSettlement,
            dec!(400),
            None,
        )
        .unwrap();
    store
        .commit(StagedChanges {
            transactions: scope_one.take_pending(),
            ..Default::default()
        })
        .unwrap();

    // A fresh scope observes the committed chain head, not its own cache.
    let mut scope_two = BalanceCache::new(store.clone());
    assert_eq!(scope_two.current(BalanceType::Effective), dec!(600));
}

#[test]
fn test_sufficiency_properties() {
    let store = Arc::new(MemoryStore::new());
    store.seed_balance(BalanceType::Effective, dec!(250));
    let key = PositionKey::new(
        uuid::Uuid::new_v4(),
        LocationType::London,
        PositionType::AvailableForTrading,
    );
    store.seed_position(key.clone(), dec!(7));

    let mut balances = BalanceCache::new(store.clone());
    assert!(balances.is_sufficient_for_debit(dec!(250), BalanceType::Effective));
    assert!(!balances.is_sufficient_for_debit(dec!(250.01), BalanceType::Effective));

    let mut book = PositionCache::new(store.clone());
    assert!(book.is_sufficient_for_sell(dec!(7), &key));
    assert!(!book.is_sufficient_for_sell(dec!(7.5), &key));
}

#[test]
fn test_position_chain_mirrors_balance_chain_semantics() {
    let store = Arc::new(MemoryStore::new());
    let key = PositionKey::new(
        uuid::Uuid::new_v4(),
        LocationType::Zurich,
        PositionType::PendingDelivery,
    );

    let mut book = PositionCache::new(store.clone());
    assert_eq!(book.current(&key), Decimal::ZERO);
    let p1 = book
        .post(key.clone(), PositionSide::In, dec!(10), None)
        .unwrap();
    let p2 = book
        .post(key.clone(), PositionSide::Out, dec!(4), None)
        .unwrap();
    assert_eq!(p1.resulting_units, dec!(10));
    assert_eq!(p2.resulting_units, dec!(6));

    store
        .commit(StagedChanges {
            positions: book.take_pending(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(store.latest_position(&key).unwrap().resulting_units, dec!(6));
}

#[test]
fn test_uncommitted_scope_leaves_no_trace() {
    let store = Arc::new(MemoryStore::new());
    store.seed_balance(BalanceType::Effective, dec!(1000));

    {
        let mut scope = BalanceCache::new(store.clone());
        scope
            .post(
                BalanceType::Effective,
                EntrySide::Debit,
                ActivityType::TradeSettlement,
                dec!(999),
                None,
            )
            .unwrap();
        // Scope dropped without commit.
    }

    assert_eq!(
        store
            .latest_transaction(BalanceType::Effective)
            .unwrap()
            .resulting_balance,
        dec!(1000)
    );
    assert_eq!(store.transaction_count(), 1);
}

//! Cross-operation serialization through the request lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveTime;
use rust_decimal_macros::dec;

use bullion_api::model::balance::BalanceType;
use bullion_api::model::position::LocationType;
use bullion_api::model::product::ProductCatalog;
use bullion_api::traits::hedging::GatewayCredentials;
use bullion_api::traits::store::LedgerReader;
use bullion_core::hedging::MockHedgingGateway;
use bullion_core::{
    CoreError, DeskConfig, MemoryStore, RequestLock, StaticHolidays, TradeOrchestrator,
    FINANCIALS_AND_POSITIONS,
};

fn orchestrator(lock_timeout_ms: u64) -> (Arc<MemoryStore>, Arc<TradeOrchestrator>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MemoryStore::new());
    let mut holidays = StaticHolidays::new();
    for year in 2024..=2040 {
        holidays = holidays.with_year(year, []);
    }
    let mut credentials = HashMap::new();
    credentials.insert(
        LocationType::NewYork,
        GatewayCredentials {
            account: "desk-ny".into(),
            api_key: "test-key".into(),
        },
    );
    let orchestrator = TradeOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(MockHedgingGateway::new()),
        Arc::new(holidays),
        ProductCatalog::default(),
        credentials,
        DeskConfig::new(
            NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            120,
            lock_timeout_ms,
        ),
    );
    (store, Arc::new(orchestrator))
}

#[tokio::test]
async fn test_mutual_exclusion_with_timeout() {
    let lock = Arc::new(RequestLock::new(Duration::from_millis(80)));

    let holder = lock.acquire(FINANCIALS_AND_POSITIONS).await.unwrap();

    // A second acquirer on the same key times out while the first holds.
    let contender = lock.clone();
    let loser = tokio::spawn(async move { contender.acquire(FINANCIALS_AND_POSITIONS).await });
    let err = loser.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::LockTimeout { .. }));

    drop(holder);
    lock.acquire(FINANCIALS_AND_POSITIONS).await.unwrap();
}

#[tokio::test]
async fn test_loser_of_the_lock_mutates_nothing() {
    let (store, desk) = orchestrator(60);
    store.seed_balance(BalanceType::Effective, dec!(1000));

    let held = desk
        .request_lock()
        .acquire(FINANCIALS_AND_POSITIONS)
        .await
        .unwrap();

    let contender = desk.clone();
    let attempt =
        tokio::spawn(async move { contender.withdraw(BalanceType::Effective, dec!(100)).await });
    let err = attempt.await.unwrap().unwrap_err();
    match err {
        CoreError::LockTimeout { key, waited } => {
            assert_eq!(key, FINANCIALS_AND_POSITIONS);
            assert!(waited >= Duration::from_millis(60));
        }
        other => panic!("expected LockTimeout, got {other:?}"),
    }

    // The losing operation left the chain untouched.
    assert_eq!(store.transaction_count(), 1);
    assert_eq!(
        store
            .latest_transaction(BalanceType::Effective)
            .unwrap()
            .resulting_balance,
        dec!(1000)
    );
    drop(held);
}

#[tokio::test]
async fn test_concurrent_deposits_serialize_into_a_consistent_chain() -> anyhow::Result<()> {
    let (store, desk) = orchestrator(5_000);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let desk = desk.clone();
        handles.push(tokio::spawn(async move {
            desk.deposit(BalanceType::Effective, dec!(100)).await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    // Ten deposits of 100 land as a chain ending at exactly 1000.
    let head = store
        .latest_transaction(BalanceType::Effective)
        .expect("chain has a head");
    assert_eq!(head.resulting_balance, dec!(1000));
    assert_eq!(store.transaction_count(), 10);
    Ok(())
}

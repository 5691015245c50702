//! # Bullion Core
//!
//! Ledger consistency and concurrency core of the bullion back office: the
//! request-scoped balance/position caches, the named request lock that
//! serializes conflicting operations, quote/trade orchestration against the
//! hedging counterparty, offset-based cancellation and the business-day
//! settlement calendar.
//!
//! ## Modules
//! - `ledger`: Per-operation-scope caches over the persisted chains.
//! - `lock`: Named, timeout-bounded mutual exclusion.
//! - `calendar`: Business-day arithmetic and the settlement-date rule.
//! - `engine`: Trade orchestrator and offset cancellation engine.
//! - `store`: In-memory store implementing the persistence boundary.
//! - `events`: Post-commit fact bus for downstream processors.

pub mod calendar;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod hedging;
pub mod ledger;
pub mod lock;
pub mod store;

pub use calendar::{FederalReserveCalendar, HolidaySource, SettlementCalendar, StaticHolidays};
pub use config::DeskConfig;
pub use engine::cancellation::OffsetCancellationEngine;
pub use engine::{QuoteLine, QuoteRequest, SpotBoard, TradeOrchestrator};
pub use error::{CoreError, FieldError, Result, ValidationErrors};
pub use events::{Fact, FactBus};
pub use ledger::positions::PositionCache;
pub use ledger::BalanceCache;
pub use lock::{LockGuard, RequestLock, FINANCIALS_AND_POSITIONS};
pub use store::memory::MemoryStore;

//! # Bullion API
//!
//! Shared domain model and collaborator traits for the bullion back office.
//!
//! ## Modules
//! - `model`: Ledger chain records (Transaction, Position), products, trades
//!   and quotes with identical serialization across services.
//! - `traits`: Contracts for the external collaborators: the hedging
//!   counterparty and the persistence boundary.

pub mod model;
pub mod traits;

pub use model::balance::{ActivityType, BalanceType, EntrySide, Transaction};
pub use model::money::round_cash;
pub use model::position::{LocationType, Position, PositionKey, PositionSide, PositionType};
pub use model::product::{ListingTerms, MetalType, PremiumRule, Product, ProductCatalog};
pub use model::quote::{QuoteItem, QuoteStatus, TradeQuote};
pub use model::trade::{CancellationState, Trade, TradeItem, TradeSide, TradeType};
pub use traits::hedging::{
    GatewayCredentials, GatewayError, HedgeQuote, HedgeQuoteLine, HedgeQuoteRequest, HedgeSpot,
    HedgeTicket, HedgingGateway,
};
pub use traits::store::{LedgerReader, StagedChanges, StoreError, TradeStore, UnitOfWork};

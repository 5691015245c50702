//! Quote/trade orchestration.
//!
//! The orchestrator owns the request-to-ledger path: resolve products,
//! check sufficiency, price through the hedging counterparty, and commit
//! trades atomically. Every operation builds its caches fresh, stages its
//! records, and goes durable through a single unit-of-work commit; facts go
//! out only after that commit.

pub mod cancellation;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use log::{info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bullion_api::model::balance::{ActivityType, BalanceType, EntrySide, Transaction};
use bullion_api::model::money::round_cash;
use bullion_api::model::position::{LocationType, PositionKey, PositionSide, PositionType};
use bullion_api::model::product::{MetalType, Product, ProductCatalog};
use bullion_api::model::quote::{QuoteItem, QuoteStatus, TradeQuote};
use bullion_api::model::trade::{CancellationState, Trade, TradeItem, TradeSide, TradeType};
use bullion_api::traits::hedging::{
    GatewayCredentials, GatewayError, HedgeQuoteLine, HedgeQuoteRequest, HedgingGateway,
};
use bullion_api::traits::store::{LedgerReader, StagedChanges, TradeStore, UnitOfWork};

use crate::calendar::{HolidaySource, SettlementCalendar};
use crate::config::DeskConfig;
use crate::error::{CoreError, Result, ValidationErrors};
use crate::events::{Fact, FactBus};
use crate::ledger::positions::PositionCache;
use crate::ledger::BalanceCache;
use crate::lock::{RequestLock, FINANCIALS_AND_POSITIONS};

use cancellation::OffsetCancellationEngine;

/// One requested line of a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub sku: String,
    pub quantity: Decimal,
}

/// An inbound request to price a trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    pub side: TradeSide,
    pub location: LocationType,
    pub lines: Vec<QuoteLine>,
}

/// Last known indicative spot per metal, updated from market data.
///
/// Only the pre-quote sufficiency estimate reads it; executable prices
/// always come from the counterparty.
#[derive(Default)]
pub struct SpotBoard {
    spots: StdMutex<HashMap<MetalType, Decimal>>,
}

impl SpotBoard {
    pub fn update_spot(&self, metal: MetalType, per_oz: Decimal) {
        self.lock().insert(metal, per_oz);
    }

    pub fn spot(&self, metal: MetalType) -> Option<Decimal> {
        self.lock().get(&metal).copied()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<MetalType, Decimal>> {
        self.spots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

struct ResolvedLine {
    product: Product,
    quantity: Decimal,
    quantity_oz: Decimal,
}

/// Coordinates quoting, execution, settlement stamps, cash movements and
/// cancellation over the injected collaborators.
pub struct TradeOrchestrator {
    ledger: Arc<dyn LedgerReader>,
    trades: Arc<dyn TradeStore>,
    uow: Arc<dyn UnitOfWork>,
    gateway: Arc<dyn HedgingGateway>,
    lock: Arc<RequestLock>,
    calendar: SettlementCalendar,
    cancellation: OffsetCancellationEngine,
    catalog: ProductCatalog,
    credentials: HashMap<LocationType, GatewayCredentials>,
    spots: SpotBoard,
    facts: FactBus,
    config: DeskConfig,
}

impl TradeOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        trades: Arc<dyn TradeStore>,
        uow: Arc<dyn UnitOfWork>,
        gateway: Arc<dyn HedgingGateway>,
        holidays: Arc<dyn HolidaySource>,
        catalog: ProductCatalog,
        credentials: HashMap<LocationType, GatewayCredentials>,
        config: DeskConfig,
    ) -> Self {
        Self {
            ledger,
            trades: trades.clone(),
            uow,
            gateway,
            lock: Arc::new(RequestLock::new(config.lock_timeout())),
            calendar: SettlementCalendar::new(holidays, config.market_cutoff()),
            cancellation: OffsetCancellationEngine::new(trades),
            catalog,
            credentials,
            spots: SpotBoard::default(),
            facts: FactBus::new(),
            config,
        }
    }

    pub fn facts(&self) -> &FactBus {
        &self.facts
    }

    /// The lock instance serializing this desk's mutating operations.
    pub fn request_lock(&self) -> Arc<RequestLock> {
        self.lock.clone()
    }

    pub fn calendar(&self) -> &SettlementCalendar {
        &self.calendar
    }

    /// Feeds the indicative spot board from market data.
    pub fn update_spot(&self, metal: MetalType, per_oz: Decimal) {
        self.spots.update_spot(metal, per_oz);
    }

    /// Prices a trade request through the counterparty and persists the
    /// resulting quote.
    ///
    /// No ledger is mutated here, so the financials lock is not taken; the
    /// sufficiency check is advisory and re-run under the lock at
    /// execution.
    pub async fn request_quote(&self, request: QuoteRequest) -> Result<TradeQuote> {
        let resolved = self.resolve_lines(&request)?;
        self.check_indicative_sufficiency(&request, &resolved)?;
        let credentials = self.credentials_for(request.location)?;

        let hedge_request = HedgeQuoteRequest {
            side: request.side,
            lines: resolved
                .iter()
                .map(|line| HedgeQuoteLine {
                    product_code: line.product.sku.clone(),
                    quantity_oz: line.quantity_oz,
                })
                .collect(),
        };
        let hedge = self.gateway.request_quote(credentials, hedge_request).await?;

        let issued_at = Utc::now();
        let mut items = Vec::with_capacity(resolved.len());
        for line in &resolved {
            let spot = hedge.spot_for(&line.product.sku).ok_or_else(|| {
                CoreError::Gateway(GatewayError::Rejected {
                    code: "MISSING_PRICE".into(),
                    message: format!("no spot returned for {}", line.product.sku),
                })
            })?;
            // Listing and premium rule were validated during resolution.
            let premium = line
                .product
                .listing(request.location, request.side)
                .and_then(|l| l.premium)
                .map(|rule| rule.premium_per_oz(spot))
                .unwrap_or(Decimal::ZERO);
            items.push(QuoteItem {
                product_id: line.product.id,
                sku: line.product.sku.clone(),
                quantity: line.quantity,
                quantity_oz: line.quantity_oz,
                spot_per_oz: spot,
                premium_per_oz: premium,
                effective_per_oz: spot + premium,
            });
        }

        let quote = TradeQuote {
            id: Uuid::new_v4(),
            quote_key: hedge.quote_key,
            side: request.side,
            location: request.location,
            items,
            issued_at,
            expires_at: issued_at + self.config.quote_validity(),
            status: QuoteStatus::Created,
        };

        self.uow.commit(StagedChanges {
            quotes: vec![quote.clone()],
            ..Default::default()
        })?;
        info!(
            "quote {} issued for {:?} {:?}, {} item(s), expires {}",
            quote.id,
            quote.side,
            quote.location,
            quote.items.len(),
            quote.expires_at
        );
        self.facts.publish(Fact::QuoteIssued {
            quote_id: quote.id,
            quote_key: quote.quote_key.clone(),
            expires_at: quote.expires_at,
        });
        Ok(quote)
    }

    /// Converts a still-valid quote into a confirmed trade.
    ///
    /// Runs under the financials lock: sufficiency is re-checked there, the
    /// hedge is executed, and the trade plus its chain records commit
    /// atomically.
    pub async fn execute_quote(&self, quote_id: Uuid) -> Result<Trade> {
        let _guard = self.lock.acquire(FINANCIALS_AND_POSITIONS).await?;

        let quote = self
            .trades
            .quote(quote_id)
            .ok_or(CoreError::QuoteNotFound(quote_id))?;
        if quote.status == QuoteStatus::Consumed {
            return Err(CoreError::QuoteConsumed(quote_id));
        }
        if quote.is_expired(Utc::now()) {
            return Err(CoreError::QuoteExpired(quote_id));
        }

        let mut balances = BalanceCache::new(self.ledger.clone());
        let mut book = PositionCache::new(self.ledger.clone());
        self.check_quoted_sufficiency(&quote, &mut balances, &mut book)?;

        let credentials = self.credentials_for(quote.location)?;
        let trade_number = self.trades.next_trade_number();
        let ticket = self
            .gateway
            .request_trade(credentials, &quote.quote_key, &trade_number.to_string())
            .await?;

        let traded_at = Utc::now();
        let value_date = self.calendar.settlement_date(traded_at)?;
        let trade_id = Uuid::new_v4();
        let (entry_side, position_side) = match quote.side {
            TradeSide::Buy => (EntrySide::Debit, PositionSide::In),
            TradeSide::Sell => (EntrySide::Credit, PositionSide::Out),
        };

        let mut items = Vec::with_capacity(quote.items.len());
        for quoted in &quote.items {
            let gross = round_cash(quoted.quantity_oz * quoted.effective_per_oz);
            let revenue = round_cash(quoted.quantity_oz * quoted.premium_per_oz);
            balances.post(
                BalanceType::Effective,
                entry_side,
                ActivityType::TradeSettlement,
                gross,
                Some(trade_id),
            )?;
            book.post(
                PositionKey::new(
                    quoted.product_id,
                    quote.location,
                    PositionType::AvailableForTrading,
                ),
                position_side,
                quoted.quantity,
                Some(trade_id),
            )?;
            items.push(TradeItem {
                product_id: quoted.product_id,
                quantity: quoted.quantity,
                quantity_oz: quoted.quantity_oz,
                spot_per_oz: quoted.spot_per_oz,
                premium_per_oz: quoted.premium_per_oz,
                effective_per_oz: quoted.effective_per_oz,
                gross_amount: gross,
                revenue,
            });
        }

        let trade = Trade {
            id: trade_id,
            trade_number,
            trade_type: TradeType::Client,
            side: quote.side,
            location: quote.location,
            items,
            external_ticket: Some(ticket.ticket_number),
            quote_id: Some(quote.id),
            offsets_trade_id: None,
            traded_at,
            value_date,
            position_settled_at: None,
            financially_settled_at: None,
            cancellation: CancellationState::None,
        };

        let mut consumed = quote;
        consumed.status = QuoteStatus::Consumed;

        self.uow.commit(StagedChanges {
            trades: vec![trade.clone()],
            quotes: vec![consumed],
            transactions: balances.take_pending(),
            positions: book.take_pending(),
        })?;
        info!(
            "trade {} confirmed ({:?} {:?}), ticket {:?}, value date {}",
            trade.trade_number, trade.side, trade.location, trade.external_ticket, trade.value_date
        );
        self.facts.publish(Fact::TradeConfirmed {
            trade_id,
            trade_number,
            value_date: trade.value_date,
        });
        Ok(trade)
    }

    /// Reverses a confirmed trade with an offset trade; see
    /// [`OffsetCancellationEngine`] for the mirror rules.
    pub async fn cancel_with_offset(&self, trade_id: Uuid) -> Result<Trade> {
        let _guard = self.lock.acquire(FINANCIALS_AND_POSITIONS).await?;

        let original = self
            .trades
            .trade(trade_id)
            .ok_or(CoreError::TradeNotFound(trade_id))?;

        let mut balances = BalanceCache::new(self.ledger.clone());
        let mut book = PositionCache::new(self.ledger.clone());
        let now = Utc::now();
        let value_date = self.calendar.settlement_date(now)?;
        let trade_number = self.trades.next_trade_number();

        let (offset, cancelled_original) = self.cancellation.build_offset(
            &original,
            &mut balances,
            &mut book,
            now,
            value_date,
            trade_number,
        )?;

        self.uow.commit(StagedChanges {
            trades: vec![offset.clone(), cancelled_original],
            quotes: Vec::new(),
            transactions: balances.take_pending(),
            positions: book.take_pending(),
        })?;
        info!(
            "trade {} cancelled with offset trade {}",
            trade_id, offset.trade_number
        );
        self.facts.publish(Fact::TradeCancelled {
            trade_id,
            offset_trade_id: offset.id,
        });
        Ok(offset)
    }

    /// Stamps the inventory side of a trade settled. Driven by the external
    /// settlement processor.
    pub fn mark_position_settled(&self, trade_id: Uuid, at: DateTime<Utc>) -> Result<Trade> {
        let mut trade = self
            .trades
            .trade(trade_id)
            .ok_or(CoreError::TradeNotFound(trade_id))?;
        if trade.position_settled_at.is_some() {
            return Err(CoreError::AlreadySettled {
                trade_id,
                kind: "position",
            });
        }
        trade.position_settled_at = Some(at);
        self.uow.commit(StagedChanges {
            trades: vec![trade.clone()],
            ..Default::default()
        })?;
        self.facts.publish(Fact::PositionSettled { trade_id, at });
        Ok(trade)
    }

    /// Stamps the cash side of a trade settled, mirroring its Effective
    /// movements onto the Actual ledger.
    pub async fn mark_financially_settled(
        &self,
        trade_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Trade> {
        let _guard = self.lock.acquire(FINANCIALS_AND_POSITIONS).await?;

        let mut trade = self
            .trades
            .trade(trade_id)
            .ok_or(CoreError::TradeNotFound(trade_id))?;
        if trade.financially_settled_at.is_some() {
            return Err(CoreError::AlreadySettled {
                trade_id,
                kind: "financially",
            });
        }

        let mut balances = BalanceCache::new(self.ledger.clone());
        for movement in self.effective_movements(trade_id) {
            balances.post(
                BalanceType::Actual,
                movement.side,
                ActivityType::TradeSettlement,
                movement.amount,
                Some(trade_id),
            )?;
        }
        trade.financially_settled_at = Some(at);

        self.uow.commit(StagedChanges {
            trades: vec![trade.clone()],
            quotes: Vec::new(),
            transactions: balances.take_pending(),
            positions: Vec::new(),
        })?;
        self.facts.publish(Fact::FinanciallySettled { trade_id, at });
        Ok(trade)
    }

    /// Credits cash onto a balance.
    pub async fn deposit(&self, balance_type: BalanceType, amount: Decimal) -> Result<Transaction> {
        let _guard = self.lock.acquire(FINANCIALS_AND_POSITIONS).await?;
        let mut balances = BalanceCache::new(self.ledger.clone());
        let transaction = balances.post(
            balance_type,
            EntrySide::Credit,
            ActivityType::Deposit,
            amount,
            None,
        )?;
        self.commit_balance_movement(&mut balances, &transaction)
    }

    /// Debits cash off a balance; fails rather than overdraw.
    pub async fn withdraw(&self, balance_type: BalanceType, amount: Decimal) -> Result<Transaction> {
        let _guard = self.lock.acquire(FINANCIALS_AND_POSITIONS).await?;
        let mut balances = BalanceCache::new(self.ledger.clone());
        if !balances.is_sufficient_for_debit(amount, balance_type) {
            return Err(CoreError::InsufficientBalance {
                balance_type,
                available: balances.current(balance_type),
                requested: amount,
            });
        }
        let transaction = balances.post(
            balance_type,
            EntrySide::Debit,
            ActivityType::Withdrawal,
            amount,
            None,
        )?;
        self.commit_balance_movement(&mut balances, &transaction)
    }

    /// Stamps `Expired` on every created quote whose validity window has
    /// passed. Called by the host's scheduler.
    pub fn expire_stale_quotes(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
        let stale: Vec<TradeQuote> = self
            .trades
            .quotes_in_status(QuoteStatus::Created)
            .into_iter()
            .filter(|q| now >= q.expires_at)
            .collect();
        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let mut expired_ids = Vec::with_capacity(stale.len());
        let mut updates = Vec::with_capacity(stale.len());
        for mut quote in stale {
            quote.status = QuoteStatus::Expired;
            expired_ids.push(quote.id);
            updates.push(quote);
        }
        self.uow.commit(StagedChanges {
            quotes: updates,
            ..Default::default()
        })?;
        for quote_id in &expired_ids {
            self.facts.publish(Fact::QuoteExpired { quote_id: *quote_id });
        }
        info!("expired {} stale quote(s)", expired_ids.len());
        Ok(expired_ids)
    }

    fn commit_balance_movement(
        &self,
        balances: &mut BalanceCache,
        transaction: &Transaction,
    ) -> Result<Transaction> {
        self.uow.commit(StagedChanges {
            transactions: balances.take_pending(),
            ..Default::default()
        })?;
        self.facts.publish(Fact::BalancePosted {
            transaction_id: transaction.id,
            balance_type: transaction.balance_type,
            resulting_balance: transaction.resulting_balance,
        });
        Ok(transaction.clone())
    }

    fn effective_movements(&self, trade_id: Uuid) -> Vec<Transaction> {
        self.trades
            .transactions_for_activity(trade_id)
            .into_iter()
            .filter(|t| t.balance_type == BalanceType::Effective)
            .collect()
    }

    /// Resolves request lines to products, batching every validation
    /// failure instead of stopping at the first.
    fn resolve_lines(&self, request: &QuoteRequest) -> Result<Vec<ResolvedLine>> {
        let mut validation = ValidationErrors::default();
        if request.lines.is_empty() {
            validation.push("lines", "at least one line is required");
        }

        let mut resolved = Vec::with_capacity(request.lines.len());
        for (index, line) in request.lines.iter().enumerate() {
            let field = format!("lines[{index}]");
            if line.quantity <= Decimal::ZERO {
                validation.push(&field, format!("quantity must be positive, got {}", line.quantity));
            }
            let Some(product) = self.catalog.by_sku(&line.sku) else {
                validation.push(&field, format!("product {} not found", line.sku));
                continue;
            };
            if !product.is_tradeable(request.location, request.side) {
                validation.push(
                    &field,
                    format!(
                        "product {} not configured for {:?} {:?}",
                        line.sku, request.side, request.location
                    ),
                );
                continue;
            }
            resolved.push(ResolvedLine {
                product: product.clone(),
                quantity: line.quantity,
                quantity_oz: line.quantity * product.weight_oz,
            });
        }
        validation.into_result()?;

        let mut seen = HashSet::new();
        for line in &resolved {
            if !seen.insert(line.product.id) {
                return Err(CoreError::DuplicateProduct {
                    sku: line.product.sku.clone(),
                });
            }
        }
        // A tradeable listing without a premium rule cannot be priced.
        for line in &resolved {
            let priceable = line
                .product
                .listing(request.location, request.side)
                .map(|l| l.premium.is_some())
                .unwrap_or(false);
            if !priceable {
                return Err(CoreError::PremiumNotConfigured {
                    sku: line.product.sku.clone(),
                    location: request.location,
                });
            }
        }
        Ok(resolved)
    }

    /// Pre-quote sufficiency estimate from the indicative spot board.
    /// Raised before any gateway call.
    fn check_indicative_sufficiency(
        &self,
        request: &QuoteRequest,
        resolved: &[ResolvedLine],
    ) -> Result<()> {
        let mut balances = BalanceCache::new(self.ledger.clone());
        let mut book = PositionCache::new(self.ledger.clone());
        match request.side {
            TradeSide::Buy => {
                let mut oz_by_metal: HashMap<MetalType, Decimal> = HashMap::new();
                for line in resolved {
                    *oz_by_metal.entry(line.product.metal).or_insert(Decimal::ZERO) +=
                        line.quantity_oz;
                }
                let mut estimate = Decimal::ZERO;
                for (metal, ounces) in &oz_by_metal {
                    let spot = self
                        .spots
                        .spot(*metal)
                        .ok_or(CoreError::SpotUnavailable(*metal))?;
                    estimate += ounces * spot;
                }
                let estimate = round_cash(estimate);
                if !balances.is_sufficient_for_debit(estimate, BalanceType::Effective) {
                    warn!(
                        "quote refused: estimated cost {} exceeds effective balance",
                        estimate
                    );
                    return Err(CoreError::InsufficientBalance {
                        balance_type: BalanceType::Effective,
                        available: balances.current(BalanceType::Effective),
                        requested: estimate,
                    });
                }
            }
            TradeSide::Sell => {
                for line in resolved {
                    let key = PositionKey::new(
                        line.product.id,
                        request.location,
                        PositionType::AvailableForTrading,
                    );
                    if !book.is_sufficient_for_sell(line.quantity, &key) {
                        warn!("quote refused: not enough {} to sell", line.product.sku);
                        return Err(CoreError::InsufficientPosition {
                            available: book.current(&key),
                            requested: line.quantity,
                            key,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Definitive sufficiency check against the quoted prices, run while
    /// holding the financials lock.
    fn check_quoted_sufficiency(
        &self,
        quote: &TradeQuote,
        balances: &mut BalanceCache,
        book: &mut PositionCache,
    ) -> Result<()> {
        match quote.side {
            TradeSide::Buy => {
                let total: Decimal = quote
                    .items
                    .iter()
                    .map(|i| round_cash(i.quantity_oz * i.effective_per_oz))
                    .sum();
                if !balances.is_sufficient_for_debit(total, BalanceType::Effective) {
                    return Err(CoreError::InsufficientBalance {
                        balance_type: BalanceType::Effective,
                        available: balances.current(BalanceType::Effective),
                        requested: total,
                    });
                }
            }
            TradeSide::Sell => {
                for item in &quote.items {
                    let key = PositionKey::new(
                        item.product_id,
                        quote.location,
                        PositionType::AvailableForTrading,
                    );
                    if !book.is_sufficient_for_sell(item.quantity, &key) {
                        return Err(CoreError::InsufficientPosition {
                            available: book.current(&key),
                            requested: item.quantity,
                            key,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn credentials_for(&self, location: LocationType) -> Result<&GatewayCredentials> {
        self.credentials
            .get(&location)
            .ok_or(CoreError::MissingCredentials(location))
    }
}

//! Trade aggregate and its items.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::money::round_cash;
use super::position::LocationType;

/// Client-perspective direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn opposite(self) -> Self {
        match self {
            TradeSide::Buy => TradeSide::Sell,
            TradeSide::Sell => TradeSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Client,
    Dealer,
    /// Synthetic reversal of another trade; never hedged externally.
    Offset,
}

/// One product line of a trade, priced per troy ounce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeItem {
    pub product_id: Uuid,
    /// Units of the product.
    pub quantity: Decimal,
    /// `quantity * weight_oz` of the product.
    pub quantity_oz: Decimal,
    pub spot_per_oz: Decimal,
    pub premium_per_oz: Decimal,
    /// `spot_per_oz + premium_per_oz`.
    pub effective_per_oz: Decimal,
    /// Cash value of the line: `quantity_oz * effective_per_oz`, 2 dp.
    pub gross_amount: Decimal,
    /// Desk earnings on the line. Zero on offset trades.
    pub revenue: Decimal,
}

impl TradeItem {
    /// Re-expresses this item for the offset trade that reverses it:
    /// identical quantities and prices, zero revenue.
    pub fn mirrored(&self) -> Self {
        Self {
            revenue: Decimal::ZERO,
            ..self.clone()
        }
    }
}

/// Whether (and how) a trade has been cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancellationState {
    None,
    CancelledWithOffset {
        offset_trade_id: Uuid,
        cancelled_at: DateTime<Utc>,
    },
}

/// A confirmed trade.
///
/// Trades are only created in confirmed state; the quote lifecycle before
/// confirmation lives on [`super::quote::TradeQuote`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub trade_number: u64,
    pub trade_type: TradeType,
    pub side: TradeSide,
    pub location: LocationType,
    pub items: Vec<TradeItem>,
    /// Counterparty ticket number. `None` for offset trades.
    pub external_ticket: Option<String>,
    /// The quote this trade consumed, when it came through quoting.
    pub quote_id: Option<Uuid>,
    /// For offset trades: the original trade this one reverses.
    pub offsets_trade_id: Option<Uuid>,
    pub traded_at: DateTime<Utc>,
    /// Business date the cash is due.
    pub value_date: NaiveDate,
    pub position_settled_at: Option<DateTime<Utc>>,
    pub financially_settled_at: Option<DateTime<Utc>>,
    pub cancellation: CancellationState,
}

impl Trade {
    /// A trade may be cancelled once, and offset trades never are: reversing
    /// a reversal would resurrect the original.
    pub fn is_cancellation_allowed(&self) -> bool {
        self.trade_type != TradeType::Offset && self.cancellation == CancellationState::None
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.cancellation, CancellationState::CancelledWithOffset { .. })
    }

    /// Total cash value across items, 2 dp.
    pub fn gross_amount(&self) -> Decimal {
        round_cash(self.items.iter().map(|i| i.gross_amount).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade(trade_type: TradeType, cancellation: CancellationState) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            trade_number: 1,
            trade_type,
            side: TradeSide::Buy,
            location: LocationType::NewYork,
            items: vec![],
            external_ticket: Some("T-1".into()),
            quote_id: None,
            offsets_trade_id: None,
            traded_at: Utc::now(),
            value_date: NaiveDate::from_ymd_opt(2025, 4, 28).unwrap(),
            position_settled_at: None,
            financially_settled_at: None,
            cancellation,
        }
    }

    #[test]
    fn test_cancellation_allowed_once() {
        let fresh = trade(TradeType::Client, CancellationState::None);
        assert!(fresh.is_cancellation_allowed());

        let cancelled = trade(
            TradeType::Client,
            CancellationState::CancelledWithOffset {
                offset_trade_id: Uuid::new_v4(),
                cancelled_at: Utc::now(),
            },
        );
        assert!(!cancelled.is_cancellation_allowed());
        assert!(cancelled.is_cancelled());
    }

    #[test]
    fn test_offset_trades_cannot_be_cancelled() {
        let offset = trade(TradeType::Offset, CancellationState::None);
        assert!(!offset.is_cancellation_allowed());
    }

    #[test]
    fn test_mirrored_item_zeroes_revenue() {
        let item = TradeItem {
            product_id: Uuid::new_v4(),
            quantity: dec!(3),
            quantity_oz: dec!(3),
            spot_per_oz: dec!(2000),
            premium_per_oz: dec!(50),
            effective_per_oz: dec!(2050),
            gross_amount: dec!(6150.00),
            revenue: dec!(150.00),
        };
        let mirror = item.mirrored();
        assert_eq!(mirror.quantity, item.quantity);
        assert_eq!(mirror.gross_amount, item.gross_amount);
        assert_eq!(mirror.revenue, Decimal::ZERO);
    }
}

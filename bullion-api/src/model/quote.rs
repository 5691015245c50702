//! Priced, time-limited quotes issued ahead of execution.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::position::LocationType;
use super::trade::TradeSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteStatus {
    Created,
    /// Stamped by the expiry sweep once `expires_at` has passed.
    Expired,
    /// Consumed by trade execution; a quote converts at most once.
    Consumed,
}

/// One priced line of a quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteItem {
    pub product_id: Uuid,
    pub sku: String,
    pub quantity: Decimal,
    pub quantity_oz: Decimal,
    pub spot_per_oz: Decimal,
    pub premium_per_oz: Decimal,
    pub effective_per_oz: Decimal,
}

/// A quote priced by the hedging counterparty.
///
/// `quote_key` is the counterparty's token for the locked-in prices; it is
/// what execution hands back to convert the quote into a hedge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeQuote {
    pub id: Uuid,
    pub quote_key: String,
    pub side: TradeSide,
    pub location: LocationType,
    pub items: Vec<QuoteItem>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: QuoteStatus,
}

impl TradeQuote {
    /// True when the quote can no longer be executed for time reasons,
    /// whether or not the sweep has stamped it yet.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == QuoteStatus::Expired || now >= self.expires_at
    }
}

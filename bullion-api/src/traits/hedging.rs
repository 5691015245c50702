//! Contract with the external hedging counterparty.
//!
//! The counterparty prices quotes and executes hedges; its wire format is
//! an adapter concern. Implementations are handed location-scoped
//! credentials on every call.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::trade::TradeSide;

/// Location-scoped credentials for the counterparty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCredentials {
    pub account: String,
    pub api_key: String,
}

/// Failures reported by (or on the way to) the counterparty.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("gateway rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("gateway transport failure: {0}")]
    Transport(String),
}

/// One line of a quote request, in troy ounces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeQuoteLine {
    pub product_code: String,
    pub quantity_oz: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeQuoteRequest {
    pub side: TradeSide,
    pub lines: Vec<HedgeQuoteLine>,
}

/// Authoritative spot price for one product code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeSpot {
    pub product_code: String,
    pub spot_per_oz: Decimal,
}

/// A priced quote held open by the counterparty under `quote_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeQuote {
    pub quote_key: String,
    pub spots: Vec<HedgeSpot>,
}

impl HedgeQuote {
    pub fn spot_for(&self, product_code: &str) -> Option<Decimal> {
        self.spots
            .iter()
            .find(|s| s.product_code == product_code)
            .map(|s| s.spot_per_oz)
    }
}

/// Confirmation of an executed hedge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeTicket {
    pub ticket_number: String,
}

/// Quote and execution calls against the hedging counterparty.
///
/// Calls are awaited sequentially by the orchestrator: execution depends on
/// the quote key returned by pricing.
#[async_trait]
pub trait HedgingGateway: Send + Sync {
    /// Obtain authoritative spot prices and a time-limited quote key.
    async fn request_quote(
        &self,
        credentials: &GatewayCredentials,
        request: HedgeQuoteRequest,
    ) -> Result<HedgeQuote, GatewayError>;

    /// Convert a still-open quote into an executed hedge.
    ///
    /// `reference` is the desk's trade number, echoed on the counterparty's
    /// books; the returned ticket number becomes the trade's external
    /// reference.
    async fn request_trade(
        &self,
        credentials: &GatewayCredentials,
        quote_key: &str,
        reference: &str,
    ) -> Result<HedgeTicket, GatewayError>;
}

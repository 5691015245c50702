//! Scripted hedging gateway for tests and paper trading.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use bullion_api::traits::hedging::{
    GatewayCredentials, GatewayError, HedgeQuote, HedgeQuoteRequest, HedgeSpot, HedgeTicket,
    HedgingGateway,
};

/// Gateway double that answers from a scripted spot table and records every
/// request it sees.
///
/// Prices are keyed by product code. A code with no scripted price makes
/// the quote call fail the way the real counterparty rejects an unknown
/// product.
pub struct MockHedgingGateway {
    spots: StdMutex<HashMap<String, Decimal>>,
    reject_all: StdMutex<Option<(String, String)>>,
    quote_calls: AtomicU64,
    trade_calls: AtomicU64,
    seen_requests: StdMutex<Vec<HedgeQuoteRequest>>,
    seen_quote_keys: StdMutex<Vec<String>>,
}

impl MockHedgingGateway {
    pub fn new() -> Self {
        Self {
            spots: StdMutex::new(HashMap::new()),
            reject_all: StdMutex::new(None),
            quote_calls: AtomicU64::new(0),
            trade_calls: AtomicU64::new(0),
            seen_requests: StdMutex::new(Vec::new()),
            seen_quote_keys: StdMutex::new(Vec::new()),
        }
    }

    /// Scripts the spot price returned for a product code.
    pub fn set_spot(&self, product_code: impl Into<String>, spot_per_oz: Decimal) {
        self.lock(&self.spots).insert(product_code.into(), spot_per_oz);
    }

    /// Makes every subsequent call fail with the given code and message.
    pub fn reject_with(&self, code: impl Into<String>, message: impl Into<String>) {
        *self.lock(&self.reject_all) = Some((code.into(), message.into()));
    }

    pub fn quote_calls(&self) -> u64 {
        self.quote_calls.load(Ordering::SeqCst)
    }

    pub fn trade_calls(&self) -> u64 {
        self.trade_calls.load(Ordering::SeqCst)
    }

    pub fn seen_requests(&self) -> Vec<HedgeQuoteRequest> {
        self.lock(&self.seen_requests).clone()
    }

    pub fn seen_quote_keys(&self) -> Vec<String> {
        self.lock(&self.seen_quote_keys).clone()
    }

    fn lock<'a, T>(&self, m: &'a StdMutex<T>) -> std::sync::MutexGuard<'a, T> {
        m.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MockHedgingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HedgingGateway for MockHedgingGateway {
    async fn request_quote(
        &self,
        _credentials: &GatewayCredentials,
        request: HedgeQuoteRequest,
    ) -> Result<HedgeQuote, GatewayError> {
        let call = self.quote_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((code, message)) = self.lock(&self.reject_all).clone() {
            return Err(GatewayError::Rejected { code, message });
        }

        let spots = self.lock(&self.spots);
        let mut priced = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let spot = spots.get(&line.product_code).copied().ok_or_else(|| {
                GatewayError::Rejected {
                    code: "UNKNOWN_PRODUCT".into(),
                    message: format!("no market for {}", line.product_code),
                }
            })?;
            priced.push(HedgeSpot {
                product_code: line.product_code.clone(),
                spot_per_oz: spot,
            });
        }
        drop(spots);

        self.lock(&self.seen_requests).push(request);
        Ok(HedgeQuote {
            quote_key: format!("QK-{call}"),
            spots: priced,
        })
    }

    async fn request_trade(
        &self,
        _credentials: &GatewayCredentials,
        quote_key: &str,
        reference: &str,
    ) -> Result<HedgeTicket, GatewayError> {
        let call = self.trade_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((code, message)) = self.lock(&self.reject_all).clone() {
            return Err(GatewayError::Rejected { code, message });
        }
        self.lock(&self.seen_quote_keys).push(quote_key.to_string());
        Ok(HedgeTicket {
            ticket_number: format!("TKT-{call}-{reference}"),
        })
    }
}

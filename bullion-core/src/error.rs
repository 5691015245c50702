//! Error taxonomy of the core.
//!
//! Validation and domain errors are expected and surface to the caller
//! unchanged; lock, gateway and commit failures abort the operation with no
//! mutation (pending cache writes die with the scope).

use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use bullion_api::model::balance::BalanceType;
use bullion_api::model::position::{LocationType, PositionKey};
use bullion_api::traits::hedging::GatewayError;
use bullion_api::traits::store::StoreError;

/// One rejected field of an inbound request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Batched input validation failures. Never mutates state; collected in
/// full rather than failing on the first offending field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// `Ok(())` when nothing was collected, the batched error otherwise.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{}", joined)
    }
}

/// Global error type for the core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input shape; one entry per offending field.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("insufficient {balance_type:?} balance: available {available}, requested {requested}")]
    InsufficientBalance {
        balance_type: BalanceType,
        available: Decimal,
        requested: Decimal,
    },

    #[error("insufficient position for {key:?}: available {available}, requested {requested}")]
    InsufficientPosition {
        key: PositionKey,
        available: Decimal,
        requested: Decimal,
    },

    #[error("duplicate product {sku} in request")]
    DuplicateProduct { sku: String },

    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("no indicative spot price for {0:?}")]
    SpotUnavailable(bullion_api::model::product::MetalType),

    #[error("premium not configured for {sku} at {location:?}")]
    PremiumNotConfigured { sku: String, location: LocationType },

    #[error("quote {0} not found")]
    QuoteNotFound(Uuid),

    #[error("quote {0} has expired")]
    QuoteExpired(Uuid),

    #[error("quote {0} was already consumed by a trade")]
    QuoteConsumed(Uuid),

    #[error("trade {0} not found")]
    TradeNotFound(Uuid),

    #[error("trade {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("cancellation not allowed for trade {0}")]
    CancellationNotAllowed(Uuid),

    #[error("trade {trade_id} already {kind} settled")]
    AlreadySettled { trade_id: Uuid, kind: &'static str },

    /// The wait for a contention-domain key ran out; nothing was mutated.
    #[error("timed out acquiring lock {key:?} after {waited:?}")]
    LockTimeout { key: String, waited: Duration },

    #[error("hedging gateway failure: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no hedging credentials configured for {0:?}")]
    MissingCredentials(LocationType),

    #[error("holiday data not found for year {0}")]
    HolidayDataMissing(i32),
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

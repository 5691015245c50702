//! Inventory ledger records.
//!
//! Positions follow the same append-only chain model as cash transactions,
//! keyed by `(product, location, position type)` instead of a balance type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vault locations the desk trades out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationType {
    NewYork,
    London,
    Zurich,
}

/// Named inventory ledgers tracked per product and location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionType {
    AvailableForTrading,
    PendingDelivery,
}

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionSide {
    In,
    Out,
}

impl PositionSide {
    pub fn opposite(self) -> Self {
        match self {
            PositionSide::In => PositionSide::Out,
            PositionSide::Out => PositionSide::In,
        }
    }

    /// Applies the side's sign to a positive quantity: `In` adds, `Out`
    /// subtracts.
    pub fn signed(self, quantity: Decimal) -> Decimal {
        match self {
            PositionSide::In => quantity,
            PositionSide::Out => -quantity,
        }
    }
}

/// Identity of one inventory chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub product_id: Uuid,
    pub location: LocationType,
    pub position_type: PositionType,
}

impl PositionKey {
    pub fn new(product_id: Uuid, location: LocationType, position_type: PositionType) -> Self {
        Self {
            product_id,
            location,
            position_type,
        }
    }
}

/// One immutable link in an inventory chain.
///
/// Same monotonic-chain invariant as a cash transaction, with the delta
/// signed by `side`. `quantity_units` is strictly positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub key: PositionKey,
    pub side: PositionSide,
    pub quantity_units: Decimal,
    pub resulting_units: Decimal,
    pub related_trade_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_quantities() {
        assert_eq!(PositionSide::In.signed(dec!(5)), dec!(5));
        assert_eq!(PositionSide::Out.signed(dec!(5)), dec!(-5));
        assert_eq!(PositionSide::Out.opposite(), PositionSide::In);
    }
}

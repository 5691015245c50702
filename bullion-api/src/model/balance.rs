//! Cash ledger records.
//!
//! A balance is never stored directly: it is the `resulting_balance` of the
//! most recent [`Transaction`] for its [`BalanceType`]. Transactions are
//! append-only and form a monotonic chain per balance type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Named cash ledgers tracked independently of each other.
///
/// `Effective` moves at trade confirmation; `Actual` moves when cash
/// physically settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceType {
    Effective,
    Actual,
}

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySide {
    Debit,
    Credit,
}

impl EntrySide {
    pub fn opposite(self) -> Self {
        match self {
            EntrySide::Debit => EntrySide::Credit,
            EntrySide::Credit => EntrySide::Debit,
        }
    }

    /// Applies the side's sign to a positive amount: credits add, debits
    /// subtract.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            EntrySide::Credit => amount,
            EntrySide::Debit => -amount,
        }
    }
}

/// What produced a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityType {
    TradeSettlement,
    TradeCancellation,
    Deposit,
    Withdrawal,
    Adjustment,
}

/// One immutable link in a balance chain.
///
/// Invariant: `resulting_balance` equals the resulting balance of the
/// immediately preceding transaction for the same balance type (0 when none
/// exists) plus `amount` signed by `side`. `amount` is strictly positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub side: EntrySide,
    pub balance_type: BalanceType,
    pub activity_type: ActivityType,
    pub amount: Decimal,
    pub resulting_balance: Decimal,
    /// The trade or cash operation this movement belongs to.
    pub related_activity_id: Option<Uuid>,
    pub recorded_at: DateTime<Utc>,
}

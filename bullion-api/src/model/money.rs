//! Cash amount conventions shared by every ledger record.

use rust_decimal::Decimal;

/// Number of decimal places a cash amount carries.
pub const CASH_DECIMALS: u32 = 2;

/// Rounds a cash amount to the ledger precision.
pub fn round_cash(amount: Decimal) -> Decimal {
    amount.round_dp(CASH_DECIMALS)
}

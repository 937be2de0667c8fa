//! Money helpers.
//!
//! Amounts are plain [`Decimal`] values in Turkish lira. The database stores
//! them as `NUMERIC(12, 2)`; anything computed in Rust is rounded to the same
//! precision with [`round_money`] before it is persisted.

use rust_decimal::{Decimal, RoundingStrategy};

/// ISO 4217 code for every amount in the store.
pub const CURRENCY_CODE: &str = "TRY";

/// Round an amount to kuruş (two decimal places), midpoint away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount the way Turkish receipts do: `1.234,50 ₺`.
#[must_use]
pub fn format_try(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{grouped},{fraction} ₺")
}

//! ISO 4217 currency reference data.
//!
//! Decimal precision and display symbols for the currencies the pricing
//! pipeline handles. Unknown codes fall back to two decimal places.

use rust_decimal::Decimal;

/// Decimal places used when rounding amounts in a currency.
pub fn decimal_places(code: &str) -> u32 {
    match code {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
        "BHD" | "KWD" | "OMR" | "TND" => 3,
        _ => 2,
    }
}

/// Display symbol for a currency code; the code itself when unknown.
pub fn symbol(code: &str) -> &str {
    match code {
        "USD" | "CAD" | "AUD" | "NZD" | "SGD" | "HKD" | "MXN" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "CHF" => "CHF",
        "INR" => "₹",
        "BRL" => "R$",
        "SEK" | "NOK" | "DKK" => "kr",
        "PLN" => "zł",
        "KRW" => "₩",
        _ => code,
    }
}

/// Smallest representable price increment: 0.01 for two-decimal currencies,
/// 1 for zero-decimal ones.
pub fn rounding_increment(code: &str) -> Decimal {
    Decimal::new(1, decimal_places(code))
}

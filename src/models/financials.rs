use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Where the currency symbol sits relative to the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SymbolPosition {
    Before,
    After,
}

/// Computed locale-specific pricing for one product in one catalog.
///
/// One row per (product, catalog, locale); recomputation updates the row in
/// place. Regulatory and environmental fees are disclosure fields and are
/// not folded into the tax-included price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleFinancialRecord {
    pub id: Uuid,
    pub product_id: Uuid,
    pub catalog_id: Uuid,
    pub locale_id: Uuid,
    pub locale_code: String,
    pub base_price: Decimal,
    pub conversion_rate: Decimal,
    pub rate_date: DateTime<Utc>,
    pub local_price: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub tax_included_price: Decimal,
    pub regulatory_fee: Decimal,
    pub environmental_fee: Decimal,
    pub rounding_increment: Decimal,
    pub symbol_position: SymbolPosition,
    pub decimal_separator: String,
    pub thousands_separator: String,
    pub tax_inclusive_display: bool,
    pub promo_price: Option<Decimal>,
    pub promo_starts_at: Option<DateTime<Utc>>,
    pub promo_ends_at: Option<DateTime<Utc>>,
    pub effective_from: DateTime<Utc>,
    pub effective_until: Option<DateTime<Utc>>,
    pub active: bool,
}

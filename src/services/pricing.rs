use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;
use uuid::Uuid;

use crate::models::catalog::LocaleInfo;
use crate::models::content::language_of;
use crate::models::financials::{LocaleFinancialRecord, SymbolPosition};
use crate::models::job::{Job, JobParams};
use crate::models::money;
use crate::services::catalog_lookup::{CatalogError, ProductCatalog};
use crate::services::rates::{RateError, RateProvider};
use crate::services::worker::{HandlerError, JobHandler};
use crate::store::{StoreError, WorkflowStore};

/// Computes locale-specific pricing: currency conversion, tax, regulatory
/// fees, rounding, and display formatting, in that order.
pub struct FinancialCalculator {
    store: Arc<dyn WorkflowStore>,
    rates: Arc<dyn RateProvider>,
    products: Arc<dyn ProductCatalog>,
}

impl FinancialCalculator {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        rates: Arc<dyn RateProvider>,
        products: Arc<dyn ProductCatalog>,
    ) -> Self {
        Self {
            store,
            rates,
            products,
        }
    }

    /// Run the pricing pipeline for one locale. Does not persist the result.
    pub async fn compute(
        &self,
        product_id: Uuid,
        catalog_id: Uuid,
        catalog_currency: &str,
        locale: &LocaleInfo,
        base_price: Decimal,
    ) -> Result<LocaleFinancialRecord, PricingError> {
        // ── Currency conversion ──────────────────────────────────────────
        let (conversion_rate, local_price) = if locale.currency != catalog_currency {
            let rate = self.rates.rate(catalog_currency, &locale.currency).await?;
            (rate, base_price * rate)
        } else {
            (Decimal::ONE, base_price)
        };

        // ── Tax ──────────────────────────────────────────────────────────
        let tax_rate = tax_rate_for(&locale.country);
        let tax_amount = local_price * tax_rate;
        let tax_included_price = local_price + tax_amount;

        // ── Regulatory / environmental fees (disclosure only) ────────────
        let regulatory_fee = regulatory_fee_for(&locale.country);
        let environmental_fee = environmental_fee_for(&locale.country);

        // ── Rounding ─────────────────────────────────────────────────────
        let places = money::decimal_places(&locale.currency);
        let local_price_rounded = round_half_up(local_price, places);
        let tax_amount_rounded = round_half_up(tax_amount, places);
        let tax_included_rounded = round_half_up(tax_included_price, places);

        // ── Display formatting ───────────────────────────────────────────
        let format = display_format_for(&locale.code);

        Ok(LocaleFinancialRecord {
            id: Uuid::new_v4(),
            product_id,
            catalog_id,
            locale_id: locale.id,
            locale_code: locale.code.clone(),
            base_price,
            conversion_rate,
            rate_date: Utc::now(),
            local_price: local_price_rounded,
            tax_rate,
            tax_amount: tax_amount_rounded,
            tax_included_price: tax_included_rounded,
            regulatory_fee,
            environmental_fee,
            rounding_increment: money::rounding_increment(&locale.currency),
            symbol_position: format.symbol_position,
            decimal_separator: format.decimal_separator.to_string(),
            thousands_separator: format.thousands_separator.to_string(),
            tax_inclusive_display: tax_inclusive_display_for(&locale.country),
            promo_price: None,
            promo_starts_at: None,
            promo_ends_at: None,
            effective_from: Utc::now(),
            effective_until: None,
            active: true,
        })
    }

    /// Compute and store pricing for a list of locales sequentially. One bad
    /// locale does not abort the batch; the returned list holds the locale
    /// codes that succeeded.
    pub async fn compute_locales(
        &self,
        product_id: Uuid,
        catalog_id: Uuid,
        catalog_currency: &str,
        locales: &[LocaleInfo],
    ) -> Result<Vec<String>, PricingError> {
        let product = self.products.product(product_id).await?;
        let mut succeeded = Vec::with_capacity(locales.len());

        for locale in locales {
            let record = match self
                .compute(
                    product_id,
                    catalog_id,
                    catalog_currency,
                    locale,
                    product.base_price,
                )
                .await
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(
                        product_id = %product_id,
                        locale = %locale.code,
                        error = %e,
                        "locale financial computation failed"
                    );
                    continue;
                }
            };

            match self.store.upsert_locale_financials(&record).await {
                Ok(()) => succeeded.push(locale.code.clone()),
                Err(e) => warn!(
                    product_id = %product_id,
                    locale = %locale.code,
                    error = %e,
                    "failed to store locale financials"
                ),
            }
        }

        Ok(succeeded)
    }
}

#[async_trait]
impl JobHandler for FinancialCalculator {
    async fn handle(&self, job: &Job) -> Result<serde_json::Value, HandlerError> {
        let JobParams::LocaleFinancials {
            catalog_id,
            catalog_currency,
            locale,
        } = &job.params
        else {
            return Err(HandlerError::BadParams(
                "expected locale_financials parameters".to_string(),
            ));
        };

        let product = self
            .products
            .product(job.target_id)
            .await
            .map_err(PricingError::from)?;
        let record = self
            .compute(
                job.target_id,
                *catalog_id,
                catalog_currency,
                locale,
                product.base_price,
            )
            .await?;
        self.store
            .upsert_locale_financials(&record)
            .await
            .map_err(PricingError::from)?;

        Ok(serde_json::json!({
            "locale": locale.code,
            "currency": locale.currency,
            "local_price": record.local_price,
            "tax_included_price": record.tax_included_price,
        }))
    }
}

pub(crate) struct DisplayFormat {
    pub symbol_position: SymbolPosition,
    pub decimal_separator: &'static str,
    pub thousands_separator: &'static str,
}

/// Country-keyed VAT/sales-tax rates. Static placeholder policy until the
/// tax service integration lands; unknown countries are untaxed.
pub(crate) fn tax_rate_for(country: &str) -> Decimal {
    match country {
        "DE" => Decimal::new(19, 2),
        "FR" | "GB" | "AT" => Decimal::new(20, 2),
        "IT" => Decimal::new(22, 2),
        "ES" | "NL" | "BE" => Decimal::new(21, 2),
        "SE" | "DK" | "NO" => Decimal::new(25, 2),
        "PL" => Decimal::new(23, 2),
        "CH" => Decimal::new(81, 3),
        "JP" | "KR" | "AU" => Decimal::new(10, 2),
        "CA" => Decimal::new(5, 2),
        "BR" => Decimal::new(17, 2),
        _ => Decimal::ZERO,
    }
}

/// Country-keyed flat regulatory fee per unit.
pub(crate) fn regulatory_fee_for(country: &str) -> Decimal {
    match country {
        "FR" | "BE" => Decimal::new(50, 2),
        "DE" | "AT" => Decimal::new(35, 2),
        "GB" => Decimal::new(25, 2),
        _ => Decimal::ZERO,
    }
}

/// Country-keyed flat environmental (WEEE-style) fee per unit.
pub(crate) fn environmental_fee_for(country: &str) -> Decimal {
    match country {
        "FR" => Decimal::new(25, 2),
        "DE" | "NL" | "SE" | "DK" => Decimal::new(15, 2),
        _ => Decimal::ZERO,
    }
}

/// Round to the nearest increment at the currency's precision, half up.
pub(crate) fn round_half_up(amount: Decimal, places: u32) -> Decimal {
    amount.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Symbol position and separators by the locale's language prefix.
pub(crate) fn display_format_for(locale_code: &str) -> DisplayFormat {
    match language_of(locale_code) {
        "fr" => DisplayFormat {
            symbol_position: SymbolPosition::After,
            decimal_separator: ",",
            thousands_separator: " ",
        },
        "de" | "es" | "it" | "nl" | "pt" | "da" | "sv" | "nb" | "pl" | "tr" => DisplayFormat {
            symbol_position: SymbolPosition::After,
            decimal_separator: ",",
            thousands_separator: ".",
        },
        _ => DisplayFormat {
            symbol_position: SymbolPosition::Before,
            decimal_separator: ".",
            thousands_separator: ",",
        },
    }
}

/// Whether the locale's country prefers tax-inclusive display. VAT countries
/// show gross prices by default.
pub(crate) fn tax_inclusive_display_for(country: &str) -> bool {
    matches!(
        country,
        "DE" | "FR" | "GB" | "IT" | "ES" | "NL" | "BE" | "AT" | "SE" | "DK" | "NO" | "PL" | "AU"
            | "JP"
    )
}

#[derive(Debug, thiserror::Error)]
pub enum PricingError {
    #[error(transparent)]
    Rate(#[from] RateError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

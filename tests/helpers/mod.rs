//! Shared fixtures and capability fakes for engine tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::time::sleep;
use uuid::Uuid;

use catalog_workflows::models::catalog::{CatalogInfo, CatalogProduct, LocaleInfo, ProductInfo};
use catalog_workflows::models::workflow::{WorkflowJob, WorkflowStatus};
use catalog_workflows::services::catalog_lookup::{CatalogError, ProductCatalog};
use catalog_workflows::services::rates::{RateError, RateProvider};
use catalog_workflows::services::translation::{TranslationError, TranslationProvider};
use catalog_workflows::store::{MemoryStore, WorkflowStore};

/// Seeded in-memory environment: one catalog, one catalog product, and a
/// handful of European locales plus en-US.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub catalog_id: Uuid,
    pub product_id: Uuid,
    pub catalog_product_id: Uuid,
    pub locales: HashMap<&'static str, LocaleInfo>,
}

pub fn seed_env() -> TestEnv {
    let store = Arc::new(MemoryStore::new());

    let catalog_id = Uuid::new_v4();
    store.seed_catalog(CatalogInfo {
        id: catalog_id,
        code: "US-MAIN".to_string(),
        currency: "USD".to_string(),
    });

    let mut locales = HashMap::new();
    for (code, currency, country) in [
        ("en-US", "USD", "US"),
        ("de-DE", "EUR", "DE"),
        ("fr-FR", "EUR", "FR"),
        ("it-IT", "EUR", "IT"),
        ("es-ES", "EUR", "ES"),
        ("nl-NL", "EUR", "NL"),
    ] {
        let locale = LocaleInfo {
            id: Uuid::new_v4(),
            code: code.to_string(),
            currency: currency.to_string(),
            country: country.to_string(),
        };
        store.seed_locale(locale.clone());
        locales.insert(code, locale);
    }

    let product_id = Uuid::new_v4();
    let catalog_product_id = Uuid::new_v4();
    store.seed_catalog_product(CatalogProduct {
        id: catalog_product_id,
        catalog_id,
        product_id,
        sku: "SKU-100".to_string(),
        locale_workflow_status: None,
        content_workflow_status: None,
        workflow_initiated_by: None,
        workflow_initiated_at: None,
        workflow_completed_at: None,
        selected_locales: vec![],
    });

    TestEnv {
        store,
        catalog_id,
        product_id,
        catalog_product_id,
        locales,
    }
}

/// Catalog of record containing one product.
pub struct StaticCatalog {
    products: HashMap<Uuid, ProductInfo>,
}

pub fn catalog_with(product_id: Uuid, base_price: &str) -> Arc<StaticCatalog> {
    let mut products = HashMap::new();
    products.insert(
        product_id,
        ProductInfo {
            sku: "SKU-100".to_string(),
            name: "Cordless Drill".to_string(),
            description: "A compact cordless drill with two batteries.".to_string(),
            base_price: dec(base_price),
        },
    );
    Arc::new(StaticCatalog { products })
}

#[async_trait]
impl ProductCatalog for StaticCatalog {
    async fn product(&self, product_id: Uuid) -> Result<ProductInfo, CatalogError> {
        self.products
            .get(&product_id)
            .cloned()
            .ok_or(CatalogError::NotFound(product_id))
    }
}

/// Rate provider backed by a fixed table of (from, to) pairs.
pub struct StaticRates {
    rates: HashMap<(String, String), Decimal>,
}

pub fn rates(pairs: &[(&str, &str, &str)]) -> Arc<StaticRates> {
    let rates = pairs
        .iter()
        .map(|(from, to, rate)| ((from.to_string(), to.to_string()), dec(rate)))
        .collect();
    Arc::new(StaticRates { rates })
}

#[async_trait]
impl RateProvider for StaticRates {
    async fn rate(&self, from_currency: &str, to_currency: &str) -> Result<Decimal, RateError> {
        self.rates
            .get(&(from_currency.to_string(), to_currency.to_string()))
            .copied()
            .ok_or_else(|| RateError::MissingRate {
                from: from_currency.to_string(),
                to: to_currency.to_string(),
            })
    }
}

/// Translator that tags text with the target language.
pub struct EchoTranslator;

#[async_trait]
impl TranslationProvider for EchoTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        Ok(format!("[{target_lang}] {text}"))
    }
}

/// Translator that refuses one target language and tags the rest.
pub struct FlakyTranslator {
    pub refused_lang: &'static str,
}

#[async_trait]
impl TranslationProvider for FlakyTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        if target_lang == self.refused_lang {
            return Err(TranslationError::Api(
                "language pair unsupported".to_string(),
            ));
        }
        Ok(format!("[{target_lang}] {text}"))
    }
}

/// Poll a workflow row until it leaves Running (with timeout).
pub async fn wait_for_workflow(
    store: &MemoryStore,
    workflow_id: Uuid,
    timeout_secs: u64,
) -> WorkflowJob {
    let max_attempts = timeout_secs * 20; // Poll every 50ms

    for _ in 0..max_attempts {
        if let Some(row) = store.workflow_job(workflow_id).await.unwrap() {
            if row.status != WorkflowStatus::Running {
                return row;
            }
        }
        sleep(Duration::from_millis(50)).await;
    }

    panic!("workflow {workflow_id} did not reach a terminal status within {timeout_secs} seconds");
}

pub fn dec(value: &str) -> Decimal {
    value.parse().expect("invalid decimal literal")
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::models::content::{language_of, LocalizedContent, SourceContent};
use crate::models::job::{Job, JobParams};
use crate::services::catalog_lookup::{CatalogError, ProductCatalog};
use crate::services::translation::{TranslationError, TranslationProvider};
use crate::services::worker::{HandlerError, JobHandler};
use crate::store::{StoreError, WorkflowStore};

/// Search-facing meta fields are capped to what result pages display.
const META_TITLE_MAX_CHARS: usize = 60;
const META_DESCRIPTION_MAX_CHARS: usize = 160;

/// Generates per-locale product content: translates the source-locale fields
/// through the injected translation capability, applies locale-specific
/// post-processing, and upserts one content record per (product, locale).
pub struct ContentLocalizer {
    store: Arc<dyn WorkflowStore>,
    products: Arc<dyn ProductCatalog>,
    translator: Arc<dyn TranslationProvider>,
}

impl ContentLocalizer {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        products: Arc<dyn ProductCatalog>,
        translator: Arc<dyn TranslationProvider>,
    ) -> Self {
        Self {
            store,
            products,
            translator,
        }
    }

    /// Localize one product into one target locale and persist the result.
    pub async fn localize(
        &self,
        product_id: Uuid,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<LocalizedContent, LocalizationError> {
        let source = self.source_content(product_id, source_locale).await?;
        let content = self
            .render(product_id, &source, source_locale, target_locale)
            .await?;
        self.store.upsert_localized_content(&content).await?;
        Ok(content)
    }

    /// Localize into several target locales, continuing past per-locale
    /// failures. Returns the target locale codes that succeeded.
    pub async fn localize_many(
        &self,
        product_id: Uuid,
        source_locale: &str,
        target_locales: &[String],
    ) -> Result<Vec<String>, LocalizationError> {
        let source = self.source_content(product_id, source_locale).await?;
        let mut succeeded = Vec::with_capacity(target_locales.len());

        for target in target_locales {
            let content = match self
                .render(product_id, &source, source_locale, target)
                .await
            {
                Ok(content) => content,
                Err(e) => {
                    warn!(
                        product_id = %product_id,
                        target_locale = %target,
                        error = %e,
                        "content localization failed"
                    );
                    continue;
                }
            };

            match self.store.upsert_localized_content(&content).await {
                Ok(()) => succeeded.push(target.clone()),
                Err(e) => warn!(
                    product_id = %product_id,
                    target_locale = %target,
                    error = %e,
                    "failed to store localized content"
                ),
            }
        }

        Ok(succeeded)
    }

    /// Source content is the product's content record in the source locale,
    /// falling back to the catalog of record when none exists yet.
    async fn source_content(
        &self,
        product_id: Uuid,
        source_locale: &str,
    ) -> Result<SourceContent, LocalizationError> {
        if let Some(existing) = self
            .store
            .localized_content(product_id, source_locale)
            .await?
        {
            return Ok(existing.into());
        }

        let product = self.products.product(product_id).await?;
        Ok(SourceContent {
            name: product.name,
            description: product.description,
            short_description: None,
            meta_title: None,
            meta_description: None,
            keywords: Vec::new(),
        })
    }

    async fn render(
        &self,
        product_id: Uuid,
        source: &SourceContent,
        source_locale: &str,
        target_locale: &str,
    ) -> Result<LocalizedContent, LocalizationError> {
        let source_lang = language_of(source_locale);
        let target_lang = language_of(target_locale);
        let machine_translated = source_lang != target_lang;

        let (name, description, short_description, meta_title, meta_description, keywords) =
            if machine_translated {
                (
                    self.translate(&source.name, source_lang, target_lang).await?,
                    self.translate(&source.description, source_lang, target_lang)
                        .await?,
                    self.translate_opt(&source.short_description, source_lang, target_lang)
                        .await?,
                    self.translate_opt(&source.meta_title, source_lang, target_lang)
                        .await?,
                    self.translate_opt(&source.meta_description, source_lang, target_lang)
                        .await?,
                    if source.keywords.is_empty() {
                        Vec::new()
                    } else {
                        self.translator
                            .translate_batch(&source.keywords, source_lang, target_lang)
                            .await?
                    },
                )
            } else {
                // Same language: verbatim copy, no translation round-trip.
                (
                    source.name.clone(),
                    source.description.clone(),
                    source.short_description.clone(),
                    source.meta_title.clone(),
                    source.meta_description.clone(),
                    source.keywords.clone(),
                )
            };

        Ok(LocalizedContent {
            id: Uuid::new_v4(),
            product_id,
            locale_code: target_locale.to_string(),
            name: polish(target_lang, &name),
            description: polish(target_lang, &description),
            short_description: short_description.map(|text| polish(target_lang, &text)),
            meta_title: meta_title
                .map(|text| cap_chars(&polish(target_lang, &text), META_TITLE_MAX_CHARS)),
            meta_description: meta_description
                .map(|text| cap_chars(&polish(target_lang, &text), META_DESCRIPTION_MAX_CHARS)),
            keywords,
            source_locale: source_locale.to_string(),
            machine_translated,
            generated_at: Utc::now(),
        })
    }

    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        self.translator
            .translate(text, source_lang, target_lang)
            .await
    }

    async fn translate_opt(
        &self,
        text: &Option<String>,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Option<String>, TranslationError> {
        match text {
            Some(text) => Ok(Some(self.translate(text, source_lang, target_lang).await?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl JobHandler for ContentLocalizer {
    async fn handle(&self, job: &Job) -> Result<serde_json::Value, HandlerError> {
        let JobParams::MultiLanguageContent {
            source_locale,
            target_locale,
        } = &job.params
        else {
            return Err(HandlerError::BadParams(
                "expected multi_language_content parameters".to_string(),
            ));
        };

        let content = self
            .localize(job.target_id, source_locale, target_locale)
            .await?;

        Ok(serde_json::json!({
            "locale": content.locale_code,
            "machine_translated": content.machine_translated,
            "fields": {
                "name": content.name,
                "meta_title": content.meta_title,
            },
        }))
    }
}

/// Locale-specific finishing applied after translation, keyed by language.
fn polish(language: &str, text: &str) -> String {
    let cleaned = collapse_spaces(text.trim());
    match language {
        // French typography: non-breaking space before tall punctuation.
        "fr" => cleaned
            .replace(" !", "\u{a0}!")
            .replace(" ?", "\u{a0}?")
            .replace(" :", "\u{a0}:"),
        _ => cleaned,
    }
}

fn collapse_spaces(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for ch in text.chars() {
        if ch == ' ' {
            if !last_was_space {
                out.push(ch);
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

/// Truncate to at most `max` characters on a char boundary.
fn cap_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max).collect();
    truncated.trim_end().to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum LocalizationError {
    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Language prefix of a locale code: "de" for "de-DE", "pt" for "pt_BR".
pub fn language_of(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}

/// Source-locale textual content for a product, the input to localization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContent {
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Vec<String>,
}

/// Localized content record, one per (product, locale). Regeneration for the
/// same pair updates the row in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizedContent {
    pub id: Uuid,
    pub product_id: Uuid,
    pub locale_code: String,
    pub name: String,
    pub description: String,
    pub short_description: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub keywords: Vec<String>,
    pub source_locale: String,
    pub machine_translated: bool,
    pub generated_at: DateTime<Utc>,
}

impl From<LocalizedContent> for SourceContent {
    fn from(content: LocalizedContent) -> Self {
        Self {
            name: content.name,
            description: content.description,
            short_description: content.short_description,
            meta_title: content.meta_title,
            meta_description: content.meta_description,
            keywords: content.keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_of_handles_both_separators() {
        assert_eq!(language_of("de-DE"), "de");
        assert_eq!(language_of("pt_BR"), "pt");
        assert_eq!(language_of("ja"), "ja");
    }
}

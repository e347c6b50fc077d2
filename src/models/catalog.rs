use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::content::language_of;
use crate::models::job::JobKind;

/// Product-in-catalog association whose workflow status fields this engine
/// maintains. All other columns belong to the surrounding admin backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: Uuid,
    pub catalog_id: Uuid,
    pub product_id: Uuid,
    pub sku: String,
    pub locale_workflow_status: Option<AxisStatus>,
    pub content_workflow_status: Option<AxisStatus>,
    pub workflow_initiated_by: Option<String>,
    pub workflow_initiated_at: Option<DateTime<Utc>>,
    pub workflow_completed_at: Option<DateTime<Utc>>,
    pub selected_locales: Vec<String>,
}

/// Catalog master data the engine needs: display code and pricing currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogInfo {
    pub id: Uuid,
    pub code: String,
    pub currency: String,
}

/// Locale master data: locale code plus its currency and country.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleInfo {
    pub id: Uuid,
    pub code: String,
    pub currency: String,
    pub country: String,
}

impl LocaleInfo {
    /// Language prefix of the locale code ("de" for "de-DE").
    pub fn language(&self) -> &str {
        language_of(&self.code)
    }
}

/// Product master data resolved from the external catalog of record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub sku: String,
    pub name: String,
    pub description: String,
    pub base_price: Decimal,
}

/// Per-feature workflow state written onto the catalog product. Reflects the
/// outcome of the most recent job on that axis; never rolled back mid-batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AxisStatus {
    InProgress,
    Completed,
    Failed,
}

/// Which catalog-product status field a job kind reports to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAxis {
    Locale,
    Content,
}

impl WorkflowAxis {
    pub fn for_kind(kind: JobKind) -> Option<Self> {
        match kind {
            JobKind::LocaleFinancials | JobKind::CurrencyRefresh => Some(Self::Locale),
            JobKind::MultiLanguageContent => Some(Self::Content),
            JobKind::ComplianceUpdate | JobKind::CatalogRecalculation => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_for_kind() {
        assert_eq!(
            WorkflowAxis::for_kind(JobKind::LocaleFinancials),
            Some(WorkflowAxis::Locale)
        );
        assert_eq!(
            WorkflowAxis::for_kind(JobKind::CurrencyRefresh),
            Some(WorkflowAxis::Locale)
        );
        assert_eq!(
            WorkflowAxis::for_kind(JobKind::MultiLanguageContent),
            Some(WorkflowAxis::Content)
        );
        assert_eq!(WorkflowAxis::for_kind(JobKind::ComplianceUpdate), None);
    }

    #[test]
    fn test_axis_status_round_trips_through_strings() {
        assert_eq!(AxisStatus::InProgress.to_string(), "in_progress");
        assert_eq!("failed".parse::<AxisStatus>().unwrap(), AxisStatus::Failed);
    }

    #[test]
    fn test_locale_language_prefix() {
        let locale = LocaleInfo {
            id: Uuid::new_v4(),
            code: "de-DE".to_string(),
            currency: "EUR".to_string(),
            country: "DE".to_string(),
        };
        assert_eq!(locale.language(), "de");
    }
}

use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::catalog::AxisStatus;
use crate::models::job::JobKind;

/// Lifecycle of a persisted workflow job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    Running,
    Completed,
    Failed,
}

/// Persisted record aggregating progress across the queue jobs spawned by one
/// orchestrator invocation. Counter columns are updated with atomic SQL
/// increments; the row is a best-effort projection for UI consumption, not
/// the source of truth for individual job outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: Uuid,
    pub name: String,
    pub job_type: String,
    pub total_items: i32,
    pub completed_items: i32,
    pub failed_items: i32,
    pub progress_percentage: i32,
    pub status: WorkflowStatus,
    pub catalog_code: Option<String>,
    pub product_skus: Vec<String>,
    pub locale_codes: Vec<String>,
    pub catalog_product_id: Option<Uuid>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowJob {
    pub fn new(
        name: impl Into<String>,
        job_type: JobKind,
        total_items: i32,
        catalog_code: impl Into<String>,
        product_skus: Vec<String>,
        locale_codes: Vec<String>,
        catalog_product_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            job_type: job_type.to_string(),
            total_items,
            completed_items: 0,
            failed_items: 0,
            progress_percentage: if total_items == 0 { 100 } else { 0 },
            status: WorkflowStatus::Running,
            catalog_code: Some(catalog_code.into()),
            product_skus,
            locale_codes,
            catalog_product_id,
            error: None,
            created_at: now,
            started_at: Some(now),
            completed_at: None,
        }
    }

    /// Recompute the derived percentage from the counters. An empty workflow
    /// counts as fully complete.
    pub fn recompute_progress(&mut self) {
        self.progress_percentage = if self.total_items == 0 {
            100
        } else {
            (self.completed_items * 100 / self.total_items).min(100)
        };
    }

    /// True once every item has reached a terminal outcome.
    pub fn all_items_settled(&self) -> bool {
        self.completed_items + self.failed_items >= self.total_items
    }
}

/// Handle returned by the orchestrator's fire-and-forget entry points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowHandle {
    pub workflow_job_id: Uuid,
    pub status: WorkflowStatus,
    pub estimated_completion: DateTime<Utc>,
}

/// Per-axis workflow view for one catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub locale_status: Option<AxisStatus>,
    pub content_status: Option<AxisStatus>,
    pub overall_progress_percent: i32,
}

/// Request to compute locale financials for a set of locales.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocaleFinancialsRequest {
    #[garde(skip)]
    pub catalog_product_id: Uuid,

    #[garde(length(min = 1, max = 100))]
    pub locale_ids: Vec<Uuid>,

    #[garde(length(min = 1, max = 120))]
    pub initiator: String,
}

/// Request to generate localized content for a set of target locales.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContentGenerationRequest {
    #[garde(skip)]
    pub catalog_product_id: Uuid,

    #[garde(length(min = 2, max = 16))]
    pub source_locale: String,

    #[garde(length(min = 1, max = 100), inner(length(min = 2, max = 16)))]
    pub target_locales: Vec<String>,

    #[garde(length(min = 1, max = 120))]
    pub initiator: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_workflow_is_complete() {
        let job = WorkflowJob::new(
            "noop",
            JobKind::LocaleFinancials,
            0,
            "EU",
            vec![],
            vec![],
            None,
        );
        assert_eq!(job.progress_percentage, 100);
        assert!(job.all_items_settled());
    }

    #[test]
    fn test_progress_recompute() {
        let mut job = WorkflowJob::new(
            "pricing",
            JobKind::LocaleFinancials,
            4,
            "EU",
            vec!["SKU-1".to_string()],
            vec!["de-DE".to_string()],
            None,
        );
        job.completed_items = 3;
        job.recompute_progress();
        assert_eq!(job.progress_percentage, 75);
        assert!(!job.all_items_settled());

        job.failed_items = 1;
        assert!(job.all_items_settled());
    }

    #[test]
    fn test_request_validation_rejects_empty_locales() {
        let request = LocaleFinancialsRequest {
            catalog_product_id: Uuid::new_v4(),
            locale_ids: vec![],
            initiator: "admin@example.com".to_string(),
        };
        assert!(request.validate().is_err());
    }
}

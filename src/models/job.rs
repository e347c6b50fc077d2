use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::models::catalog::LocaleInfo;

/// Default retry budget before a job is marked failed for good.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Kind of background work a job carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobKind {
    LocaleFinancials,
    MultiLanguageContent,
    CurrencyRefresh,
    ComplianceUpdate,
    CatalogRecalculation,
}

/// Status of a job in the async queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Kind-specific job payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobParams {
    LocaleFinancials {
        catalog_id: Uuid,
        catalog_currency: String,
        locale: LocaleInfo,
    },
    MultiLanguageContent {
        source_locale: String,
        target_locale: String,
    },
    CurrencyRefresh {
        currencies: Vec<String>,
    },
    ComplianceUpdate {
        region: String,
    },
    CatalogRecalculation {
        catalog_id: Uuid,
    },
}

/// A unit of asynchronous work tracked by the in-process queue.
///
/// Jobs are created by the orchestrator at enqueue time, mutated only by the
/// queue on behalf of the worker, and retained as history after they reach a
/// terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub target_id: Uuid,
    pub target_type: String,
    pub params: JobParams,
    pub status: JobStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_by: String,
    pub workflow_job_id: Option<Uuid>,
    pub catalog_product_id: Option<Uuid>,
}

impl Job {
    /// Wall-clock processing time, available once the job is terminal.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => Some(completed - started),
            _ => None,
        }
    }

    /// Build the re-enqueue entry for a failed attempt: same work and links,
    /// retry count incremented. The new entry lands at the tail of the queue,
    /// so ordering relative to other pending jobs is not preserved.
    pub fn retry_entry(&self) -> NewJob {
        NewJob {
            kind: self.kind,
            target_id: self.target_id,
            target_type: self.target_type.clone(),
            params: self.params.clone(),
            created_by: self.created_by.clone(),
            retry_count: self.retry_count + 1,
            max_retries: self.max_retries,
            workflow_job_id: self.workflow_job_id,
            catalog_product_id: self.catalog_product_id,
        }
    }
}

/// Everything needed to enqueue a job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub kind: JobKind,
    pub target_id: Uuid,
    pub target_type: String,
    pub params: JobParams,
    pub created_by: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub workflow_job_id: Option<Uuid>,
    pub catalog_product_id: Option<Uuid>,
}

impl NewJob {
    pub fn new(
        kind: JobKind,
        target_id: Uuid,
        target_type: impl Into<String>,
        params: JobParams,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target_id,
            target_type: target_type.into(),
            params,
            created_by: created_by.into(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            workflow_job_id: None,
            catalog_product_id: None,
        }
    }

    /// Link the job to a persisted workflow row and the catalog product it affects.
    pub fn for_workflow(mut self, workflow_job_id: Uuid, catalog_product_id: Uuid) -> Self {
        self.workflow_job_id = Some(workflow_job_id);
        self.catalog_product_id = Some(catalog_product_id);
        self
    }
}

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::catalog::{AxisStatus, CatalogInfo, CatalogProduct, LocaleInfo, WorkflowAxis};
use crate::models::content::LocalizedContent;
use crate::models::financials::LocaleFinancialRecord;
use crate::models::workflow::{WorkflowJob, WorkflowStatus};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Persistence capability behind the tracker, calculator, and localizer.
///
/// Catalogs, locales, and catalog products are read (and, for workflow status
/// fields, written) from the surrounding admin schema; workflow jobs, locale
/// financials, and localized content are owned by this engine. All writes are
/// idempotent upserts so a replayed outcome converges instead of duplicating.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    // Reference lookups
    async fn catalog(&self, id: Uuid) -> Result<Option<CatalogInfo>, StoreError>;
    async fn locale(&self, id: Uuid) -> Result<Option<LocaleInfo>, StoreError>;
    async fn locale_by_code(&self, code: &str) -> Result<Option<LocaleInfo>, StoreError>;
    async fn catalog_product(&self, id: Uuid) -> Result<Option<CatalogProduct>, StoreError>;

    // Workflow job rows
    async fn insert_workflow_job(&self, job: &WorkflowJob) -> Result<(), StoreError>;
    async fn workflow_job(&self, id: Uuid) -> Result<Option<WorkflowJob>, StoreError>;
    async fn workflow_jobs_for_product(
        &self,
        catalog_product_id: Uuid,
    ) -> Result<Vec<WorkflowJob>, StoreError>;

    /// Atomically record one terminal item outcome against a workflow row and
    /// return the updated row. Returns `None` for unknown rows and for rows
    /// whose counters are already exhausted, preserving
    /// `completed_items + failed_items <= total_items`.
    async fn record_workflow_item(
        &self,
        id: Uuid,
        failed: bool,
    ) -> Result<Option<WorkflowJob>, StoreError>;

    /// Move a running workflow row to a terminal status and stamp completion.
    /// No-op for rows that are not running.
    async fn complete_workflow_job(
        &self,
        id: Uuid,
        status: WorkflowStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Close every workflow row that has been running longer than
    /// `older_than`, returning the ids that were closed.
    async fn force_complete_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<Uuid>, StoreError>;

    // Catalog product workflow fields
    async fn begin_product_workflow(
        &self,
        id: Uuid,
        axis: WorkflowAxis,
        initiated_by: &str,
        selected_locales: &[String],
    ) -> Result<(), StoreError>;

    async fn complete_product_workflow(
        &self,
        id: Uuid,
        axis: WorkflowAxis,
        status: AxisStatus,
    ) -> Result<(), StoreError>;

    // Computed records
    async fn upsert_locale_financials(
        &self,
        record: &LocaleFinancialRecord,
    ) -> Result<(), StoreError>;

    async fn locale_financials(
        &self,
        product_id: Uuid,
        catalog_id: Uuid,
        locale_id: Uuid,
    ) -> Result<Option<LocaleFinancialRecord>, StoreError>;

    async fn upsert_localized_content(&self, content: &LocalizedContent)
        -> Result<(), StoreError>;

    async fn localized_content(
        &self,
        product_id: Uuid,
        locale_code: &str,
    ) -> Result<Option<LocalizedContent>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed stored value: {0}")]
    Malformed(String),
}

use std::sync::Arc;

use uuid::Uuid;

use crate::models::catalog::{AxisStatus, WorkflowAxis};
use crate::models::job::Job;
use crate::models::workflow::{WorkflowProgress, WorkflowStatus};
use crate::store::{StoreError, WorkflowStore};

/// Reconciles terminal job outcomes into the persisted workflow row and the
/// catalog product's workflow status fields.
///
/// Both projections are best-effort: a persistence failure is logged and
/// never rolls back the job's own terminal status. The queue's in-memory
/// history stays authoritative; the staleness sweep is the backstop for rows
/// left behind by a failed update.
pub struct WorkflowTracker {
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowTracker {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// Record one terminal job outcome. `error` is `None` for a completed
    /// job and the failure message for a job whose retries are exhausted.
    pub async fn record_outcome(&self, job: &Job, error: Option<&str>) {
        if let Some(workflow_id) = job.workflow_job_id {
            if let Err(e) = self.settle_workflow_row(workflow_id, error).await {
                tracing::warn!(
                    workflow_job_id = %workflow_id,
                    job_id = %job.id,
                    error = %e,
                    "failed to update workflow job row"
                );
            }
        }

        if let Some(product_id) = job.catalog_product_id {
            if let Some(axis) = WorkflowAxis::for_kind(job.kind) {
                let status = if error.is_none() {
                    AxisStatus::Completed
                } else {
                    AxisStatus::Failed
                };
                if let Err(e) = self
                    .store
                    .complete_product_workflow(product_id, axis, status)
                    .await
                {
                    tracing::warn!(
                        catalog_product_id = %product_id,
                        job_id = %job.id,
                        error = %e,
                        "failed to update catalog product workflow status"
                    );
                }
            }
        }
    }

    async fn settle_workflow_row(
        &self,
        workflow_id: Uuid,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let Some(row) = self
            .store
            .record_workflow_item(workflow_id, error.is_some())
            .await?
        else {
            return Ok(());
        };

        if row.all_items_settled() {
            // Failed wins: one failed item marks the whole workflow failed.
            let status = if row.failed_items > 0 {
                WorkflowStatus::Failed
            } else {
                WorkflowStatus::Completed
            };
            self.store
                .complete_workflow_job(workflow_id, status, error)
                .await?;
        }

        Ok(())
    }

    /// Close workflow rows that have been running longer than the threshold.
    /// Compensates for terminal updates lost to reconciliation failures.
    pub async fn force_complete_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<Uuid>, StoreError> {
        let closed = self.store.force_complete_stale(older_than).await?;
        for id in &closed {
            tracing::warn!(workflow_job_id = %id, "force-completed stale workflow job");
        }
        Ok(closed)
    }

    /// Close one workflow row regardless of age. Returns `false` when the
    /// row does not exist.
    pub async fn force_complete(&self, workflow_id: Uuid) -> Result<bool, StoreError> {
        let Some(row) = self.store.workflow_job(workflow_id).await? else {
            return Ok(false);
        };

        if row.status == WorkflowStatus::Running {
            let status = if row.failed_items > 0 {
                WorkflowStatus::Failed
            } else {
                WorkflowStatus::Completed
            };
            self.store
                .complete_workflow_job(workflow_id, status, Some("force-completed"))
                .await?;
        }
        Ok(true)
    }

    /// Per-axis workflow view for one catalog product, with an overall
    /// percentage across all of its workflow rows. Returns `None` when the
    /// product does not exist.
    pub async fn workflow_progress(
        &self,
        catalog_product_id: Uuid,
    ) -> Result<Option<WorkflowProgress>, StoreError> {
        let Some(product) = self.store.catalog_product(catalog_product_id).await? else {
            return Ok(None);
        };

        let rows = self
            .store
            .workflow_jobs_for_product(catalog_product_id)
            .await?;
        let total: i32 = rows.iter().map(|r| r.total_items).sum();
        let completed: i32 = rows.iter().map(|r| r.completed_items).sum();
        let overall = if total == 0 {
            100
        } else {
            (completed * 100 / total).min(100)
        };

        Ok(Some(WorkflowProgress {
            locale_status: product.locale_workflow_status,
            content_status: product.content_workflow_status,
            overall_progress_percent: overall,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::CatalogProduct;
    use crate::models::job::{JobKind, JobParams, JobStatus, DEFAULT_MAX_RETRIES};
    use crate::models::workflow::WorkflowJob;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn terminal_job(
        kind: JobKind,
        workflow_job_id: Option<Uuid>,
        catalog_product_id: Option<Uuid>,
    ) -> Job {
        Job {
            id: Uuid::new_v4(),
            kind,
            target_id: Uuid::new_v4(),
            target_type: "Product".to_string(),
            params: JobParams::CurrencyRefresh { currencies: vec![] },
            status: JobStatus::Completed,
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            created_by: "tests".to_string(),
            workflow_job_id,
            catalog_product_id,
        }
    }

    fn seeded_product(store: &MemoryStore) -> Uuid {
        let product = CatalogProduct {
            id: Uuid::new_v4(),
            catalog_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            sku: "SKU-1".to_string(),
            locale_workflow_status: None,
            content_workflow_status: None,
            workflow_initiated_by: None,
            workflow_initiated_at: None,
            workflow_completed_at: None,
            selected_locales: vec![],
        };
        let id = product.id;
        store.seed_catalog_product(product);
        id
    }

    #[tokio::test]
    async fn test_workflow_completes_when_all_items_settle() {
        let store = Arc::new(MemoryStore::new());
        let tracker = WorkflowTracker::new(store.clone());
        let workflow = WorkflowJob::new(
            "pricing",
            JobKind::LocaleFinancials,
            2,
            "EU",
            vec![],
            vec![],
            None,
        );
        store.insert_workflow_job(&workflow).await.unwrap();

        let job = terminal_job(JobKind::LocaleFinancials, Some(workflow.id), None);
        tracker.record_outcome(&job, None).await;

        let row = store.workflow_job(workflow.id).await.unwrap().unwrap();
        assert_eq!(row.status, WorkflowStatus::Running);
        assert_eq!(row.progress_percentage, 50);

        tracker.record_outcome(&job, None).await;
        let row = store.workflow_job(workflow.id).await.unwrap().unwrap();
        assert_eq!(row.status, WorkflowStatus::Completed);
        assert!(row.completed_at.is_some());
        assert_eq!(row.progress_percentage, 100);
    }

    #[tokio::test]
    async fn test_failed_item_wins() {
        let store = Arc::new(MemoryStore::new());
        let tracker = WorkflowTracker::new(store.clone());
        let workflow = WorkflowJob::new(
            "pricing",
            JobKind::LocaleFinancials,
            2,
            "EU",
            vec![],
            vec![],
            None,
        );
        store.insert_workflow_job(&workflow).await.unwrap();

        let job = terminal_job(JobKind::LocaleFinancials, Some(workflow.id), None);
        tracker.record_outcome(&job, Some("rate lookup failed")).await;
        tracker.record_outcome(&job, None).await;

        let row = store.workflow_job(workflow.id).await.unwrap().unwrap();
        assert_eq!(row.status, WorkflowStatus::Failed);
        assert_eq!(row.completed_items, 1);
        assert_eq!(row.failed_items, 1);
    }

    #[tokio::test]
    async fn test_axis_status_follows_job_kind() {
        let store = Arc::new(MemoryStore::new());
        let tracker = WorkflowTracker::new(store.clone());
        let product_id = seeded_product(&store);

        let job = terminal_job(JobKind::MultiLanguageContent, None, Some(product_id));
        tracker.record_outcome(&job, None).await;

        let product = store.catalog_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.content_workflow_status, Some(AxisStatus::Completed));
        assert_eq!(product.locale_workflow_status, None);
        assert!(product.workflow_completed_at.is_some());

        let job = terminal_job(JobKind::LocaleFinancials, None, Some(product_id));
        tracker.record_outcome(&job, Some("boom")).await;

        let product = store.catalog_product(product_id).await.unwrap().unwrap();
        assert_eq!(product.locale_workflow_status, Some(AxisStatus::Failed));
    }

    #[tokio::test]
    async fn test_stale_sweep_closes_old_rows() {
        let store = Arc::new(MemoryStore::new());
        let tracker = WorkflowTracker::new(store.clone());

        let mut stale = WorkflowJob::new(
            "pricing",
            JobKind::LocaleFinancials,
            3,
            "EU",
            vec![],
            vec![],
            None,
        );
        stale.created_at = Utc::now() - chrono::Duration::minutes(10);
        store.insert_workflow_job(&stale).await.unwrap();

        let fresh = WorkflowJob::new(
            "pricing",
            JobKind::LocaleFinancials,
            3,
            "EU",
            vec![],
            vec![],
            None,
        );
        store.insert_workflow_job(&fresh).await.unwrap();

        let closed = tracker
            .force_complete_stale(chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(closed, vec![stale.id]);

        let row = store.workflow_job(stale.id).await.unwrap().unwrap();
        assert_eq!(row.status, WorkflowStatus::Completed);
        let row = store.workflow_job(fresh.id).await.unwrap().unwrap();
        assert_eq!(row.status, WorkflowStatus::Running);
    }

    #[tokio::test]
    async fn test_force_complete_unknown_row() {
        let store = Arc::new(MemoryStore::new());
        let tracker = WorkflowTracker::new(store);
        assert!(!tracker.force_complete(Uuid::new_v4()).await.unwrap());
    }
}

use std::sync::Arc;

use chrono::Utc;
use garde::Validate;

use crate::models::catalog::WorkflowAxis;
use crate::models::job::{JobKind, JobParams, NewJob};
use crate::models::workflow::{
    ContentGenerationRequest, LocaleFinancialsRequest, WorkflowHandle, WorkflowJob,
};
use crate::services::queue::JobQueue;
use crate::store::{StoreError, WorkflowStore};

/// Linear per-item estimate used for the handle's completion forecast.
const ESTIMATED_SECS_PER_ITEM: i64 = 2;

/// Entry point for user-initiated workflows: decomposes one request into a
/// persisted workflow job row plus one queue entry per unit of work, then
/// returns immediately. The worker drains the queue concurrently with the
/// caller.
pub struct WorkflowOrchestrator {
    queue: Arc<JobQueue>,
    store: Arc<dyn WorkflowStore>,
}

impl WorkflowOrchestrator {
    pub fn new(queue: Arc<JobQueue>, store: Arc<dyn WorkflowStore>) -> Self {
        Self { queue, store }
    }

    /// Start locale financial computation: one queue job per locale.
    /// Fails fast, before anything is written, when the catalog product or a
    /// locale cannot be resolved.
    pub async fn start_locale_financials(
        &self,
        request: &LocaleFinancialsRequest,
    ) -> Result<WorkflowHandle, EngineError> {
        request.validate()?;

        let product = self
            .store
            .catalog_product(request.catalog_product_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("catalog product {}", request.catalog_product_id))
            })?;
        let catalog = self
            .store
            .catalog(product.catalog_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("catalog {}", product.catalog_id)))?;

        let mut locales = Vec::with_capacity(request.locale_ids.len());
        for locale_id in &request.locale_ids {
            let locale = self
                .store
                .locale(*locale_id)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("locale {locale_id}")))?;
            locales.push(locale);
        }
        let locale_codes: Vec<String> = locales.iter().map(|l| l.code.clone()).collect();

        let workflow = WorkflowJob::new(
            format!("Locale financials for {}", product.sku),
            JobKind::LocaleFinancials,
            locales.len() as i32,
            catalog.code.clone(),
            vec![product.sku.clone()],
            locale_codes.clone(),
            Some(product.id),
        );
        self.store.insert_workflow_job(&workflow).await?;
        self.store
            .begin_product_workflow(
                product.id,
                WorkflowAxis::Locale,
                &request.initiator,
                &locale_codes,
            )
            .await?;

        for locale in locales {
            self.queue.enqueue(
                NewJob::new(
                    JobKind::LocaleFinancials,
                    product.product_id,
                    "Product",
                    JobParams::LocaleFinancials {
                        catalog_id: product.catalog_id,
                        catalog_currency: catalog.currency.clone(),
                        locale,
                    },
                    request.initiator.clone(),
                )
                .for_workflow(workflow.id, product.id),
            );
        }

        tracing::info!(
            workflow_job_id = %workflow.id,
            catalog_product_id = %product.id,
            locales = workflow.total_items,
            "locale financials workflow started"
        );

        Ok(handle_for(&workflow))
    }

    /// Start content generation: per target locale, one translation job plus
    /// one pricing job, so partial completion is visible per axis.
    pub async fn start_content_generation(
        &self,
        request: &ContentGenerationRequest,
    ) -> Result<WorkflowHandle, EngineError> {
        request.validate()?;

        let product = self
            .store
            .catalog_product(request.catalog_product_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("catalog product {}", request.catalog_product_id))
            })?;
        let catalog = self
            .store
            .catalog(product.catalog_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("catalog {}", product.catalog_id)))?;

        let mut targets = Vec::with_capacity(request.target_locales.len());
        for code in &request.target_locales {
            let locale = self
                .store
                .locale_by_code(code)
                .await?
                .ok_or_else(|| EngineError::NotFound(format!("locale {code}")))?;
            targets.push(locale);
        }
        let locale_codes: Vec<String> = targets.iter().map(|l| l.code.clone()).collect();

        let workflow = WorkflowJob::new(
            format!("Content generation for {}", product.sku),
            JobKind::MultiLanguageContent,
            (targets.len() * 2) as i32,
            catalog.code.clone(),
            vec![product.sku.clone()],
            locale_codes.clone(),
            Some(product.id),
        );
        self.store.insert_workflow_job(&workflow).await?;
        self.store
            .begin_product_workflow(
                product.id,
                WorkflowAxis::Content,
                &request.initiator,
                &locale_codes,
            )
            .await?;

        for locale in targets {
            self.queue.enqueue(
                NewJob::new(
                    JobKind::MultiLanguageContent,
                    product.product_id,
                    "Product",
                    JobParams::MultiLanguageContent {
                        source_locale: request.source_locale.clone(),
                        target_locale: locale.code.clone(),
                    },
                    request.initiator.clone(),
                )
                .for_workflow(workflow.id, product.id),
            );
            self.queue.enqueue(
                NewJob::new(
                    JobKind::LocaleFinancials,
                    product.product_id,
                    "Product",
                    JobParams::LocaleFinancials {
                        catalog_id: product.catalog_id,
                        catalog_currency: catalog.currency.clone(),
                        locale,
                    },
                    request.initiator.clone(),
                )
                .for_workflow(workflow.id, product.id),
            );
        }

        tracing::info!(
            workflow_job_id = %workflow.id,
            catalog_product_id = %product.id,
            target_locales = locale_codes.len(),
            "content generation workflow started"
        );

        Ok(handle_for(&workflow))
    }
}

fn handle_for(workflow: &WorkflowJob) -> WorkflowHandle {
    WorkflowHandle {
        workflow_job_id: workflow.id,
        status: workflow.status,
        estimated_completion: Utc::now()
            + chrono::Duration::seconds(ESTIMATED_SECS_PER_ITEM * workflow.total_items as i64),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<garde::Report> for EngineError {
    fn from(report: garde::Report) -> Self {
        Self::Validation(report.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{AxisStatus, CatalogInfo, CatalogProduct, LocaleInfo};
    use crate::models::workflow::WorkflowStatus;
    use crate::store::MemoryStore;
    use uuid::Uuid;

    struct Seeded {
        store: Arc<MemoryStore>,
        queue: Arc<JobQueue>,
        orchestrator: WorkflowOrchestrator,
        catalog_product_id: Uuid,
        locale_ids: Vec<Uuid>,
    }

    fn seeded() -> Seeded {
        let store = Arc::new(MemoryStore::new());
        let catalog_id = Uuid::new_v4();
        store.seed_catalog(CatalogInfo {
            id: catalog_id,
            code: "US-MAIN".to_string(),
            currency: "USD".to_string(),
        });

        let mut locale_ids = Vec::new();
        for (code, currency, country) in [("de-DE", "EUR", "DE"), ("fr-FR", "EUR", "FR")] {
            let locale = LocaleInfo {
                id: Uuid::new_v4(),
                code: code.to_string(),
                currency: currency.to_string(),
                country: country.to_string(),
            };
            locale_ids.push(locale.id);
            store.seed_locale(locale);
        }

        let catalog_product_id = Uuid::new_v4();
        store.seed_catalog_product(CatalogProduct {
            id: catalog_product_id,
            catalog_id,
            product_id: Uuid::new_v4(),
            sku: "SKU-100".to_string(),
            locale_workflow_status: None,
            content_workflow_status: None,
            workflow_initiated_by: None,
            workflow_initiated_at: None,
            workflow_completed_at: None,
            selected_locales: vec![],
        });

        let queue = Arc::new(JobQueue::new());
        let orchestrator = WorkflowOrchestrator::new(queue.clone(), store.clone());
        Seeded {
            store,
            queue,
            orchestrator,
            catalog_product_id,
            locale_ids,
        }
    }

    #[tokio::test]
    async fn test_locale_financials_fans_out_one_job_per_locale() {
        let env = seeded();
        let handle = env
            .orchestrator
            .start_locale_financials(&LocaleFinancialsRequest {
                catalog_product_id: env.catalog_product_id,
                locale_ids: env.locale_ids.clone(),
                initiator: "admin@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(handle.status, WorkflowStatus::Running);
        assert_eq!(env.queue.depth(), 2);

        let jobs = env.queue.history(10);
        assert!(jobs
            .iter()
            .all(|j| j.workflow_job_id == Some(handle.workflow_job_id)));
        assert!(jobs
            .iter()
            .all(|j| j.catalog_product_id == Some(env.catalog_product_id)));

        let row = env
            .store
            .workflow_job(handle.workflow_job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.total_items, 2);
        assert_eq!(row.locale_codes, vec!["de-DE", "fr-FR"]);

        let product = env
            .store
            .catalog_product(env.catalog_product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            product.locale_workflow_status,
            Some(AxisStatus::InProgress)
        );
        assert_eq!(
            product.workflow_initiated_by.as_deref(),
            Some("admin@example.com")
        );
        assert_eq!(product.selected_locales, vec!["de-DE", "fr-FR"]);
    }

    #[tokio::test]
    async fn test_content_generation_enqueues_two_jobs_per_target() {
        let env = seeded();
        let handle = env
            .orchestrator
            .start_content_generation(&ContentGenerationRequest {
                catalog_product_id: env.catalog_product_id,
                source_locale: "en-US".to_string(),
                target_locales: vec!["de-DE".to_string(), "fr-FR".to_string()],
                initiator: "admin@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(env.queue.depth(), 4);
        let row = env
            .store
            .workflow_job(handle.workflow_job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.total_items, 4);

        let jobs = env.queue.history(10);
        let translations = jobs
            .iter()
            .filter(|j| j.kind == JobKind::MultiLanguageContent)
            .count();
        let pricings = jobs
            .iter()
            .filter(|j| j.kind == JobKind::LocaleFinancials)
            .count();
        assert_eq!(translations, 2);
        assert_eq!(pricings, 2);

        let product = env
            .store
            .catalog_product(env.catalog_product_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            product.content_workflow_status,
            Some(AxisStatus::InProgress)
        );
    }

    #[tokio::test]
    async fn test_unknown_product_fails_before_any_write() {
        let env = seeded();
        let result = env
            .orchestrator
            .start_locale_financials(&LocaleFinancialsRequest {
                catalog_product_id: Uuid::new_v4(),
                locale_ids: env.locale_ids.clone(),
                initiator: "admin@example.com".to_string(),
            })
            .await;

        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert_eq!(env.queue.depth(), 0);
        assert!(env.queue.history(10).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_locale_fails_before_any_write() {
        let env = seeded();
        let mut locale_ids = env.locale_ids.clone();
        locale_ids.push(Uuid::new_v4());

        let result = env
            .orchestrator
            .start_locale_financials(&LocaleFinancialsRequest {
                catalog_product_id: env.catalog_product_id,
                locale_ids,
                initiator: "admin@example.com".to_string(),
            })
            .await;

        assert!(matches!(result, Err(EngineError::NotFound(_))));
        assert_eq!(env.queue.depth(), 0);
        assert!(env
            .store
            .workflow_jobs_for_product(env.catalog_product_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_empty_locale_list_is_rejected() {
        let env = seeded();
        let result = env
            .orchestrator
            .start_locale_financials(&LocaleFinancialsRequest {
                catalog_product_id: env.catalog_product_id,
                locale_ids: vec![],
                initiator: "admin@example.com".to_string(),
            })
            .await;

        assert!(matches!(result, Err(EngineError::Validation(_))));
    }
}

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::job::{Job, JobKind, NewJob};
use crate::models::workflow::{
    ContentGenerationRequest, LocaleFinancialsRequest, WorkflowHandle, WorkflowProgress,
};
use crate::services::catalog_lookup::ProductCatalog;
use crate::services::localization::ContentLocalizer;
use crate::services::orchestrator::WorkflowOrchestrator;
use crate::services::pricing::FinancialCalculator;
use crate::services::queue::JobQueue;
use crate::services::rates::RateProvider;
use crate::services::tracker::WorkflowTracker;
use crate::services::translation::TranslationProvider;
use crate::services::worker::{StubHandler, Worker};
use crate::store::WorkflowStore;

pub use crate::services::orchestrator::EngineError;

/// Facade wiring the queue, worker, orchestrator, and tracker together.
/// One instance is shared by the request handlers and the worker process.
pub struct WorkflowEngine {
    queue: Arc<JobQueue>,
    orchestrator: WorkflowOrchestrator,
    tracker: Arc<WorkflowTracker>,
    worker: Arc<Worker>,
}

impl WorkflowEngine {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        products: Arc<dyn ProductCatalog>,
        rates: Arc<dyn RateProvider>,
        translator: Arc<dyn TranslationProvider>,
    ) -> Self {
        let queue = Arc::new(JobQueue::new());
        let tracker = Arc::new(WorkflowTracker::new(store.clone()));

        let calculator = Arc::new(FinancialCalculator::new(
            store.clone(),
            rates,
            products.clone(),
        ));
        let localizer = Arc::new(ContentLocalizer::new(store.clone(), products, translator));

        let mut worker = Worker::new(queue.clone(), tracker.clone());
        worker.register(JobKind::LocaleFinancials, calculator);
        worker.register(JobKind::MultiLanguageContent, localizer);
        worker.register(
            JobKind::CurrencyRefresh,
            Arc::new(StubHandler::new("exchange rates refreshed")),
        );
        worker.register(
            JobKind::ComplianceUpdate,
            Arc::new(StubHandler::new("compliance screening updated")),
        );
        // CatalogRecalculation has no handler yet; such jobs consume their
        // retries and fail.

        let orchestrator = WorkflowOrchestrator::new(queue.clone(), store);

        Self {
            queue,
            orchestrator,
            tracker,
            worker: Arc::new(worker),
        }
    }

    /// Spawn one consumer loop. Call repeatedly to scale consumption; the
    /// queue is safe for multiple consumers.
    pub fn spawn_worker(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(Arc::clone(&self.worker).run(shutdown))
    }

    /// Enqueue a single job outside of any workflow.
    pub fn enqueue(&self, job: NewJob) -> Uuid {
        self.queue.enqueue(job)
    }

    pub async fn start_locale_financials(
        &self,
        request: &LocaleFinancialsRequest,
    ) -> Result<WorkflowHandle, EngineError> {
        self.orchestrator.start_locale_financials(request).await
    }

    pub async fn start_content_generation(
        &self,
        request: &ContentGenerationRequest,
    ) -> Result<WorkflowHandle, EngineError> {
        self.orchestrator.start_content_generation(request).await
    }

    /// Jobs touching one target entity, newest first.
    pub fn jobs_by_entity(&self, target_id: Uuid, target_type: &str) -> Vec<Job> {
        self.queue.jobs_by_entity(target_id, target_type)
    }

    /// The most recent `limit` jobs across all statuses, newest first.
    pub fn history(&self, limit: usize) -> Vec<Job> {
        self.queue.history(limit)
    }

    pub async fn workflow_progress(
        &self,
        catalog_product_id: Uuid,
    ) -> Result<WorkflowProgress, EngineError> {
        self.tracker
            .workflow_progress(catalog_product_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("catalog product {catalog_product_id}")))
    }

    /// Close workflow rows stuck in "running" longer than the threshold.
    pub async fn force_complete_stale_workflows(
        &self,
        threshold_minutes: i64,
    ) -> Result<Vec<Uuid>, EngineError> {
        Ok(self
            .tracker
            .force_complete_stale(chrono::Duration::minutes(threshold_minutes))
            .await?)
    }

    /// Close one workflow row regardless of age.
    pub async fn force_complete_workflow(&self, workflow_id: Uuid) -> Result<(), EngineError> {
        if self.tracker.force_complete(workflow_id).await? {
            Ok(())
        } else {
            Err(EngineError::NotFound(format!(
                "workflow job {workflow_id}"
            )))
        }
    }

    /// Number of jobs waiting in the queue, for the depth gauge.
    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    /// Close the queue so worker loops drain out and exit.
    pub fn close_queue(&self) {
        self.queue.close()
    }
}

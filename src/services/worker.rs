use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::models::job::{Job, JobKind, JobStatus};
use crate::services::localization::LocalizationError;
use crate::services::pricing::PricingError;
use crate::services::queue::JobQueue;
use crate::services::tracker::WorkflowTracker;

/// Pause after a loop-level fault before resuming consumption.
const FAULT_PAUSE: Duration = Duration::from_secs(1);

/// Fixed delay for stub handlers standing in for future integrations.
const STUB_DELAY: Duration = Duration::from_millis(200);

/// One job behavior. Handlers are registered per [`JobKind`]; errors are
/// converted into the retry flow and never escape the worker loop.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<serde_json::Value, HandlerError>;
}

/// Queue consumer: dequeues jobs, dispatches by kind through the handler
/// registry, applies the bounded retry policy, and reports terminal outcomes
/// to the workflow tracker.
pub struct Worker {
    queue: Arc<JobQueue>,
    tracker: Arc<WorkflowTracker>,
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl Worker {
    pub fn new(queue: Arc<JobQueue>, tracker: Arc<WorkflowTracker>) -> Self {
        Self {
            queue,
            tracker,
            handlers: HashMap::new(),
        }
    }

    /// Register the handler for a job kind. A kind without a handler fails
    /// through the normal retry path like any other handler error.
    pub fn register(&mut self, kind: JobKind, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(kind, handler);
    }

    /// Consume jobs until the shutdown token fires or the queue is closed.
    /// Cancellation is cooperative: an in-flight job finishes before the
    /// loop checks the token again.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        tracing::info!("worker loop started");

        loop {
            let job = tokio::select! {
                _ = shutdown.cancelled() => break,
                dequeued = self.queue.dequeue() => match dequeued {
                    Some(job) => job,
                    None => break,
                },
            };

            let job_id = job.id;
            let worker = Arc::clone(&self);
            // Run each job in its own task so a panicking handler cannot
            // take the loop down.
            let outcome = tokio::spawn(async move { worker.process(job).await }).await;
            if let Err(e) = outcome {
                tracing::error!(job_id = %job_id, error = %e, "job processing aborted, pausing");
                sleep(FAULT_PAUSE).await;
            }
        }

        tracing::info!("worker loop stopped");
    }

    async fn process(&self, job: Job) {
        tracing::info!(
            job_id = %job.id,
            kind = %job.kind,
            target_id = %job.target_id,
            retry_count = job.retry_count,
            "processing job"
        );
        let started = Instant::now();

        let outcome = match self.handlers.get(&job.kind) {
            Some(handler) => handler.handle(&job).await,
            None => Err(HandlerError::UnregisteredKind(job.kind)),
        };
        histogram!("workflow_job_processing_seconds").record(started.elapsed().as_secs_f64());

        match outcome {
            Ok(result) => {
                self.queue
                    .update_status(job.id, JobStatus::Completed, Some(result), None);
                counter!("workflow_jobs_completed").increment(1);
                tracing::info!(job_id = %job.id, kind = %job.kind, "job completed");
                self.tracker.record_outcome(&job, None).await;
            }
            Err(e) => {
                let attempt = job.retry_count + 1;
                if attempt < job.max_retries {
                    // The failed attempt stays in history; a fresh entry at
                    // the tail carries the work forward.
                    self.queue.update_status(
                        job.id,
                        JobStatus::Failed,
                        None,
                        Some(format!(
                            "attempt {} of {} failed: {}; re-enqueued",
                            attempt, job.max_retries, e
                        )),
                    );
                    let retry_id = self.queue.enqueue(job.retry_entry());
                    counter!("workflow_jobs_retried").increment(1);
                    tracing::warn!(
                        job_id = %job.id,
                        retry_job_id = %retry_id,
                        attempt,
                        error = %e,
                        "job failed, re-enqueued for retry"
                    );
                } else {
                    let message = format!("failed after {} attempts: {}", attempt, e);
                    self.queue.update_status(
                        job.id,
                        JobStatus::Failed,
                        None,
                        Some(message.clone()),
                    );
                    counter!("workflow_jobs_failed").increment(1);
                    tracing::error!(
                        job_id = %job.id,
                        kind = %job.kind,
                        attempt,
                        error = %e,
                        "job failed, retries exhausted"
                    );
                    self.tracker.record_outcome(&job, Some(&message)).await;
                }
            }
        }
    }
}

/// Canned-result handler for job kinds whose real integrations have not
/// landed yet.
pub struct StubHandler {
    summary: &'static str,
}

impl StubHandler {
    pub fn new(summary: &'static str) -> Self {
        Self { summary }
    }
}

#[async_trait]
impl JobHandler for StubHandler {
    async fn handle(&self, job: &Job) -> Result<serde_json::Value, HandlerError> {
        sleep(STUB_DELAY).await;
        Ok(serde_json::json!({
            "summary": self.summary,
            "target_id": job.target_id,
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("no handler registered for job kind {0}")]
    UnregisteredKind(JobKind),

    #[error("job parameters do not match job kind: {0}")]
    BadParams(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Localization(#[from] LocalizationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{JobParams, NewJob, DEFAULT_MAX_RETRIES};
    use crate::models::workflow::{WorkflowJob, WorkflowStatus};
    use crate::store::{MemoryStore, WorkflowStore};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    struct AlwaysFails {
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl JobHandler for AlwaysFails {
        async fn handle(&self, _job: &Job) -> Result<serde_json::Value, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(HandlerError::BadParams("synthetic failure".to_string()))
        }
    }

    struct AlwaysSucceeds;

    #[async_trait]
    impl JobHandler for AlwaysSucceeds {
        async fn handle(&self, _job: &Job) -> Result<serde_json::Value, HandlerError> {
            Ok(serde_json::json!({ "ok": true }))
        }
    }

    fn refresh_job() -> NewJob {
        NewJob::new(
            JobKind::CurrencyRefresh,
            Uuid::new_v4(),
            "Product",
            JobParams::CurrencyRefresh { currencies: vec![] },
            "tests",
        )
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    fn spawn_worker(worker: Worker) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Arc::new(worker).run(shutdown.clone()));
        (shutdown, handle)
    }

    #[tokio::test]
    async fn test_failing_handler_is_retried_exactly_max_retries_times() {
        let queue = Arc::new(JobQueue::new());
        let store = Arc::new(MemoryStore::new());
        let tracker = Arc::new(WorkflowTracker::new(store));
        let calls = Arc::new(AtomicU32::new(0));

        let mut worker = Worker::new(queue.clone(), tracker);
        worker.register(
            JobKind::CurrencyRefresh,
            Arc::new(AlwaysFails {
                calls: calls.clone(),
            }),
        );
        let (shutdown, handle) = spawn_worker(worker);

        queue.enqueue(refresh_job());

        wait_until(|| {
            let history = queue.history(10);
            history.len() == DEFAULT_MAX_RETRIES as usize
                && history.iter().all(|j| j.status == JobStatus::Failed)
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_MAX_RETRIES);
        let last_attempt = &queue.history(1)[0];
        assert_eq!(last_attempt.retry_count, DEFAULT_MAX_RETRIES - 1);
        assert!(last_attempt
            .error
            .as_deref()
            .unwrap()
            .contains("failed after"));

        shutdown.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_unregistered_kind_fails_through_retry_path() {
        let queue = Arc::new(JobQueue::new());
        let store = Arc::new(MemoryStore::new());
        let tracker = Arc::new(WorkflowTracker::new(store));

        let worker = Worker::new(queue.clone(), tracker);
        let (shutdown, handle) = spawn_worker(worker);

        queue.enqueue(NewJob::new(
            JobKind::CatalogRecalculation,
            Uuid::new_v4(),
            "Catalog",
            JobParams::CatalogRecalculation {
                catalog_id: Uuid::new_v4(),
            },
            "tests",
        ));

        wait_until(|| {
            let history = queue.history(10);
            history.len() == DEFAULT_MAX_RETRIES as usize
                && history.iter().all(|j| j.status == JobStatus::Failed)
        })
        .await;

        shutdown.cancel();
        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_success_propagates_to_workflow_row() {
        let queue = Arc::new(JobQueue::new());
        let store = Arc::new(MemoryStore::new());
        let tracker = Arc::new(WorkflowTracker::new(store.clone()));

        let workflow = WorkflowJob::new(
            "refresh",
            JobKind::CurrencyRefresh,
            1,
            "EU",
            vec![],
            vec![],
            None,
        );
        store.insert_workflow_job(&workflow).await.unwrap();

        let mut worker = Worker::new(queue.clone(), tracker);
        worker.register(JobKind::CurrencyRefresh, Arc::new(AlwaysSucceeds));
        let (shutdown, handle) = spawn_worker(worker);

        let mut job = refresh_job();
        job.workflow_job_id = Some(workflow.id);
        let job_id = queue.enqueue(job);

        let mut row = store.workflow_job(workflow.id).await.unwrap().unwrap();
        for _ in 0..500 {
            if row.status != WorkflowStatus::Running {
                break;
            }
            sleep(Duration::from_millis(10)).await;
            row = store.workflow_job(workflow.id).await.unwrap().unwrap();
        }
        assert_eq!(row.status, WorkflowStatus::Completed);
        assert_eq!(row.completed_items, 1);

        let job = queue.job(job_id).unwrap();
        assert_eq!(job.result.unwrap()["ok"], true);

        shutdown.cancel();
        let _ = handle.await;
    }
}

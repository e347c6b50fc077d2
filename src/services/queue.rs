use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::models::job::{Job, JobStatus, NewJob};

/// In-process job queue: an id-indexed history map plus a FIFO of pending ids.
///
/// All mutation happens behind one mutex so producers and consumers never
/// observe a torn state. A counting semaphore hands out exactly one permit
/// per enqueued job, so `dequeue` wakes once per item with no lost wakeups
/// and no thundering herd if more consumers are added.
pub struct JobQueue {
    inner: Mutex<Inner>,
    ready: Semaphore,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, Job>,
    pending: VecDeque<Uuid>,
    insertion_order: Vec<Uuid>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            ready: Semaphore::new(0),
        }
    }

    /// Append a job to the tail of the queue. Always succeeds and returns the
    /// new job id immediately; no deduplication is performed.
    pub fn enqueue(&self, new: NewJob) -> Uuid {
        let job = Job {
            id: Uuid::new_v4(),
            kind: new.kind,
            target_id: new.target_id,
            target_type: new.target_type,
            params: new.params,
            status: JobStatus::Pending,
            retry_count: new.retry_count,
            max_retries: new.max_retries,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            created_by: new.created_by,
            workflow_job_id: new.workflow_job_id,
            catalog_product_id: new.catalog_product_id,
        };
        let id = job.id;

        {
            let mut inner = self.lock();
            inner.jobs.insert(id, job);
            inner.pending.push_back(id);
            inner.insertion_order.push(id);
        }
        self.ready.add_permits(1);

        id
    }

    /// Take the next pending job, blocking until one is available. The job is
    /// transitioned to Processing and stamped before it is handed out.
    /// Returns `None` once the queue has been closed.
    pub async fn dequeue(&self) -> Option<Job> {
        loop {
            let permit = self.ready.acquire().await.ok()?;
            permit.forget();

            // A permit can outlive its job's pending state (e.g. the job was
            // cancelled while still queued); skip and wait for the next one.
            if let Some(job) = self.take_next_pending() {
                return Some(job);
            }
        }
    }

    fn take_next_pending(&self) -> Option<Job> {
        let mut inner = self.lock();
        while let Some(id) = inner.pending.pop_front() {
            if let Some(job) = inner.jobs.get_mut(&id) {
                if job.status != JobStatus::Pending {
                    continue;
                }
                job.status = JobStatus::Processing;
                job.started_at = Some(Utc::now());
                return Some(job.clone());
            }
        }
        None
    }

    /// Record a status change for a job. Terminal statuses stamp
    /// `completed_at`; unknown ids and jobs already terminal are left alone.
    pub fn update_status(
        &self,
        id: Uuid,
        status: JobStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) {
        let mut inner = self.lock();
        let Some(job) = inner.jobs.get_mut(&id) else {
            return;
        };
        if job.status.is_terminal() {
            return;
        }

        job.status = status;
        if result.is_some() {
            job.result = result;
        }
        if error.is_some() {
            job.error = error;
        }
        if status.is_terminal() {
            job.completed_at = Some(Utc::now());
        }
    }

    /// Look up a single job by id.
    pub fn job(&self, id: Uuid) -> Option<Job> {
        self.lock().jobs.get(&id).cloned()
    }

    /// All retained jobs for one target entity, newest first.
    pub fn jobs_by_entity(&self, target_id: Uuid, target_type: &str) -> Vec<Job> {
        let inner = self.lock();
        inner
            .insertion_order
            .iter()
            .rev()
            .filter_map(|id| inner.jobs.get(id))
            .filter(|job| job.target_id == target_id && job.target_type == target_type)
            .cloned()
            .collect()
    }

    /// The most recent `limit` jobs across all statuses, newest first.
    pub fn history(&self, limit: usize) -> Vec<Job> {
        let inner = self.lock();
        inner
            .insertion_order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| inner.jobs.get(id))
            .cloned()
            .collect()
    }

    /// Number of jobs waiting to be dequeued.
    pub fn depth(&self) -> usize {
        self.lock().pending.len()
    }

    /// Close the queue: waiting and future `dequeue` calls return `None`.
    /// Already-pending jobs stay retained in history.
    pub fn close(&self) {
        self.ready.close();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("job queue mutex poisoned")
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

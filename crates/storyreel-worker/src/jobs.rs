//! Generation jobs and the per-item registry of current jobs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use storyreel_models::{ItemId, JobId, JobKind, JobStatus, PipelineEvent};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::metrics;
use crate::progress::ProgressChannel;

/// One user-triggered image or audio job.
#[derive(Debug)]
pub struct GenerationJob {
    id: JobId,
    item_id: ItemId,
    kind: JobKind,
    token: CancellationToken,
    status: watch::Sender<JobStatus>,
    progress: ProgressChannel,
}

impl GenerationJob {
    pub fn new(
        item_id: ItemId,
        kind: JobKind,
        token: CancellationToken,
        progress: ProgressChannel,
    ) -> Self {
        let (status, _) = watch::channel(JobStatus::Idle);
        Self {
            id: JobId::new(),
            item_id,
            kind,
            token,
            status,
            progress,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Move to `status` and publish the change.
    ///
    /// Terminal statuses are final; later transitions are ignored. The event
    /// is published before waiters on the status are released. Only the task
    /// running the job calls this.
    pub fn set_status(&self, status: JobStatus) {
        let current = *self.status.borrow();
        if current.is_terminal() || current == status {
            return;
        }

        debug!(job_id = %self.id, item_id = %self.item_id, kind = %self.kind, %status, "Job status changed");
        self.progress.publish(PipelineEvent::job_status(
            self.item_id.clone(),
            self.id.clone(),
            self.kind,
            status,
        ));
        self.status.send_replace(status);
        if status.is_terminal() {
            metrics::record_job(self.kind.as_str(), status.as_str());
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<JobStatus> {
        self.status.subscribe()
    }
}

/// Caller-side handle of a spawned job.
#[derive(Debug)]
pub struct JobHandle {
    job: Arc<GenerationJob>,
    status: watch::Receiver<JobStatus>,
}

impl JobHandle {
    pub fn new(job: Arc<GenerationJob>) -> Self {
        let status = job.subscribe_status();
        Self { job, status }
    }

    pub fn id(&self) -> &JobId {
        self.job.id()
    }

    pub fn job(&self) -> &Arc<GenerationJob> {
        &self.job
    }

    /// Cancel this job's token.
    pub fn cancel(&self) {
        self.job.cancel();
    }

    /// Wait for the job to reach a terminal status.
    pub async fn wait(mut self) -> JobStatus {
        let terminal = match self.status.wait_for(|s| s.is_terminal()).await {
            Ok(status) => Some(*status),
            Err(_) => None,
        };
        terminal.unwrap_or_else(|| *self.status.borrow())
    }
}

/// Current job per `(item, kind)`.
///
/// Registering a job replaces the previous entry without cancelling it; a
/// superseded job runs on until it finishes or its own token fires.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<(ItemId, JobKind), Arc<GenerationJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `job` current for its key. Returns the job it superseded.
    pub fn register(&self, job: Arc<GenerationJob>) -> Option<Arc<GenerationJob>> {
        let key = (job.item_id().clone(), job.kind());
        self.lock().insert(key, job)
    }

    pub fn current(&self, item_id: &ItemId, kind: JobKind) -> Option<Arc<GenerationJob>> {
        self.lock().get(&(item_id.clone(), kind)).cloned()
    }

    /// Cancel the current job for `(item_id, kind)`.
    pub fn cancel(&self, item_id: &ItemId, kind: JobKind) -> bool {
        match self.current(item_id, kind) {
            Some(job) if !job.status().is_terminal() => {
                job.cancel();
                true
            }
            _ => false,
        }
    }

    /// Forget every job, e.g. when a new search replaces the board.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(ItemId, JobKind), Arc<GenerationJob>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

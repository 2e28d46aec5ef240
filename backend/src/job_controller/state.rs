//! Tracks long-running background jobs, such as preview deployments.
//!
//! Deployments talk to remote services and can take minutes, so they run
//! outside the request/response cycle. The request returns a job id at once and
//! the client polls `/api/deploy/status/{job_id}`.
//!
//! - `JobsState`: clonable, thread-safe view of every job, shared with the
//!   Actix application as `web::Data`.
//! - `JobUpdate`: a status change sent by a background task.
//! - `start_job_updater`: the single task applying `JobUpdate`s to `JobsState`.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

#[derive(Clone)]
pub struct JobsState {
    /// Job id -> latest status. Reads come from the status endpoint; the only
    /// writers are job registration and the updater task.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Background tasks push their progress here instead of locking `jobs`.
    pub tx: mpsc::Sender<JobUpdate>,
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobsState {
    /// Builds an empty state and the receiver to hand to `start_job_updater`.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new job as `Pending` and returns its id.
    pub async fn register(&self) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), JobStatus::Pending);
        job_id
    }

    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Queues a status change; a closed channel only means the server is stopping.
    pub async fn report(&self, job_id: &str, status: JobStatus) {
        let _ = self
            .tx
            .send(JobUpdate {
                job_id: job_id.to_string(),
                status,
            })
            .await;
    }
}

/// Applies every `JobUpdate` received on `rx`.
///
/// `state` keeps a sender of its own, so the loop only ends when the task is
/// aborted or the runtime shuts down, which in practice is the life of the server.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}

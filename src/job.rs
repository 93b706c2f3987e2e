//! Job lifecycle tracking.
//!
//! Jobs are process-lifetime only: a restart loses them, by design. The
//! registry is an owned object handed to the API layer, not a process
//! global, so persistent storage can be swapped in later without touching
//! callers. A job transitions exactly once out of `processing`; the terminal
//! write happens under the store's entry lock, so readers never observe a
//! torn state.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analyzer::Analyzer;
use crate::events::{AnalysisEvent, EventBus};
use crate::types::AnalysisResult;

/// Lifecycle state of a job. `Processing` is the only non-terminal state.
#[derive(Debug, Clone)]
pub enum JobState {
    Processing,
    Completed(Arc<AnalysisResult>),
    Failed(String),
}

impl JobState {
    pub fn status(&self) -> &'static str {
        match self {
            JobState::Processing => "processing",
            JobState::Completed(_) => "completed",
            JobState::Failed(_) => "failed",
        }
    }
}

/// One tracked analysis job.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: Uuid,
    pub url_a: String,
    pub url_b: String,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub state: JobState,
}

/// Concurrent in-memory job registry.
#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, Job>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
        }
    }

    /// Register a new job in `processing` state and return its id.
    pub fn create(&self, url_a: &str, url_b: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.insert(
            id,
            Job {
                id,
                url_a: url_a.to_string(),
                url_b: url_b.to_string(),
                created_at: Utc::now(),
                finished_at: None,
                state: JobState::Processing,
            },
        );
        id
    }

    /// Write the `completed` terminal state. Returns false if the job is
    /// unknown or already terminal (the write is dropped).
    pub fn complete(&self, id: Uuid, result: AnalysisResult) -> bool {
        self.finish(id, JobState::Completed(Arc::new(result)))
    }

    /// Write the `failed` terminal state with the captured error message.
    pub fn fail(&self, id: Uuid, error: impl Into<String>) -> bool {
        self.finish(id, JobState::Failed(error.into()))
    }

    fn finish(&self, id: Uuid, terminal: JobState) -> bool {
        match self.jobs.get_mut(&id) {
            Some(mut job) => {
                if !matches!(job.state, JobState::Processing) {
                    warn!(
                        "job {id}: ignoring {} write, already {}",
                        terminal.status(),
                        job.state.status()
                    );
                    return false;
                }
                job.state = terminal;
                job.finished_at = Some(Utc::now());
                true
            }
            None => {
                warn!("job {id}: terminal write for unknown job");
                false
            }
        }
    }

    /// Clone the job's current state for a reader. `None` means the id is
    /// unknown — a distinct condition from `processing`.
    pub fn snapshot(&self, id: Uuid) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.clone())
    }

    /// Job counts by state: (processing, completed, failed).
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for job in self.jobs.iter() {
            match job.state {
                JobState::Processing => counts.0 += 1,
                JobState::Completed(_) => counts.1 += 1,
                JobState::Failed(_) => counts.2 += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

/// Drive one job to its terminal state. Spawned per submission; the job
/// runs to completion or failure, with no cancellation path.
pub async fn run(
    analyzer: Arc<Analyzer>,
    store: Arc<JobStore>,
    events: EventBus,
    id: Uuid,
    url_a: String,
    url_b: String,
) {
    let started = Instant::now();
    let job_tag = id.to_string();

    match analyzer.analyze(&job_tag, &url_a, &url_b).await {
        Ok(result) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            let matrix_entries = result.feature_matrix.len();
            info!(
                "job {id}: completed with {matrix_entries} matrix entries in {elapsed_ms}ms"
            );
            store.complete(id, result);
            events.emit(AnalysisEvent::JobCompleted {
                job_id: job_tag,
                matrix_entries,
                elapsed_ms,
            });
        }
        Err(e) => {
            let elapsed_ms = started.elapsed().as_millis() as u64;
            warn!("job {id}: failed: {e}");
            let message = e.to_string();
            store.fail(id, message.clone());
            events.emit(AnalysisEvent::JobFailed {
                job_id: job_tag,
                error: message,
                elapsed_ms,
            });
        }
    }
}

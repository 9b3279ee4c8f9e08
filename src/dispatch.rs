//! Deciding whether a verified delivery should start a benchmark, and
//! starting it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::DispatchMode;
use crate::error::{HookError, Result};
use crate::job::{Job, JobStore};
use crate::runner::{BenchmarkRunner, DispatchOutcome};
use crate::webhook::WebhookEvent;

/// Whether an event asks for a benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualification {
    /// Any action other than `completed`. Not an error.
    Skipped { action: Option<String> },
    Qualified { commit_sha: String },
}

/// `completed` events must name the head commit; anything else is skipped.
pub fn qualify(event: &WebhookEvent) -> Result<Qualification> {
    if !event.is_qualifying() {
        return Ok(Qualification::Skipped {
            action: event.action.clone(),
        });
    }
    match event.commit_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(Qualification::Qualified {
            commit_sha: id.to_string(),
        }),
        _ => Err(HookError::MalformedEvent(
            "completed event without check_suite.head_commit.id".to_string(),
        )),
    }
}

/// What the HTTP layer can report about a submitted event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Skipped { action: Option<String> },
    /// The run was handed to a background task.
    Started { job_id: String, commit_sha: String },
    /// The run finished within the inline bound.
    Finished {
        job_id: String,
        commit_sha: String,
        success: bool,
        summary: String,
    },
    /// The inline bound elapsed; the run carries on in the background.
    StillRunning { job_id: String, commit_sha: String },
}

/// Runs the benchmark for qualifying events and keeps a record of each run.
///
/// There is no deduplication: a commit delivered twice is benchmarked twice.
pub struct Dispatcher {
    runner: Arc<dyn BenchmarkRunner>,
    jobs: Mutex<JobStore>,
    /// Present when runs must not overlap.
    execution_lock: Option<Mutex<()>>,
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn BenchmarkRunner>, mode: DispatchMode, history: usize) -> Self {
        Self {
            runner,
            jobs: Mutex::new(JobStore::new(history)),
            execution_lock: None,
            mode,
        }
    }

    /// Serialize benchmark runs so they don't compete for the machine.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.execution_lock = exclusive.then(|| Mutex::new(()));
        self
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    pub async fn get_job(&self, id: &str) -> Option<Job> {
        self.jobs.lock().await.get_job(id).cloned()
    }

    pub async fn recent_jobs(&self, limit: usize) -> Vec<Job> {
        self.jobs.lock().await.get_recent_jobs(limit)
    }

    /// Qualifies `event` and starts the run according to the dispatch mode.
    /// The run itself happens on its own task and is never cancelled.
    pub async fn submit(
        self: &Arc<Self>,
        event: &WebhookEvent,
        delivery_id: Option<String>,
    ) -> Result<Submission> {
        let commit_sha = match qualify(event)? {
            Qualification::Skipped { action } => return Ok(Submission::Skipped { action }),
            Qualification::Qualified { commit_sha } => commit_sha,
        };

        let job_id = self.enqueue(&commit_sha, delivery_id).await;
        let task = tokio::spawn(Arc::clone(self).supervise(job_id.clone(), commit_sha.clone()));

        match self.mode {
            DispatchMode::Background => Ok(Submission::Started { job_id, commit_sha }),
            DispatchMode::Inline { timeout } => match tokio::time::timeout(timeout, task).await {
                Ok(Ok(Ok(outcome))) => Ok(Submission::Finished {
                    job_id,
                    commit_sha,
                    success: outcome.success(),
                    summary: outcome.summary(),
                }),
                Ok(Ok(Err(e))) => Err(e),
                Ok(Err(e)) => {
                    error!("Job {} supervisor ended abnormally: {}", job_id, e);
                    Err(HookError::Dispatch(format!("job {} task failed", job_id)))
                }
                Err(_) => {
                    warn!(
                        "Job {} still running after {:?}, responding without waiting",
                        job_id, timeout
                    );
                    Ok(Submission::StillRunning { job_id, commit_sha })
                }
            },
        }
    }

    async fn enqueue(&self, commit_sha: &str, delivery_id: Option<String>) -> String {
        let job = Job::new(commit_sha.to_string(), delivery_id);
        let job_id = job.id.clone();
        self.jobs.lock().await.add_job(job);
        info!("Created job {} for commit {}", job_id, commit_sha);
        job_id
    }

    /// Runs the job on its own task so a panicking runner still leaves a
    /// finished record behind.
    async fn supervise(
        self: Arc<Self>,
        job_id: String,
        commit_sha: String,
    ) -> Result<DispatchOutcome> {
        let run = {
            let dispatcher = Arc::clone(&self);
            let job_id = job_id.clone();
            tokio::spawn(async move { dispatcher.run_job(&job_id, &commit_sha).await })
        };

        match run.await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!("Job {} task ended abnormally: {}", job_id, e);
                let reason = format!("job task failed: {}", e);
                self.jobs
                    .lock()
                    .await
                    .update_job(&job_id, |job| job.mark_failed(None, reason));
                Err(HookError::Dispatch(format!("job {} task failed", job_id)))
            }
        }
    }

    async fn run_job(&self, job_id: &str, commit_sha: &str) -> DispatchOutcome {
        let _guard = match &self.execution_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        self.jobs.lock().await.update_job(job_id, Job::mark_running);
        info!("Job {} - starting benchmark for commit {}", job_id, commit_sha);

        let outcome = self.runner.run(commit_sha).await;
        outcome.log(commit_sha);

        let recorded = self.jobs.lock().await.update_job(job_id, |job| {
            if outcome.success() {
                job.mark_success(outcome.exit_code());
            } else {
                job.mark_failed(outcome.exit_code(), outcome.summary());
            }
        });
        if !recorded {
            warn!("Job {} was evicted from history before it finished", job_id);
        }
        outcome
    }
}

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents the status of a benchmark job
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

/// One benchmark run triggered by a delivery.
///
/// Output streams are logged, never stored here.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: String,
    pub commit_sha: String,
    pub delivery_id: Option<String>,
    pub status: JobStatus,
    pub queued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
}

impl Job {
    /// Create a new job in Queued status
    pub fn new(commit_sha: String, delivery_id: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            commit_sha,
            delivery_id,
            status: JobStatus::Queued,
            queued_at: Utc::now(),
            started_at: None,
            completed_at: None,
            exit_code: None,
            error: None,
        }
    }

    /// Mark job as running
    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_success(&mut self, exit_code: Option<i32>) {
        self.status = JobStatus::Success;
        self.completed_at = Some(Utc::now());
        self.exit_code = exit_code;
    }

    /// Mark job as failed with error
    pub fn mark_failed(&mut self, exit_code: Option<i32>, error: String) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.exit_code = exit_code;
        self.error = Some(error);
    }
}

/// Bounded in-memory history of jobs, oldest evicted first.
#[derive(Debug)]
pub struct JobStore {
    jobs: VecDeque<Job>,
    max_jobs: usize,
}

impl JobStore {
    pub fn new(max_jobs: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(max_jobs),
            max_jobs: max_jobs.max(1),
        }
    }

    pub fn add_job(&mut self, job: Job) {
        while self.jobs.len() >= self.max_jobs {
            self.jobs.pop_front();
        }
        self.jobs.push_back(job);
    }

    pub fn get_job(&self, id: &str) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id == id)
    }

    /// Applies `update` to the job with `id`; returns false if it was evicted.
    pub fn update_job(&mut self, id: &str, update: impl FnOnce(&mut Job)) -> bool {
        match self.jobs.iter_mut().find(|job| job.id == id) {
            Some(job) => {
                update(job);
                true
            }
            None => false,
        }
    }

    /// Most recent jobs first.
    pub fn get_recent_jobs(&self, limit: usize) -> Vec<Job> {
        self.jobs.iter().rev().take(limit).cloned().collect()
    }
}

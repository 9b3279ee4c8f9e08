//! Invocation of the external benchmark command.

use std::path::PathBuf;
use std::process::ExitStatus;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};

use crate::config::RunnerConfig;

/// What happened when the benchmark command was run. Observational only.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    /// Set when the process could not be started at all.
    pub spawn_error: Option<String>,
}

impl DispatchOutcome {
    pub fn spawn_failed(error: impl ToString) -> Self {
        Self {
            spawn_error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn success(&self) -> bool {
        self.spawn_error.is_none() && self.status.is_some_and(|s| s.success())
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Short description for job records and inline responses.
    pub fn summary(&self) -> String {
        match (&self.spawn_error, self.status) {
            (Some(e), _) => format!("failed to start: {}", e),
            (None, Some(status)) => status.to_string(),
            (None, None) => "no exit status".to_string(),
        }
    }

    /// Writes the captured streams and exit status to the log.
    pub fn log(&self, commit_sha: &str) {
        if let Some(e) = &self.spawn_error {
            error!("Benchmark for {} failed to start: {}", commit_sha, e);
            return;
        }
        info!("Benchmark for {} stdout:\n{}", commit_sha, self.stdout);
        info!("Benchmark for {} stderr:\n{}", commit_sha, self.stderr);
        if self.success() {
            info!("Benchmark for {} finished: {}", commit_sha, self.summary());
        } else {
            error!("Benchmark for {} failed: {}", commit_sha, self.summary());
        }
    }
}

/// Something that can run the benchmark for a commit.
#[async_trait]
pub trait BenchmarkRunner: Send + Sync {
    async fn run(&self, commit_sha: &str) -> DispatchOutcome;
}

/// Runs the configured executable directly, without a shell.
///
/// The argument vector is `[fixed args..., commit_sha]`; the hash is always a
/// single argv element so its content is never interpreted.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn from_config(config: &RunnerConfig) -> Self {
        let runner = Self::new(config.program.clone(), config.args.clone());
        match &config.working_dir {
            Some(dir) => runner.with_working_dir(dir),
            None => runner,
        }
    }

    fn command(&self, commit_sha: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(commit_sha);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl BenchmarkRunner for ProcessRunner {
    async fn run(&self, commit_sha: &str) -> DispatchOutcome {
        info!(
            "Running {:?} with args {:?} for commit {:?}",
            self.program, self.args, commit_sha
        );
        match self.command(commit_sha).output().await {
            Ok(output) => DispatchOutcome {
                status: Some(output.status),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                spawn_error: None,
            },
            Err(e) => DispatchOutcome::spawn_failed(e),
        }
    }
}

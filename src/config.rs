//! Startup configuration: the shared secret from the environment and the
//! static service settings from an optional TOML file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{HookError, Result};

pub const SECRET_ENV: &str = "SECRET";
pub const CONFIG_PATH_ENV: &str = "BENCH_HOOK_CONFIG";
pub const BIND_ADDRESS_ENV: &str = "BIND_ADDRESS";

pub const DEFAULT_CONFIG_PATH: &str = "bench_hook.toml";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:9247";
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
const DEFAULT_PROGRAM: &str = "./target/release/tremor-benchmark";
const DEFAULT_INLINE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_JOB_HISTORY: usize = 24;

/// The webhook secret shared with GitHub.
///
/// Loaded once before the listener starts and only ever read afterwards.
#[derive(Clone)]
pub struct WebhookSecret(Vec<u8>);

impl WebhookSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(HookError::Config("webhook secret is empty".to_string()));
        }
        Ok(Self(secret))
    }

    /// Reads the secret from `SECRET`.
    pub fn from_env() -> Result<Self> {
        let value = std::env::var(SECRET_ENV).map_err(|e| {
            HookError::Config(format!("{} must be set: {}", SECRET_ENV, e))
        })?;
        Self::new(value)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<redacted>)")
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HookConfig {
    pub server: ServerConfig,
    pub runner: RunnerConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
    pub jobs: JobsConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// The external benchmark command.
///
/// `args` are fixed leading arguments; the commit hash is always appended as
/// one more argument after them.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub exclusive: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            args: Vec::new(),
            working_dir: None,
            exclusive: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DispatchModeKind {
    #[default]
    Background,
    Inline,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatchConfig {
    pub mode: DispatchModeKind,
    pub inline_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchModeKind::Background,
            inline_timeout_secs: DEFAULT_INLINE_TIMEOUT_SECS,
        }
    }
}

/// When the acknowledgment is sent relative to the benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Respond first, run the job afterwards.
    Background,
    /// Wait for the job up to `timeout` before responding.
    Inline { timeout: Duration },
}

impl DispatchConfig {
    pub fn mode(&self) -> DispatchMode {
        match self.mode {
            DispatchModeKind::Background => DispatchMode::Background,
            DispatchModeKind::Inline => DispatchMode::Inline {
                timeout: Duration::from_secs(self.inline_timeout_secs),
            },
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JobsConfig {
    pub history: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            history: DEFAULT_JOB_HISTORY,
        }
    }
}

impl HookConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: HookConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse the configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            HookError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&contents).map_err(|e| {
            HookError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// The file the service should read, if any: an explicitly named file
    /// always, the default file only when it exists.
    pub fn path_from_env() -> Option<PathBuf> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
        }
    }

    /// Loads the config file named by the environment, falling back to
    /// built-in defaults, then applies `BIND_ADDRESS`.
    pub fn from_env() -> Result<Self> {
        let mut config = match Self::path_from_env() {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };

        if let Ok(bind_address) = std::env::var(BIND_ADDRESS_ENV) {
            config.server.bind_address = bind_address;
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.runner.program.as_os_str().is_empty() {
            return Err(HookError::Config("runner.program is empty".to_string()));
        }
        if self.server.max_body_bytes == 0 {
            return Err(HookError::Config(
                "server.max_body_bytes must be positive".to_string(),
            ));
        }
        if self.jobs.history == 0 {
            return Err(HookError::Config("jobs.history must be positive".to_string()));
        }
        Ok(())
    }
}

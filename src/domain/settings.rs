use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);
/// Largest model answer accepted from either backend; a prediction is a few dozen bytes.
pub const MAX_MODEL_OUTPUT_BYTES: usize = 1024 * 1024;

/// How to run the model script locally.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSettings {
    pub script_path: PathBuf,
    pub working_directory: PathBuf,
    pub virtual_env_path: Option<PathBuf>,
    pub use_virtual_env: bool,
    pub default_interpreter: String,
    pub deadline: Duration,
}

impl ProcessSettings {
    pub fn new(script_path: impl Into<PathBuf>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
            working_directory: working_directory.into(),
            virtual_env_path: None,
            use_virtual_env: false,
            default_interpreter: DEFAULT_INTERPRETER.to_string(),
            deadline: DEFAULT_DEADLINE,
        }
    }

    pub fn with_virtual_env(mut self, path: impl Into<PathBuf>, activate: bool) -> Self {
        self.virtual_env_path = Some(path.into());
        self.use_virtual_env = activate;
        self
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<String>) -> Self {
        self.default_interpreter = interpreter.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Where the prediction service lives.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub endpoint_url: String,
    pub health_url: Option<String>,
    pub timeout: Duration,
}

impl RemoteSettings {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            health_url: None,
            timeout: DEFAULT_DEADLINE,
        }
    }

    pub fn with_health_url(mut self, health_url: impl Into<String>) -> Self {
        self.health_url = Some(health_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Process(ProcessSettings),
    Remote(RemoteSettings),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Process(_) => "process",
            Backend::Remote(_) => "remote",
        }
    }
}

/// Everything the orchestrator needs, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationSettings {
    pub backend: Backend,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
}

impl ModerationSettings {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            retry_attempts: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }
}

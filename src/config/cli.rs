use crate::config::BackendKind;
use crate::core::ConfigProvider;
use crate::domain::settings::{
    Backend, ModerationSettings, ProcessSettings, RemoteSettings, DEFAULT_INTERPRETER,
};
use crate::utils::error::{ModerationError, Result};
use crate::utils::validation::{
    validate_path, validate_range, validate_url, Validate, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY_MS,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "review-moderation")]
#[command(about = "Moderate a review with an external classification model")]
pub struct CliConfig {
    #[arg(long, value_enum, default_value = "process")]
    pub backend: BackendKind,

    #[arg(long, default_value = "run_model.py")]
    pub script_path: String,

    #[arg(long, default_value = ".")]
    pub working_directory: String,

    #[arg(long, help = "Virtual-env interpreter, relative to the working directory")]
    pub venv_path: Option<String>,

    #[arg(long, help = "Prefer the virtual-env interpreter when it exists")]
    pub use_venv: bool,

    #[arg(long, default_value = DEFAULT_INTERPRETER)]
    pub interpreter: String,

    #[arg(long, help = "Prediction endpoint URL (remote backend)")]
    pub endpoint: Option<String>,

    #[arg(long)]
    pub health_endpoint: Option<String>,

    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    #[arg(long, default_value = "0")]
    pub retry_attempts: u32,

    #[arg(long, default_value = "500")]
    pub retry_delay_ms: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Review text; read from stdin when omitted
    pub text: Option<String>,
}

impl CliConfig {
    fn endpoint(&self) -> Result<&str> {
        self.endpoint
            .as_deref()
            .ok_or_else(|| ModerationError::MissingConfigError {
                field: "--endpoint".to_string(),
            })
    }
}

impl ConfigProvider for CliConfig {
    fn moderation_settings(&self) -> Result<ModerationSettings> {
        let timeout = Duration::from_secs(self.timeout_secs);

        let backend = match self.backend {
            BackendKind::Process => {
                let mut settings =
                    ProcessSettings::new(&self.script_path, &self.working_directory)
                        .with_interpreter(&self.interpreter)
                        .with_deadline(timeout);
                if let Some(venv) = &self.venv_path {
                    settings = settings.with_virtual_env(venv, self.use_venv);
                }
                Backend::Process(settings)
            }
            BackendKind::Remote => {
                let mut settings = RemoteSettings::new(self.endpoint()?).with_timeout(timeout);
                if let Some(health) = &self.health_endpoint {
                    settings = settings.with_health_url(health);
                }
                Backend::Remote(settings)
            }
        };

        Ok(ModerationSettings::new(backend).with_retries(
            self.retry_attempts,
            Duration::from_millis(self.retry_delay_ms),
        ))
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_range("--timeout-secs", self.timeout_secs, 1, 600)?;
        validate_range("--retry-attempts", self.retry_attempts, 0, MAX_RETRY_ATTEMPTS)?;
        validate_range("--retry-delay-ms", self.retry_delay_ms, 0, MAX_RETRY_DELAY_MS)?;

        match self.backend {
            BackendKind::Process => {
                validate_path("--script-path", &self.script_path)?;
                validate_path("--working-directory", &self.working_directory)?;
                if let Some(venv) = &self.venv_path {
                    validate_path("--venv-path", venv)?;
                }
            }
            BackendKind::Remote => {
                validate_url("--endpoint", self.endpoint()?)?;
                if let Some(health) = &self.health_endpoint {
                    validate_url("--health-endpoint", health)?;
                }
            }
        }

        Ok(())
    }
}

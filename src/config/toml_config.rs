use crate::config::BackendKind;
use crate::core::ConfigProvider;
use crate::domain::settings::{
    Backend, ModerationSettings, ProcessSettings, RemoteSettings, DEFAULT_DEADLINE,
    DEFAULT_RETRY_DELAY,
};
use crate::utils::error::{ModerationError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_required_field,
    validate_url, Validate, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY_MS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub service: Option<ServiceConfig>,
    pub model: ModelConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub backend: BackendKind,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub process: Option<ProcessConfig>,
    pub remote: Option<RemoteConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub script_path: String,
    pub working_directory: String,
    pub interpreter: Option<String>,
    pub virtual_env: Option<VirtualEnvConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualEnvConfig {
    pub path: String,
    pub activate: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub health_endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub format: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ModerationError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ModerationError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ModerationError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(timeout) = self.model.timeout_seconds {
            validate_range("model.timeout_seconds", timeout, 1, 600)?;
        }
        if let Some(attempts) = self.model.retry_attempts {
            validate_range("model.retry_attempts", attempts, 0, MAX_RETRY_ATTEMPTS)?;
        }
        if let Some(delay) = self.model.retry_delay_ms {
            validate_range("model.retry_delay_ms", delay, 0, MAX_RETRY_DELAY_MS)?;
        }

        match self.model.backend {
            BackendKind::Process => {
                let process = validate_required_field("model.process", &self.model.process)?;
                validate_path("model.process.script_path", &process.script_path)?;
                validate_path("model.process.working_directory", &process.working_directory)?;
                if let Some(interpreter) = &process.interpreter {
                    validate_non_empty_string("model.process.interpreter", interpreter)?;
                }
                if let Some(venv) = &process.virtual_env {
                    validate_path("model.process.virtual_env.path", &venv.path)?;
                }
            }
            BackendKind::Remote => {
                let remote = validate_required_field("model.remote", &self.model.remote)?;
                validate_url("model.remote.endpoint", &remote.endpoint)?;
                if let Some(health) = &remote.health_endpoint {
                    validate_url("model.remote.health_endpoint", health)?;
                }
            }
        }

        let valid_formats = ["compact", "json"];
        if let Some(format) = self.logging.as_ref().and_then(|l| l.format.as_ref()) {
            if !valid_formats.contains(&format.as_str()) {
                return Err(ModerationError::InvalidConfigValueError {
                    field: "logging.format".to_string(),
                    value: format.clone(),
                    reason: format!(
                        "Unsupported format. Valid formats: {}",
                        valid_formats.join(", ")
                    ),
                });
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        self.model
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_DEADLINE)
    }

    pub fn service_name(&self) -> &str {
        self.service
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or("review-moderation")
    }

    /// 是否輸出 JSON 格式日誌
    pub fn json_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.format.as_deref())
            .map(|f| f == "json")
            .unwrap_or(false)
    }

    pub fn verbose_logging(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .map(|level| matches!(level.to_ascii_lowercase().as_str(), "debug" | "trace"))
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn moderation_settings(&self) -> Result<ModerationSettings> {
        let backend = match self.model.backend {
            BackendKind::Process => {
                let process = validate_required_field("model.process", &self.model.process)?;
                let mut settings =
                    ProcessSettings::new(&process.script_path, &process.working_directory)
                        .with_deadline(self.timeout());
                if let Some(interpreter) = &process.interpreter {
                    settings = settings.with_interpreter(interpreter);
                }
                if let Some(venv) = &process.virtual_env {
                    settings =
                        settings.with_virtual_env(&venv.path, venv.activate.unwrap_or(false));
                }
                Backend::Process(settings)
            }
            BackendKind::Remote => {
                let remote = validate_required_field("model.remote", &self.model.remote)?;
                let mut settings =
                    RemoteSettings::new(&remote.endpoint).with_timeout(self.timeout());
                if let Some(health) = &remote.health_endpoint {
                    settings = settings.with_health_url(health);
                }
                Backend::Remote(settings)
            }
        };

        Ok(ModerationSettings::new(backend).with_retries(
            self.model.retry_attempts.unwrap_or(0),
            self.model
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_RETRY_DELAY),
        ))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_process_config() {
        let toml_content = r#"
[service]
name = "review-moderation"

[model]
backend = "process"
timeout_seconds = 10

[model.process]
script_path = "run_model.py"
working_directory = "/srv/model"

[model.process.virtual_env]
path = "python-env/bin/python3"
activate = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.service_name(), "review-moderation");

        let settings = config.moderation_settings().unwrap();
        assert_eq!(settings.retry_attempts, 0);
        assert_eq!(settings.retry_delay, DEFAULT_RETRY_DELAY);
        assert_eq!(
            settings.backend,
            Backend::Process(
                ProcessSettings::new("run_model.py", "/srv/model")
                    .with_virtual_env("python-env/bin/python3", true)
                    .with_deadline(Duration::from_secs(10))
            )
        );
    }

    #[test]
    fn test_parse_remote_config() {
        let toml_content = r#"
[model]
backend = "remote"
retry_attempts = 1
retry_delay_ms = 250

[model.remote]
endpoint = "http://localhost:8000/predict"
health_endpoint = "http://localhost:8000/health"

[logging]
level = "debug"
format = "json"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.json_logging());
        assert!(config.verbose_logging());
        assert_eq!(config.timeout(), DEFAULT_DEADLINE);

        let settings = config.moderation_settings().unwrap();
        assert_eq!(settings.retry_attempts, 1);
        assert_eq!(settings.retry_delay, Duration::from_millis(250));
        assert_eq!(settings.backend.name(), "remote");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_PREDICTION_URL", "https://models.example.com/predict");

        let toml_content = r#"
[model]
backend = "remote"

[model.remote]
endpoint = "${TEST_PREDICTION_URL}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.model.remote.as_ref().unwrap().endpoint,
            "https://models.example.com/predict"
        );

        std::env::remove_var("TEST_PREDICTION_URL");
    }

    #[test]
    fn test_missing_backend_section_fails_validation() {
        let toml_content = r#"
[model]
backend = "remote"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ModerationError::MissingConfigError { ref field } if field == "model.remote"));
    }

    #[test]
    fn test_unknown_backend_is_a_parse_error() {
        let toml_content = r#"
[model]
backend = "grpc"
"#;

        let err = TomlConfig::from_toml_str(toml_content).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let bad_endpoint = r#"
[model]
backend = "remote"

[model.remote]
endpoint = "invalid-url"
"#;
        let config = TomlConfig::from_toml_str(bad_endpoint).unwrap();
        assert!(config.validate().is_err());

        let bad_format = r#"
[model]
backend = "process"

[model.process]
script_path = "run_model.py"
working_directory = "."

[logging]
format = "xml"
"#;
        let config = TomlConfig::from_toml_str(bad_format).unwrap();
        assert!(config.validate().is_err());

        let bad_timeout = r#"
[model]
backend = "process"
timeout_seconds = 0

[model.process]
script_path = "run_model.py"
working_directory = "."
"#;
        let config = TomlConfig::from_toml_str(bad_timeout).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_out_of_range_fails_validation() {
        let too_many = r#"
[model]
backend = "process"
retry_attempts = 100

[model.process]
script_path = "run_model.py"
working_directory = "."
"#;
        let err = TomlConfig::from_toml_str(too_many)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("model.retry_attempts"));

        let too_slow = r#"
[model]
backend = "process"
retry_attempts = 2
retry_delay_ms = 60000

[model.process]
script_path = "run_model.py"
working_directory = "."
"#;
        let err = TomlConfig::from_toml_str(too_slow)
            .unwrap()
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("model.retry_delay_ms"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[service]
name = "file-test"

[model]
backend = "process"

[model.process]
script_path = "run_model.py"
working_directory = "."
interpreter = "python3.11"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.service_name(), "file-test");
        assert!(!config.json_logging());
    }
}

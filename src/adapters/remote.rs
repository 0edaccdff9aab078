use crate::domain::model::InvocationOutcome;
use crate::domain::ports::Invoker;
use crate::domain::settings::{RemoteSettings, MAX_MODEL_OUTPUT_BYTES};
use crate::utils::error::{ModerationError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

/// 呼叫遠端預測服務 `POST {"text": ...}`，每次只嘗試一次
#[derive(Debug, Clone)]
pub struct RemoteInvoker {
    client: Client,
    endpoint_url: String,
    health_url: Option<String>,
    timeout: Duration,
}

impl RemoteInvoker {
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        validate_url("model.remote.endpoint", &settings.endpoint_url)?;
        if let Some(health_url) = &settings.health_url {
            validate_url("model.remote.health_endpoint", health_url)?;
        }
        if settings.timeout.is_zero() {
            return Err(ModerationError::InvalidConfigValueError {
                field: "model.timeout_seconds".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            client: Client::new(),
            endpoint_url: settings.endpoint_url.clone(),
            health_url: settings.health_url.clone(),
            timeout: settings.timeout,
        })
    }
}

#[async_trait]
impl Invoker for RemoteInvoker {
    async fn invoke(&self, text: &str) -> InvocationOutcome {
        tracing::debug!("Making prediction request to: {}", self.endpoint_url);

        let response = match self
            .client
            .post(&self.endpoint_url)
            .json(&PredictRequest { text })
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return transport_outcome(e),
        };

        let status = response.status();
        tracing::debug!("Prediction response status: {}", status);

        let body = match read_body(response).await {
            Ok(body) => body,
            Err(outcome) => return outcome,
        };

        if !status.is_success() {
            tracing::debug!(
                "Prediction error body: {}",
                String::from_utf8_lossy(&body).trim()
            );
            return InvocationOutcome::TransportFailure {
                cause: format!("Prediction endpoint returned {}", status),
            };
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return InvocationOutcome::TransportFailure {
                cause: "Prediction endpoint returned an empty body".to_string(),
            };
        }

        InvocationOutcome::Success(body)
    }

    async fn check_ready(&self) -> Result<()> {
        let Some(health_url) = &self.health_url else {
            tracing::info!("No health endpoint configured, skipping readiness probe");
            return Ok(());
        };

        let health_failed = |message: String| ModerationError::ConfigError {
            message: format!("Prediction service health check failed: {}", message),
        };

        let response = self
            .client
            .get(health_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| health_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(health_failed(format!("{} returned {}", health_url, status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| health_failed(e.to_string()))?;

        // {"status": "UP"}; a non-JSON 2xx body is accepted as healthy
        if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(&body) {
            if let Some(reported) = fields.get("status").and_then(|s| s.as_str()) {
                if reported != "UP" {
                    return Err(health_failed(format!("service reports status {}", reported)));
                }
            }
        }

        tracing::info!("✅ Prediction service is up: {}", health_url);
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn describe(&self) -> String {
        format!("remote {}", self.endpoint_url)
    }
}

// 回應內容超過上限即放棄讀取
async fn read_body(mut response: Response) -> std::result::Result<Vec<u8>, InvocationOutcome> {
    let oversized = || InvocationOutcome::TransportFailure {
        cause: format!(
            "Prediction response exceeded {} bytes",
            MAX_MODEL_OUTPUT_BYTES
        ),
    };

    if response
        .content_length()
        .is_some_and(|length| length > MAX_MODEL_OUTPUT_BYTES as u64)
    {
        return Err(oversized());
    }

    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if body.len() + chunk.len() > MAX_MODEL_OUTPUT_BYTES {
                    return Err(oversized());
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => return Ok(body),
            Err(e) => return Err(transport_outcome(e)),
        }
    }
}

fn transport_outcome(error: reqwest::Error) -> InvocationOutcome {
    if error.is_timeout() {
        tracing::error!("Prediction request timed out: {}", error);
        InvocationOutcome::Timeout
    } else {
        tracing::error!("Prediction request failed: {}", error);
        InvocationOutcome::TransportFailure {
            cause: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_endpoint() {
        let err = RemoteInvoker::new(&RemoteSettings::new("localhost:8000/predict")).unwrap_err();
        assert!(err.is_configuration());

        let err = RemoteInvoker::new(&RemoteSettings::new("ftp://models.local/predict")).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_rejects_invalid_health_endpoint() {
        let settings =
            RemoteSettings::new("http://localhost:8000/predict").with_health_url("not a url");
        assert!(RemoteInvoker::new(&settings).unwrap_err().is_configuration());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let settings =
            RemoteSettings::new("http://localhost:8000/predict").with_timeout(Duration::ZERO);
        assert!(RemoteInvoker::new(&settings).is_err());
    }

    #[test]
    fn test_request_payload_has_single_text_field() {
        let json = serde_json::to_value(PredictRequest { text: "Отлично" }).unwrap();
        assert_eq!(json, serde_json::json!({"text": "Отлично"}));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_failure() {
        // port 9 (discard) is closed on any sane test machine
        let settings = RemoteSettings::new("http://127.0.0.1:9/predict")
            .with_timeout(Duration::from_secs(5));
        let invoker = RemoteInvoker::new(&settings).unwrap();

        let outcome = invoker.invoke("text").await;

        assert!(matches!(outcome, InvocationOutcome::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_ready_without_health_endpoint() {
        let invoker = RemoteInvoker::new(&RemoteSettings::new("http://127.0.0.1:9/predict")).unwrap();
        tokio_test::assert_ok!(invoker.check_ready().await);
    }
}

use crate::adapters::ConfiguredInvoker;
use crate::core::mapper::DecisionMapper;
use crate::core::parser::ResponseParser;
use crate::domain::model::{Decision, InvocationOutcome, Recommendation};
use crate::domain::ports::{ConfigProvider, Invoker};
use crate::domain::settings::ModerationSettings;
use crate::utils::error::{ModerationError, Result};
use std::time::Duration;

/// invoke → parse → map, with every failure collapsing into the fail-safe decision.
pub struct ModerationOrchestrator<I: Invoker> {
    invoker: I,
    parser: ResponseParser,
    mapper: DecisionMapper,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl ModerationOrchestrator<ConfiguredInvoker> {
    /// Builds the invoker chosen by configuration. Fails only on configuration errors.
    pub fn from_settings(settings: &ModerationSettings) -> Result<Self> {
        let invoker = ConfiguredInvoker::from_backend(&settings.backend)?;
        tracing::info!("🧠 Moderation backend: {}", invoker.describe());

        Ok(Self::new(invoker).with_retries(settings.retry_attempts, settings.retry_delay))
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::from_settings(&config.moderation_settings()?)
    }
}

impl<I: Invoker> ModerationOrchestrator<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            parser: ResponseParser::new(),
            mapper: DecisionMapper::new(),
            retry_attempts: 0,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_retries(mut self, attempts: u32, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub async fn check_ready(&self) -> Result<()> {
        self.invoker.check_ready().await
    }

    /// Never fails. Exactly one `Decision` per call.
    pub async fn moderate(&self, text: &str) -> Decision {
        tracing::debug!(
            "Starting review moderation for text length: {} characters",
            text.chars().count()
        );

        match self.try_moderate(text).await {
            Ok((recommendation, confidence)) => {
                let decision = Decision::new(text, recommendation, confidence);
                tracing::info!(
                    review_id = %decision.review_id,
                    "✅ Review moderated: {} ({:.3})",
                    recommendation,
                    confidence
                );
                decision
            }
            Err(e) => {
                let decision = Decision::fail_safe(text);
                tracing::warn!(
                    review_id = %decision.review_id,
                    "⚠️ Falling back to manual review: {} (Category: {:?})",
                    e,
                    e.category()
                );
                decision
            }
        }
    }

    async fn try_moderate(&self, text: &str) -> Result<(Recommendation, f64)> {
        let raw = self.invoke_with_retries(text).await?;
        tracing::debug!("Model raw response: {}", String::from_utf8_lossy(&raw).trim());

        let result = self.parser.parse(&raw)?;
        tracing::debug!(
            "Model result - label: {:?}, probability: {:?}",
            result.label,
            result.probability
        );

        if let Some(label) = result.label {
            if !self.mapper.is_known_label(label) {
                tracing::warn!("Unknown model class: {}", label);
            }
        }

        Ok(self.mapper.map(result.label, result.probability))
    }

    async fn invoke_with_retries(&self, text: &str) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            let outcome = self.invoker.invoke(text).await;
            match into_payload(outcome, self.invoker.timeout()) {
                Ok(raw) => return Ok(raw),
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(
                        "🔄 Retrying model invocation ({}/{}) after: {}",
                        attempt,
                        self.retry_attempts,
                        e
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn into_payload(outcome: InvocationOutcome, timeout: Duration) -> Result<Vec<u8>> {
    match outcome {
        InvocationOutcome::Success(raw) => Ok(raw),
        InvocationOutcome::Timeout => Err(ModerationError::ExecutionTimeout { timeout }),
        InvocationOutcome::ProcessFailure { exit_code, reason } => {
            Err(ModerationError::ProcessFailure { exit_code, reason })
        }
        InvocationOutcome::TransportFailure { cause } => {
            Err(ModerationError::TransportFailure { cause })
        }
    }
}

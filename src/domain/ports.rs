use crate::domain::model::InvocationOutcome;
use crate::domain::settings::ModerationSettings;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Obtains a raw classification from an out-of-process model.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// One attempt. Never returns an error: every failure is an outcome.
    async fn invoke(&self, text: &str) -> InvocationOutcome;

    /// Startup check that the model can be reached at all.
    async fn check_ready(&self) -> Result<()>;

    /// Upper bound of a single `invoke`.
    fn timeout(&self) -> Duration;

    fn describe(&self) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn moderation_settings(&self) -> Result<ModerationSettings>;
}

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{process::ProcessInvoker, remote::RemoteInvoker, ConfiguredInvoker};
pub use core::{
    mapper::DecisionMapper, orchestrator::ModerationOrchestrator, parser::ResponseParser,
};
pub use domain::model::{Decision, InvocationOutcome, ModelResult, Recommendation, ReviewText};
pub use domain::ports::{ConfigProvider, Invoker};
pub use domain::settings::{
    Backend, ModerationSettings, ProcessSettings, RemoteSettings, MAX_MODEL_OUTPUT_BYTES,
};
pub use utils::error::{ModerationError, Result};

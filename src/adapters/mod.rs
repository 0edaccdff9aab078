// Adapters layer: concrete invokers for the out-of-process model.

pub mod process;
pub mod remote;

use crate::domain::model::InvocationOutcome;
use crate::domain::ports::Invoker;
use crate::domain::settings::Backend;
use crate::utils::error::Result;
use async_trait::async_trait;
use process::ProcessInvoker;
use remote::RemoteInvoker;
use std::time::Duration;

/// The invoker picked by deployment configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredInvoker {
    Process(ProcessInvoker),
    Remote(RemoteInvoker),
}

impl ConfiguredInvoker {
    pub fn from_backend(backend: &Backend) -> Result<Self> {
        match backend {
            Backend::Process(settings) => Ok(Self::Process(ProcessInvoker::new(settings)?)),
            Backend::Remote(settings) => Ok(Self::Remote(RemoteInvoker::new(settings)?)),
        }
    }
}

#[async_trait]
impl Invoker for ConfiguredInvoker {
    async fn invoke(&self, text: &str) -> InvocationOutcome {
        match self {
            Self::Process(invoker) => invoker.invoke(text).await,
            Self::Remote(invoker) => invoker.invoke(text).await,
        }
    }

    async fn check_ready(&self) -> Result<()> {
        match self {
            Self::Process(invoker) => invoker.check_ready().await,
            Self::Remote(invoker) => invoker.check_ready().await,
        }
    }

    fn timeout(&self) -> Duration {
        match self {
            Self::Process(invoker) => invoker.timeout(),
            Self::Remote(invoker) => invoker.timeout(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Process(invoker) => invoker.describe(),
            Self::Remote(invoker) => invoker.describe(),
        }
    }
}

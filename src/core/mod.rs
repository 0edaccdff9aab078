pub mod mapper;
pub mod orchestrator;
pub mod parser;

pub use crate::domain::model::{Decision, InvocationOutcome, ModelResult, Recommendation};
pub use crate::domain::ports::{ConfigProvider, Invoker};
pub use crate::utils::error::Result;

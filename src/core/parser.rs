use crate::domain::model::ModelResult;
use crate::utils::error::{ModerationError, Result};
use serde_json::Value;

/// Tolerant decoder for the classifier's JSON answer.
///
/// Only a payload that is not JSON at all is an error. A valid document with
/// missing or oddly-typed fields yields a `ModelResult` with those fields absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, raw: &[u8]) -> Result<ModelResult> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| ModerationError::ParseFailure {
                message: e.to_string(),
            })?;

        let Value::Object(fields) = value else {
            tracing::debug!("Model response is valid JSON but not an object");
            return Ok(ModelResult::default());
        };

        Ok(ModelResult {
            label: fields.get("label").and_then(coerce_label),
            probability: fields.get("probability").and_then(Value::as_f64),
        })
    }
}

// Integers pass through, fractional numbers are truncated toward zero.
fn coerce_label(value: &Value) -> Option<i64> {
    let Value::Number(number) = value else {
        return None;
    };

    number
        .as_i64()
        .or_else(|| number.as_u64().and_then(|u| i64::try_from(u).ok()))
        .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
}

use crate::utils::error::Result;
use crate::utils::validation::validate_review_text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// A review accepted for moderation: non-blank, at most 5000 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewText(String);

impl ReviewText {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        validate_review_text(&text)?;
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ReviewText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Typed view of the classifier's answer. Either field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelResult {
    pub label: Option<i64>,
    pub probability: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Approve,
    Reject,
    ManualReview,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::Approve => write!(f, "APPROVE"),
            Recommendation::Reject => write!(f, "REJECT"),
            Recommendation::ManualReview => write!(f, "MANUAL_REVIEW"),
        }
    }
}

/// The moderation decision returned to the caller. Built once per call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub review_id: Uuid,
    pub original_text: String,
    pub recommendation: Recommendation,
    pub confidence_score: f64,
    #[serde(serialize_with = "serialize_processed_at")]
    pub processed_at: DateTime<Utc>,
}

impl Decision {
    pub fn new(original_text: &str, recommendation: Recommendation, confidence_score: f64) -> Self {
        Self {
            review_id: Uuid::new_v4(),
            original_text: original_text.to_string(),
            recommendation,
            confidence_score,
            processed_at: Utc::now(),
        }
    }

    /// MANUAL_REVIEW with zero confidence, used whenever the model gives no trustworthy answer.
    pub fn fail_safe(original_text: &str) -> Self {
        Self::new(original_text, Recommendation::ManualReview, 0.0)
    }

    pub fn is_fail_safe(&self) -> bool {
        self.recommendation == Recommendation::ManualReview && self.confidence_score == 0.0
    }
}

fn serialize_processed_at<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&value.format("%Y-%m-%dT%H:%M:%S%.3fZ"))
}

/// Result of one attempt to reach the model, before any parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationOutcome {
    Success(Vec<u8>),
    Timeout,
    ProcessFailure {
        exit_code: Option<i32>,
        reason: String,
    },
    TransportFailure {
        cause: String,
    },
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutcome::Success(_))
    }
}

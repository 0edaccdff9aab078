use crate::domain::model::Recommendation;

pub const LABEL_NEEDS_REVIEW: i64 = 0;
pub const LABEL_APPROVE: i64 = 1;
pub const LABEL_REJECT: i64 = 2;

/// Fixed label table. Never fails: anything unexpected becomes MANUAL_REVIEW.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionMapper;

impl DecisionMapper {
    pub fn new() -> Self {
        Self
    }

    pub fn map(&self, label: Option<i64>, probability: Option<f64>) -> (Recommendation, f64) {
        let recommendation = match label {
            Some(LABEL_APPROVE) => Recommendation::Approve,
            Some(LABEL_REJECT) => Recommendation::Reject,
            Some(LABEL_NEEDS_REVIEW) => Recommendation::ManualReview,
            Some(_) | None => Recommendation::ManualReview,
        };

        (recommendation, probability.unwrap_or(0.0))
    }

    pub fn is_known_label(&self, label: i64) -> bool {
        matches!(label, LABEL_NEEDS_REVIEW | LABEL_APPROVE | LABEL_REJECT)
    }
}

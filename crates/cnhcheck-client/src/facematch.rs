use cnhcheck_core::probability_to_percent;
use serde::{Deserialize, Serialize};

use crate::ProviderStatus;

/// Similarity (percent) at or above which two faces are the same person.
pub const FACE_MATCH_THRESHOLD: f64 = 70.0;

/// Face-compare result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceComparison {
    /// Provider similarity in `[0, 1]`; 0.0 when not reported.
    pub similarity: f64,
    pub request_id: Option<String>,
    pub provider_status: ProviderStatus,
}

impl FaceComparison {
    /// Similarity for display, rounded to two decimals.
    pub fn similarity_percent(&self) -> f64 {
        probability_to_percent(self.similarity)
    }

    /// Decided on the unrounded similarity.
    pub fn approved(&self) -> bool {
        self.similarity * 100.0 >= FACE_MATCH_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(similarity: f64) -> FaceComparison {
        FaceComparison {
            similarity,
            request_id: None,
            provider_status: ProviderStatus::default(),
        }
    }

    #[test]
    fn threshold_boundary() {
        assert!(comparison(0.70).approved());
        assert!(comparison(0.9512).approved());
        assert!(!comparison(0.6999).approved());
        assert!(!comparison(0.0).approved());
    }

    #[test]
    fn rounding_does_not_lift_score_over_threshold() {
        let cmp = comparison(0.699951);
        assert_eq!(cmp.similarity_percent(), 70.0);
        assert!(!cmp.approved());
    }

    #[test]
    fn percent_rounded_to_two_decimals() {
        assert_eq!(comparison(0.951234).similarity_percent(), 95.12);
    }
}

//! Step outcomes handed back to the host workflow.
//!
//! Every externally-facing step answers with a status discriminator and a
//! human-readable message instead of failing opaquely.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    /// Completed, but the result is not usable as-is (e.g. nothing extracted).
    Warning,
    Error,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome<T> {
    pub status: StepStatus,
    pub message: String,
    pub data: Option<T>,
}

impl<T> StepOutcome<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StepStatus::Success,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn warning(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status: StepStatus::Warning,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: StepStatus::Error,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == StepStatus::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let out = StepOutcome::<u32>::error("boom");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "boom");
        assert!(json["data"].is_null());
    }

    #[test]
    fn warning_may_carry_data() {
        let out = StepOutcome::warning("nothing extracted", Some(3));
        assert_eq!(out.status, StepStatus::Warning);
        assert_eq!(out.data, Some(3));
        assert!(!out.is_error());
    }

    #[test]
    fn success_roundtrip() {
        let out = StepOutcome::success("ok", vec!["a".to_string()]);
        let json = serde_json::to_string(&out).unwrap();
        let parsed: StepOutcome<Vec<String>> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.status, StepStatus::Success);
        assert_eq!(parsed.data.unwrap(), vec!["a"]);
    }
}

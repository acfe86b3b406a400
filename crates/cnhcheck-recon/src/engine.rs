//! Reconciliation engine.
//!
//! Compares the card-front record against the QR/VIO record field by field,
//! aggregates the agreement into a score, and combines it with the liveness
//! and face-match results into verdicts.
//!
//! # Scales
//!
//! All scores are percentages in `[0, 100]`. The liveness score arrives
//! already converted from the provider's probability; the face-match verdict
//! was decided by the face-compare step and is passed through untouched.

use cnhcheck_core::{ExtractedIdentityRecord, IdentityField, normalize_opt, round2};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::report::{self, Report};

/// Data agreement (percent) at or above which the document data is approved.
pub const DATA_APPROVAL_THRESHOLD: f64 = 75.0;

/// Liveness score (percent) at or above which liveness is approved.
pub const LIVENESS_APPROVAL_THRESHOLD: f64 = 80.0;

/// How two normalised values are judged equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Normalised values are identical.
    Exact,
    /// Identical, or one normalised value contains the other.
    ///
    /// Used for the RG only: one source often carries the issuing-agency
    /// suffix or a check digit that the other omits (`"12345"` vs
    /// `"1234567"`). Do not use for other fields.
    Containment,
}

/// The ten fields compared across sources, in report order.
pub const COMPARED_FIELDS: [(IdentityField, MatchPolicy); 10] = [
    (IdentityField::Name, MatchPolicy::Exact),
    (IdentityField::TaxId, MatchPolicy::Exact),
    (IdentityField::BirthDate, MatchPolicy::Exact),
    (IdentityField::GuardianName1, MatchPolicy::Exact),
    (IdentityField::GuardianName2, MatchPolicy::Exact),
    (IdentityField::NationalId, MatchPolicy::Containment),
    (IdentityField::RegistrationNumber, MatchPolicy::Exact),
    (IdentityField::IssueDate, MatchPolicy::Exact),
    (IdentityField::ExpiryDate, MatchPolicy::Exact),
    (IdentityField::LicenseCategory, MatchPolicy::Exact),
];

#[derive(Debug, Error, PartialEq)]
pub enum ReconcileError {
    #[error("{name} score must be a number in [0, 100], got {value}")]
    InvalidScore { name: &'static str, value: f64 },
}

/// Outcome of comparing one field across the two sources.
///
/// Only the engine builds these; `matched` is always derived from the values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldComparison {
    field_label: &'static str,
    value_a: Option<String>,
    value_b: Option<String>,
    matched: bool,
}

impl FieldComparison {
    fn compare(
        field: IdentityField,
        policy: MatchPolicy,
        a: Option<&str>,
        b: Option<&str>,
    ) -> Self {
        Self {
            field_label: field.label(),
            value_a: a.map(str::to_string),
            value_b: b.map(str::to_string),
            matched: values_match(policy, a, b),
        }
    }

    pub fn field_label(&self) -> &'static str {
        self.field_label
    }

    /// Value read from the card front, as extracted.
    pub fn value_a(&self) -> Option<&str> {
        self.value_a.as_deref()
    }

    /// Value read from the QR/VIO code, as extracted.
    pub fn value_b(&self) -> Option<&str> {
        self.value_b.as_deref()
    }

    pub fn matched(&self) -> bool {
        self.matched
    }
}

/// A value that is absent, or normalises to nothing, never matches. This
/// holds even when both sides are absent, so two empty records score 0.
fn values_match(policy: MatchPolicy, a: Option<&str>, b: Option<&str>) -> bool {
    let (a, b) = (normalize_opt(a), normalize_opt(b));
    if a.is_empty() || b.is_empty() {
        return false;
    }
    match policy {
        MatchPolicy::Exact => a == b,
        MatchPolicy::Containment => a == b || a.contains(&b) || b.contains(&a),
    }
}

/// Scores and approvals of one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub data_agreement_score: f64,
    pub data_approved: bool,
    pub liveness_score: f64,
    pub liveness_approved: bool,
    pub face_match_score: f64,
    pub face_match_approved: bool,
}

impl Verdict {
    /// All three checks passed.
    pub fn approved(&self) -> bool {
        self.data_approved && self.liveness_approved && self.face_match_approved
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationResult {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub comparisons: Vec<FieldComparison>,
    pub report: Report,
    pub summary_text: String,
}

/// Reconcile two extraction records with the liveness and face-match results.
///
/// `liveness_score` and `face_match_score` are percentages; anything outside
/// `[0, 100]` (or NaN) is rejected. `face_match_approved` is reported as given.
pub fn reconcile(
    front: &ExtractedIdentityRecord,
    qr: &ExtractedIdentityRecord,
    liveness_score: f64,
    face_match_score: f64,
    face_match_approved: bool,
) -> Result<ReconciliationResult, ReconcileError> {
    check_score("liveness", liveness_score)?;
    check_score("face match", face_match_score)?;

    let comparisons: Vec<FieldComparison> = COMPARED_FIELDS
        .iter()
        .map(|&(field, policy)| {
            FieldComparison::compare(field, policy, front.get(field), qr.get(field))
        })
        .collect();

    let matched = comparisons.iter().filter(|c| c.matched()).count();
    let data_agreement_score = agreement_score(matched, comparisons.len());

    let verdict = Verdict {
        data_agreement_score,
        data_approved: data_agreement_score >= DATA_APPROVAL_THRESHOLD,
        liveness_score,
        liveness_approved: liveness_score >= LIVENESS_APPROVAL_THRESHOLD,
        face_match_score,
        face_match_approved,
    };

    debug!(
        matched,
        compared = comparisons.len(),
        data_agreement_score,
        data_approved = verdict.data_approved,
        liveness_approved = verdict.liveness_approved,
        face_match_approved,
        "reconciled identity records"
    );

    let report = report::format(&verdict, &comparisons);
    let summary_text = report.to_string();
    Ok(ReconciliationResult {
        verdict,
        comparisons,
        report,
        summary_text,
    })
}

fn check_score(name: &'static str, value: f64) -> Result<(), ReconcileError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ReconcileError::InvalidScore { name, value })
    }
}

fn agreement_score(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(100.0 * matched as f64 / total as f64)
}

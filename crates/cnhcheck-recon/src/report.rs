//! Reconciliation report.
//!
//! Structured for JSON consumers, and rendered as text through `Display`:
//!
//! ```text
//! === CNH verification summary ===
//!
//! Document data (front vs QR code)
//!   [PASS] Name
//!          front: Maria Silva
//!          qr:    maria silva
//!   ...
//!   Agreement                  100.00% (approved)
//!
//! Face similarity
//!   Similarity                 88.12%
//!   Result                     approved
//!
//! Liveness
//!   Score                      95.00%
//!   Result                     approved
//! ```

use std::fmt;

use serde::Serialize;

use crate::engine::{FieldComparison, Verdict};

/// Shown in place of a value the provider did not return.
pub const MISSING: &str = "-";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub fields: Vec<FieldLine>,
    pub data_agreement: ScoreSection,
    pub face_match: ScoreSection,
    pub liveness: ScoreSection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldLine {
    pub label: String,
    pub front: String,
    pub qr: String,
    pub matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreSection {
    /// Percentage, two decimals.
    pub score: f64,
    pub approved: bool,
}

/// Build the report for a verdict and its field comparisons.
pub fn format(verdict: &Verdict, comparisons: &[FieldComparison]) -> Report {
    let fields = comparisons
        .iter()
        .map(|c| FieldLine {
            label: c.field_label().to_string(),
            front: c.value_a().unwrap_or(MISSING).to_string(),
            qr: c.value_b().unwrap_or(MISSING).to_string(),
            matched: c.matched(),
        })
        .collect();

    Report {
        fields,
        data_agreement: ScoreSection {
            score: verdict.data_agreement_score,
            approved: verdict.data_approved,
        },
        face_match: ScoreSection {
            score: verdict.face_match_score,
            approved: verdict.face_match_approved,
        },
        liveness: ScoreSection {
            score: verdict.liveness_score,
            approved: verdict.liveness_approved,
        },
    }
}

fn marker(ok: bool) -> &'static str {
    if ok { "[PASS]" } else { "[FAIL]" }
}

fn decision(ok: bool) -> &'static str {
    if ok { "approved" } else { "rejected" }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== CNH verification summary ===")?;
        writeln!(f)?;

        writeln!(f, "Document data (front vs QR code)")?;
        for line in &self.fields {
            writeln!(f, "  {} {}", marker(line.matched), line.label)?;
            writeln!(f, "         front: {}", line.front)?;
            writeln!(f, "         qr:    {}", line.qr)?;
        }
        writeln!(
            f,
            "  {:<26} {:.2}% ({})",
            "Agreement",
            self.data_agreement.score,
            decision(self.data_agreement.approved)
        )?;
        writeln!(f)?;

        writeln!(f, "Face similarity")?;
        writeln!(f, "  {:<26} {:.2}%", "Similarity", self.face_match.score)?;
        writeln!(f, "  {:<26} {}", "Result", decision(self.face_match.approved))?;
        writeln!(f)?;

        writeln!(f, "Liveness")?;
        writeln!(f, "  {:<26} {:.2}%", "Score", self.liveness.score)?;
        write!(f, "  {:<26} {}", "Result", decision(self.liveness.approved))
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::reconcile;
    use cnhcheck_core::{DocumentSource, ExtractedIdentityRecord};

    fn front() -> ExtractedIdentityRecord {
        let mut rec = ExtractedIdentityRecord::empty(DocumentSource::Front);
        rec.name = Some("Maria Silva".into());
        rec.tax_id = Some("111.222.333-44".into());
        rec
    }

    fn qr() -> ExtractedIdentityRecord {
        let mut rec = ExtractedIdentityRecord::empty(DocumentSource::Qr);
        rec.name = Some("maria silva".into());
        rec.tax_id = Some("999.999.999-99".into());
        rec
    }

    #[test]
    fn field_lines_carry_raw_values_and_markers() {
        let r = reconcile(&front(), &qr(), 95.0, 88.12, true).unwrap();
        let name = &r.report.fields[0];
        assert_eq!(name.front, "Maria Silva");
        assert_eq!(name.qr, "maria silva");
        assert!(name.matched);
        assert!(!r.report.fields[1].matched);

        let text = r.report.to_string();
        assert!(text.contains("[PASS] Name"), "{text}");
        assert!(text.contains("[FAIL] CPF"), "{text}");
        assert!(text.contains("front: 111.222.333-44"));
    }

    #[test]
    fn missing_values_render_placeholder() {
        let empty = ExtractedIdentityRecord::empty(DocumentSource::Front);
        let r = reconcile(&empty, &qr(), 0.0, 0.0, false).unwrap();
        assert_eq!(r.report.fields[0].front, "-");
        assert_eq!(r.report.fields[2].qr, "-");
        assert!(r.report.to_string().contains("front: -"));
    }

    #[test]
    fn sections_follow_their_own_verdicts() {
        let r = reconcile(&front(), &qr(), 79.99, 88.12, true).unwrap();
        assert!(r.report.face_match.approved);
        assert!(!r.report.liveness.approved);

        let text = r.report.to_string();
        let face = text.split("Face similarity").nth(1).unwrap();
        let (face, liveness) = face.split_once("Liveness").unwrap();
        assert!(face.contains("88.12%"));
        assert!(face.contains("approved"));
        assert!(liveness.contains("79.99%"));
        assert!(liveness.contains("rejected"));
    }

    #[test]
    fn agreement_line_rendered() {
        let r = reconcile(&front(), &qr(), 95.0, 88.0, true).unwrap();
        // Only the name matches: 1/10.
        assert!(r.summary_text.contains("10.00% (rejected)"), "{}", r.summary_text);
    }

    #[test]
    fn report_serializes_sections() {
        let r = reconcile(&front(), &qr(), 95.0, 88.0, false).unwrap();
        let json = serde_json::to_value(&r.report).unwrap();
        assert_eq!(json["fields"].as_array().unwrap().len(), 10);
        assert_eq!(json["face_match"]["approved"], false);
        assert_eq!(json["liveness"]["score"], 95.0);
    }
}

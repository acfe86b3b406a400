//! Plain-text rendering of step outcomes for terminal output.

use std::fmt::Write;

use cnhcheck_client::LivenessSession;
use cnhcheck_core::{IdentityField, StepOutcome};
use cnhcheck_recon::ReconciliationResult;

use crate::steps::{ExtractionOutput, FaceMatchOutput, LivenessStatusOutput};

/// Types that can print their step data as labelled rows.
pub trait Card {
    fn rows(&self, out: &mut String);
}

/// Status line, message, then the data rows if any.
pub fn render<T: Card>(outcome: &StepOutcome<T>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[{}] {}", outcome.status.as_str(), outcome.message);
    if let Some(data) = &outcome.data {
        let _ = writeln!(out);
        data.rows(&mut out);
    }
    out
}

fn row(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "  {:<26} {}", label, value);
}

fn opt(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}

impl Card for () {
    fn rows(&self, _out: &mut String) {}
}

impl Card for ExtractionOutput {
    fn rows(&self, out: &mut String) {
        let rec = &self.record;
        row(out, "Source", rec.source.as_str());
        for field in IdentityField::ALL {
            row(out, field.label(), opt(rec.get(field)));
        }
        match rec.confidence_score {
            Some(score) => row(out, "Confidence", format!("{score:.2}")),
            None => row(out, "Confidence", "-"),
        }
        row(out, "Quality", format!("{:?}", self.quality).to_lowercase());
        row(out, "Fields extracted", self.fields_extracted);

        if let Some(qr) = &rec.qr {
            row(out, "RENACH", opt(qr.renach_id.as_deref()));
            row(out, "State", opt(qr.state_code.as_deref()));
            row(out, "City", opt(qr.city_name.as_deref()));
            row(out, "Security code", opt(qr.security_code.as_deref()));
            if let Some(notes) = &qr.notes {
                row(out, "Notes", notes);
            }
        }
        if self.corrected_image.is_some() {
            row(out, "Corrected image", "available");
        }
    }
}

impl Card for LivenessSession {
    fn rows(&self, out: &mut String) {
        row(out, "Process ID", &self.process_id);
        row(out, "Session URL", &self.session_url);
    }
}

impl Card for LivenessStatusOutput {
    fn rows(&self, out: &mut String) {
        row(out, "Status", &self.status);
        row(out, "Liveness score", format!("{:.2}%", self.liveness_score));
        row(
            out,
            "Frontal image",
            if self.frontal_image_available {
                "available"
            } else {
                "-"
            },
        );
        row(out, "Request ID", opt(self.request_id.as_deref()));
        row(out, "Polled at", &self.polled_at);
    }
}

impl Card for FaceMatchOutput {
    fn rows(&self, out: &mut String) {
        row(out, "Similarity", format!("{:.2}%", self.similarity));
        row(
            out,
            "Result",
            if self.approved { "approved" } else { "rejected" },
        );
        row(out, "Request ID", opt(self.request_id.as_deref()));
    }
}

impl Card for ReconciliationResult {
    fn rows(&self, out: &mut String) {
        out.push_str(&self.summary_text);
        out.push('\n');
        let _ = writeln!(out);
        row(
            out,
            "Overall",
            if self.verdict.approved() {
                "approved"
            } else {
                "rejected"
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnhcheck_core::{
        DocumentSource, ExtractedIdentityRecord, ExtractionQuality, QrDetails,
    };

    fn extraction(source: DocumentSource) -> ExtractionOutput {
        let mut record = ExtractedIdentityRecord::empty(source);
        record.name = Some("MARIA SILVA".into());
        record.tax_id = Some("111.222.333-44".into());
        record.confidence_score = Some(0.91);
        ExtractionOutput {
            quality: record.quality(),
            fields_extracted: record.populated_field_count(),
            corrected_image: None,
            record,
        }
    }

    #[test]
    fn extraction_card_lists_every_field() {
        let text = render(&StepOutcome::success("ok", extraction(DocumentSource::Front)));
        assert!(text.starts_with("[success] ok\n"));
        assert!(text.contains("  Name                       MARIA SILVA\n"), "{text}");
        assert!(text.contains("  RG                         -\n"), "{text}");
        assert!(text.contains("Quality                    approved"));
        assert!(!text.contains("RENACH"));
    }

    #[test]
    fn qr_card_shows_document_extras() {
        let mut out = extraction(DocumentSource::Qr);
        out.record.qr = Some(QrDetails {
            renach_id: Some("SP123".into()),
            ..Default::default()
        });
        out.quality = ExtractionQuality::Rejected;
        let text = render(&StepOutcome::success("ok", out));
        assert!(text.contains("RENACH                     SP123"), "{text}");
        assert!(text.contains("State                      -"));
        assert!(text.contains("rejected"));
    }

    #[test]
    fn error_outcome_has_no_rows() {
        let text = render(&StepOutcome::<FaceMatchOutput>::error("face comparison failed"));
        assert_eq!(text, "[error] face comparison failed\n");
    }

    #[test]
    fn face_match_card() {
        let out = FaceMatchOutput {
            similarity: 71.5,
            approved: true,
            request_id: Some("r-1".into()),
            provider_code: None,
            provider_message: None,
        };
        let text = render(&StepOutcome::success("faces match", out));
        assert!(text.contains("71.50%"));
        assert!(text.contains("Result                     approved"));
    }
}

//! Mapping from raw extraction payloads to typed identity records.
//!
//! Both extraction endpoints (card front OCR and QR/VIO) answer with the same
//! envelope: a `result` list whose first element holds a `fields` list of
//! `{name, value}` pairs. One mapper serves both sources; the QR source
//! additionally picks up its own extras.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::record::{DocumentSource, ExtractedIdentityRecord, IdentityField, QrDetails};

/// Provider response from an extraction endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPayload {
    #[serde(default)]
    pub result: Option<Vec<RawResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// One document found in the submitted image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResult {
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub page_number: Option<u32>,
    /// Deskewed document image, base64.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawField {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl RawPayload {
    /// The first result element, if the provider found any document.
    pub fn first_result(&self) -> Option<&RawResult> {
        self.result.as_deref().and_then(|r| r.first())
    }

    /// Deskewed card image returned alongside the front extraction.
    pub fn corrected_image(&self) -> Option<&str> {
        self.first_result()
            .and_then(|r| r.image.as_deref())
            .filter(|s| !s.is_empty())
    }
}

const QR_RENACH: &str = "renach";
const QR_STATE: &str = "local_uf";
const QR_CITY: &str = "local_cidade";
const QR_SECURITY_CODE: &str = "codigo_seguranca";
const QR_NOTES: &str = "observacoes";

/// Build a typed record from a raw payload.
///
/// Never fails: an absent or empty result list yields an all-absent record,
/// and fields the provider left null or empty are simply not set.
pub fn build_record(payload: &RawPayload, source: DocumentSource) -> ExtractedIdentityRecord {
    let mut record = ExtractedIdentityRecord::empty(source);

    let Some(result) = payload.first_result() else {
        warn!(source = source.as_str(), "extraction payload has no results");
        return record;
    };

    let mut values = field_map(&result.fields);
    for field in IdentityField::ALL {
        record.set(field, values.remove(field.provider_key()));
    }
    record.confidence_score = result.score;

    if source == DocumentSource::Qr {
        record.qr = Some(QrDetails {
            renach_id: values.remove(QR_RENACH),
            state_code: values.remove(QR_STATE),
            city_name: values.remove(QR_CITY),
            security_code: values.remove(QR_SECURITY_CODE),
            notes: values.remove(QR_NOTES),
            page_number: result.page_number,
            tags: result.tags.clone().unwrap_or_default(),
        });
    }

    debug!(
        source = source.as_str(),
        fields_extracted = record.populated_field_count(),
        unmapped = values.len(),
        "built identity record"
    );
    record
}

/// Field name → value, skipping null and empty values. Later duplicates win.
fn field_map(fields: &[RawField]) -> HashMap<&str, String> {
    fields
        .iter()
        .filter_map(|f| value_text(f.value.as_ref()?).map(|v| (f.name.as_str(), v)))
        .collect()
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    if text.trim().is_empty() { None } else { Some(text) }
}

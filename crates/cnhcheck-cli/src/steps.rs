//! Workflow steps as seen by the host: each step runs one provider call (or
//! the offline reconciliation) and answers with a [`StepOutcome`].
//!
//! This is the only place where typed results are flattened into the loose
//! status/message shape the host workflow consumes.

use chrono::Utc;
use cnhcheck_client::{
    AccessToken, ClientError, IdentityClient, ImageInput, LivenessSession, LivenessUiConfig,
};
use cnhcheck_core::{
    DocumentSource, ExtractedIdentityRecord, ExtractionQuality, StepOutcome, build_record,
};
use cnhcheck_recon::{ReconciliationResult, reconcile};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct ExtractionOutput {
    pub record: ExtractedIdentityRecord,
    pub quality: ExtractionQuality,
    pub fields_extracted: usize,
    /// Deskewed card image returned by the front extraction, base64.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LivenessStatusOutput {
    pub status: String,
    /// Percent, 0–100.
    pub liveness_score: f64,
    pub request_id: Option<String>,
    pub provider_code: Option<String>,
    pub provider_message: Option<String>,
    pub frontal_image_available: bool,
    pub polled_at: String,
    #[serde(skip)]
    pub frontal_image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FaceMatchOutput {
    /// Percent, 0–100.
    pub similarity: f64,
    pub approved: bool,
    pub request_id: Option<String>,
    pub provider_code: Option<String>,
    pub provider_message: Option<String>,
}

/// Operator-facing description of a client failure.
pub fn describe(err: &ClientError) -> String {
    match err {
        ClientError::Http { status: 401, .. } => "access token invalid or expired".into(),
        ClientError::Http {
            status: 400, body, ..
        } => format!("provider rejected the image: {body}"),
        ClientError::TransportTimeout { endpoint, .. } => {
            format!("request to {endpoint} timed out")
        }
        other => other.to_string(),
    }
}

/// Authenticate, or produce the error outcome the step should answer with.
pub async fn authenticate<T>(
    client: &IdentityClient,
    client_key: &str,
) -> Result<AccessToken, StepOutcome<T>> {
    client.authenticate(client_key).await.map_err(|e| {
        warn!(error = %e, "authentication failed");
        StepOutcome::error(format!("could not obtain access token: {}", describe(&e)))
    })
}

pub async fn extract(
    client: &IdentityClient,
    token: &AccessToken,
    source: DocumentSource,
    image: ImageInput,
) -> StepOutcome<ExtractionOutput> {
    let payload = match source {
        DocumentSource::Front => client.extract_front(token, image).await,
        DocumentSource::Qr => client.extract_qr(token, image).await,
    };
    let payload = match payload {
        Ok(p) => p,
        Err(e) => return StepOutcome::error(describe(&e)),
    };

    let record = build_record(&payload, source);
    let output = ExtractionOutput {
        quality: record.quality(),
        fields_extracted: record.populated_field_count(),
        corrected_image: payload.corrected_image().map(str::to_string),
        record,
    };
    info!(
        source = source.as_str(),
        fields_extracted = output.fields_extracted,
        "extraction finished"
    );

    if output.record.is_empty() {
        return StepOutcome::warning(
            format!("no identity data extracted from the {} image", source.as_str()),
            Some(output),
        );
    }
    StepOutcome::success(
        format!("identity data extracted from the {} image", source.as_str()),
        output,
    )
}

pub async fn start_liveness(
    client: &IdentityClient,
    token: &AccessToken,
    webhook_url: &str,
    ui: &LivenessUiConfig,
) -> StepOutcome<LivenessSession> {
    match client.create_liveness_session(token, webhook_url, ui).await {
        Ok(session) => StepOutcome::success("liveness session created", session),
        Err(e) => StepOutcome::error(format!(
            "could not create liveness session: {}",
            describe(&e)
        )),
    }
}

pub async fn liveness_status(
    client: &IdentityClient,
    token: &AccessToken,
    process_id: &str,
) -> StepOutcome<LivenessStatusOutput> {
    let status = match client.poll_liveness_status(token, process_id).await {
        Ok(s) => s,
        Err(e) => {
            return StepOutcome::error(format!(
                "could not query liveness status: {}",
                describe(&e)
            ));
        }
    };

    let output = LivenessStatusOutput {
        liveness_score: status.score_percent(),
        request_id: status.request_id,
        provider_code: status.provider_status.code,
        provider_message: status.provider_status.message,
        frontal_image_available: status.frontal_image.is_some(),
        polled_at: Utc::now().to_rfc3339(),
        frontal_image: status.frontal_image,
        status: status.status,
    };
    let message = format!("liveness status: {}", output.status);
    StepOutcome::success(message, output)
}

pub async fn face_match(
    client: &IdentityClient,
    token: &AccessToken,
    face_a: ImageInput,
    face_b: ImageInput,
) -> StepOutcome<FaceMatchOutput> {
    match client.compare_faces(token, face_a, face_b).await {
        Ok(cmp) => {
            let output = FaceMatchOutput {
                similarity: cmp.similarity_percent(),
                approved: cmp.approved(),
                request_id: cmp.request_id,
                provider_code: cmp.provider_status.code,
                provider_message: cmp.provider_status.message,
            };
            let message = if output.approved {
                "faces match"
            } else {
                "faces do not match"
            };
            StepOutcome::success(message, output)
        }
        Err(e) => StepOutcome::error(format!("face comparison failed: {}", describe(&e))),
    }
}

/// Offline final step: reconcile previously extracted records.
pub fn final_validation(
    front: &ExtractedIdentityRecord,
    qr: &ExtractedIdentityRecord,
    liveness_score: f64,
    face_match_score: f64,
    face_match_approved: bool,
) -> StepOutcome<ReconciliationResult> {
    match reconcile(front, qr, liveness_score, face_match_score, face_match_approved) {
        Ok(result) if front.is_empty() || qr.is_empty() => StepOutcome::warning(
            "reconciled with an empty extraction record",
            Some(result),
        ),
        Ok(result) => {
            let message = if result.verdict.approved() {
                "identity verified"
            } else {
                "identity not verified"
            };
            StepOutcome::success(message, result)
        }
        Err(e) => StepOutcome::error(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cnhcheck_client::ClientConfig;
    use cnhcheck_core::StepStatus;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> IdentityClient {
        IdentityClient::new(ClientConfig::with_base_url(server.base_url())).unwrap()
    }

    fn image() -> ImageInput {
        ImageInput::Bytes(b"fake-jpeg".to_vec())
    }

    #[test]
    fn describe_friendly_messages() {
        let unauthorized = ClientError::Http {
            endpoint: "vio-extraction",
            status: 401,
            body: String::new(),
        };
        assert_eq!(describe(&unauthorized), "access token invalid or expired");

        let bad_image = ClientError::Http {
            endpoint: "content-extraction",
            status: 400,
            body: "blurry".into(),
        };
        assert_eq!(describe(&bad_image), "provider rejected the image: blurry");

        let timeout = ClientError::TransportTimeout {
            endpoint: "face-compare",
            timeout: std::time::Duration::from_secs(30),
        };
        assert_eq!(describe(&timeout), "request to face-compare timed out");
    }

    #[tokio::test]
    async fn empty_extraction_is_warning() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process-image/content-extraction");
                then.status(200).json_body(json!({ "result": [] }));
            })
            .await;

        let out = extract(
            &client_for(&server),
            &AccessToken::new("jwt"),
            DocumentSource::Front,
            image(),
        )
        .await;
        assert_eq!(out.status, StepStatus::Warning);
        assert!(out.data.unwrap().record.is_empty());
    }

    #[tokio::test]
    async fn extraction_success_reports_quality() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process-image/vio-extraction");
                then.status(200).json_body(json!({
                    "result": [{
                        "fields": [
                            { "name": "nome", "value": "maria silva" },
                            { "name": "cpf", "value": "11122233344" }
                        ],
                        "score": 0.95
                    }]
                }));
            })
            .await;

        let out = extract(
            &client_for(&server),
            &AccessToken::new("jwt"),
            DocumentSource::Qr,
            image(),
        )
        .await;
        assert_eq!(out.status, StepStatus::Success);
        let data = out.data.unwrap();
        assert_eq!(data.quality, ExtractionQuality::Approved);
        assert_eq!(data.fields_extracted, 3);
        assert!(data.record.qr.is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_error_outcome() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process-image/content-extraction");
                then.status(401).body("expired");
            })
            .await;

        let out = extract(
            &client_for(&server),
            &AccessToken::new("jwt"),
            DocumentSource::Front,
            image(),
        )
        .await;
        assert!(out.is_error());
        assert_eq!(out.message, "access token invalid or expired");
        assert!(out.data.is_none());
    }

    #[tokio::test]
    async fn failed_authentication_becomes_error_outcome() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/user/authenticate");
                then.status(403).body("forbidden");
            })
            .await;

        let out = authenticate::<()>(&client_for(&server), "bad-key")
            .await
            .unwrap_err();
        assert!(out.is_error());
        assert!(out.message.starts_with("could not obtain access token"));
    }

    #[tokio::test]
    async fn liveness_status_converts_to_percent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/liveness/streaming/async/status");
                then.status(200).json_body(json!({
                    "result": { "status": "FINISHED", "livenessScore": 0.87 },
                    "requestId": "req-1"
                }));
            })
            .await;

        let out = liveness_status(&client_for(&server), &AccessToken::new("jwt"), "proc-1").await;
        let data = out.data.unwrap();
        assert_eq!(data.liveness_score, 87.0);
        assert!(!data.frontal_image_available);
        assert_eq!(out.message, "liveness status: FINISHED");
    }

    #[tokio::test]
    async fn liveness_just_under_threshold_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/liveness/streaming/async/status");
                then.status(200).json_body(json!({
                    "result": { "status": "FINISHED", "livenessScore": 0.799951 }
                }));
            })
            .await;

        let out = liveness_status(&client_for(&server), &AccessToken::new("jwt"), "proc-1").await;
        let score = out.data.unwrap().liveness_score;
        assert!(score < 80.0);

        let mut front = ExtractedIdentityRecord::empty(DocumentSource::Front);
        front.name = Some("Maria Silva".into());
        let mut qr = ExtractedIdentityRecord::empty(DocumentSource::Qr);
        qr.name = Some("MARIA SILVA".into());
        let result = final_validation(&front, &qr, score, 90.0, true).data.unwrap();
        assert!(!result.verdict.liveness_approved);
    }

    #[tokio::test]
    async fn face_match_just_under_threshold_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process-image/biometrics/face-compare");
                then.status(200).json_body(json!({ "result": { "similarity": 0.699951 } }));
            })
            .await;

        let out =
            face_match(&client_for(&server), &AccessToken::new("jwt"), image(), image()).await;
        let data = out.data.unwrap();
        assert_eq!(data.similarity, 70.0);
        assert!(!data.approved);
    }

    #[tokio::test]
    async fn face_match_rejection_is_still_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/process-image/biometrics/face-compare");
                then.status(200).json_body(json!({ "result": { "similarity": 0.42 } }));
            })
            .await;

        let out =
            face_match(&client_for(&server), &AccessToken::new("jwt"), image(), image()).await;
        assert_eq!(out.status, StepStatus::Success);
        let data = out.data.unwrap();
        assert_eq!(data.similarity, 42.0);
        assert!(!data.approved);
        assert_eq!(out.message, "faces do not match");
    }

    #[test]
    fn final_validation_on_empty_records_warns() {
        let front = ExtractedIdentityRecord::empty(DocumentSource::Front);
        let qr = ExtractedIdentityRecord::empty(DocumentSource::Qr);
        let out = final_validation(&front, &qr, 90.0, 90.0, true);
        assert_eq!(out.status, StepStatus::Warning);
        assert_eq!(out.data.unwrap().verdict.data_agreement_score, 0.0);
    }

    #[test]
    fn final_validation_rejects_invalid_score() {
        let front = ExtractedIdentityRecord::empty(DocumentSource::Front);
        let qr = ExtractedIdentityRecord::empty(DocumentSource::Qr);
        let out = final_validation(&front, &qr, f64::NAN, 90.0, true);
        assert!(out.is_error());
        assert!(out.message.contains("liveness"));
    }
}

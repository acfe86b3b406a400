//! HTTP client for the identity provider.

use std::fmt;
use std::time::{Duration, Instant};

use cnhcheck_core::RawPayload;
use reqwest::RequestBuilder;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{Instrument, Span, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::facematch::FaceComparison;
use crate::image::ImageInput;
use crate::liveness::{
    LivenessSession, LivenessStatus, LivenessUiConfig, SessionRequest, StatusRequest, Webhook,
};

const AUTH: &str = "authenticate";
const FRONT: &str = "content-extraction";
const VIO: &str = "vio-extraction";
const LIVENESS_SESSION: &str = "liveness-session";
const LIVENESS_STATUS: &str = "liveness-status";
const FACE_COMPARE: &str = "face-compare";

/// Tags sent with the card-front upload to select the CNH extraction model.
const FRONT_TAGS: &[&str] = &["id=bra-cnh-3", "language=pt-BR", "type=documento-pessoal"];

/// Bearer token for one workflow run.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Provider status block (`{"code": ..., "message": ...}`) echoed on most responses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderStatus {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ProviderStatus {
    fn from_value(v: Option<&Value>) -> Self {
        let Some(v) = v else {
            return Self::default();
        };
        let code = v.get("code").and_then(|c| match c {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let message = v.get("message").and_then(Value::as_str).map(str::to_string);
        Self { code, message }
    }
}

/// Common response envelope: `{"result": ..., "requestId": ..., "status": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    status: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Client for the identity provider's REST API.
///
/// Holds no state between calls besides configuration; the bearer token is
/// owned by the caller for the duration of one workflow run. Requests are
/// never retried.
pub struct IdentityClient {
    client: reqwest::Client,
    config: ClientConfig,
    span: Span,
}

impl IdentityClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| ClientError::Transport {
                endpoint: "client",
                source,
            })?;
        Ok(Self {
            client,
            config,
            span: Span::none(),
        })
    }

    /// Attach the span every request of this client is recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Exchange the client key for a bearer token.
    pub async fn authenticate(&self, client_key: &str) -> Result<AccessToken, ClientError> {
        if client_key.trim().is_empty() {
            return Err(ClientError::Authentication("client key is empty".into()));
        }

        let req = self
            .client
            .post(self.config.url("/user/authenticate"))
            .json(&json!({ "token": client_key }));
        let body = match self.send(AUTH, req, self.config.auth_timeout).await {
            Ok(body) => body,
            Err(ClientError::Http { status, body, .. }) => {
                return Err(ClientError::Authentication(format!(
                    "provider returned {status}: {body}"
                )));
            }
            Err(e) => return Err(e),
        };

        let resp: AuthResponse = parse(AUTH, &body)?;
        match resp.token.filter(|t| !t.is_empty()) {
            Some(token) => {
                info!(parent: &self.span, "access token obtained");
                Ok(AccessToken(token))
            }
            None => Err(ClientError::Authentication(
                "token missing from response".into(),
            )),
        }
    }

    /// OCR extraction of the printed card front.
    pub async fn extract_front(
        &self,
        token: &AccessToken,
        image: ImageInput,
    ) -> Result<RawPayload, ClientError> {
        let bytes = image.into_bytes()?;
        let mut form = Form::new()
            .part("file", jpeg_part(FRONT, bytes, "cnh_image.jpg")?)
            .text("returnImage", "true")
            .text("returnCrops", "true");
        for tag in FRONT_TAGS {
            form = form.text("tags", *tag);
        }

        let req = self
            .client
            .post(self.config.url("/process-image/content-extraction"))
            .bearer_auth(token.as_str())
            .multipart(form);
        let body = self.send(FRONT, req, self.config.request_timeout).await?;
        parse(FRONT, &body)
    }

    /// Extraction of the QR/VIO code embedded in the document.
    pub async fn extract_qr(
        &self,
        token: &AccessToken,
        image: ImageInput,
    ) -> Result<RawPayload, ClientError> {
        let bytes = image.into_bytes()?;
        let form = Form::new().part("file", jpeg_part(VIO, bytes, "qr_image.jpg")?);

        let req = self
            .client
            .post(self.config.url("/process-image/vio-extraction"))
            .bearer_auth(token.as_str())
            .multipart(form);
        let body = self.send(VIO, req, self.config.request_timeout).await?;
        parse(VIO, &body)
    }

    /// Open a provider-hosted liveness session.
    pub async fn create_liveness_session(
        &self,
        token: &AccessToken,
        webhook_url: &str,
        ui: &LivenessUiConfig,
    ) -> Result<LivenessSession, ClientError> {
        let payload = SessionRequest {
            webhook: Webhook { url: webhook_url },
            ui_customization: ui,
            redirect_url: ui.redirect_url.as_deref(),
        };
        let req = self
            .client
            .post(self.config.url("/liveness/streaming/async"))
            .bearer_auth(token.as_str())
            .json(&payload);
        let body = self
            .send(LIVENESS_SESSION, req, self.config.request_timeout)
            .await?;

        let envelope: Envelope = parse(LIVENESS_SESSION, &body)?;
        let field = |name: &str| {
            envelope
                .result
                .get(name)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        match (field("sessionUrl"), field("processId")) {
            (Some(session_url), Some(process_id)) => {
                info!(parent: &self.span, process_id = %process_id, "liveness session created");
                Ok(LivenessSession {
                    session_url,
                    process_id,
                })
            }
            _ => Err(ClientError::MalformedResponse {
                endpoint: LIVENESS_SESSION,
                reason: "sessionUrl or processId missing".into(),
            }),
        }
    }

    /// Fetch the current state of a liveness session. One request, no waiting.
    pub async fn poll_liveness_status(
        &self,
        token: &AccessToken,
        process_id: &str,
    ) -> Result<LivenessStatus, ClientError> {
        let req = self
            .client
            .post(self.config.url("/liveness/streaming/async/status"))
            .bearer_auth(token.as_str())
            .json(&StatusRequest { process_id });
        let body = self
            .send(LIVENESS_STATUS, req, self.config.request_timeout)
            .await?;

        let envelope: Envelope = parse(LIVENESS_STATUS, &body)?;
        let status = LivenessStatus::from_result(
            &envelope.result,
            envelope.request_id,
            ProviderStatus::from_value(envelope.status.as_ref()),
        );
        info!(
            parent: &self.span,
            process_id,
            status = %status.status,
            liveness_score = status.liveness_score,
            "liveness status polled"
        );
        Ok(status)
    }

    /// Compare two face images.
    pub async fn compare_faces(
        &self,
        token: &AccessToken,
        image_a: ImageInput,
        image_b: ImageInput,
    ) -> Result<FaceComparison, ClientError> {
        let a = image_a.into_bytes()?;
        let b = image_b.into_bytes()?;
        let form = Form::new()
            .part("faceFileA", octet_part(FACE_COMPARE, a, "face_a.jpg")?)
            .part("faceFileB", octet_part(FACE_COMPARE, b, "face_b.jpg")?);

        let req = self
            .client
            .post(self.config.url("/process-image/biometrics/face-compare"))
            .bearer_auth(token.as_str())
            .multipart(form);
        let body = self
            .send(FACE_COMPARE, req, self.config.request_timeout)
            .await?;

        let envelope: Envelope = parse(FACE_COMPARE, &body)?;
        let similarity = envelope
            .result
            .get("similarity")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let comparison = FaceComparison {
            similarity,
            request_id: envelope.request_id,
            provider_status: ProviderStatus::from_value(envelope.status.as_ref()),
        };
        info!(
            parent: &self.span,
            similarity = comparison.similarity_percent(),
            approved = comparison.approved(),
            "faces compared"
        );
        Ok(comparison)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(
        &self,
        endpoint: &'static str,
        req: RequestBuilder,
        timeout: Duration,
    ) -> Result<String, ClientError> {
        async move {
            let started = Instant::now();
            let resp = req
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| transport_error(endpoint, timeout, e))?;
            let status = resp.status();
            let body = resp
                .text()
                .await
                .map_err(|e| transport_error(endpoint, timeout, e))?;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            if !status.is_success() {
                warn!(endpoint, status = status.as_u16(), elapsed_ms, "provider returned error");
                return Err(ClientError::Http {
                    endpoint,
                    status: status.as_u16(),
                    body,
                });
            }
            info!(endpoint, status = status.as_u16(), elapsed_ms, "provider call complete");
            Ok(body)
        }
        .instrument(self.span.clone())
        .await
    }
}

fn transport_error(endpoint: &'static str, timeout: Duration, e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        warn!(endpoint, timeout_secs = timeout.as_secs(), "provider call timed out");
        ClientError::TransportTimeout { endpoint, timeout }
    } else {
        ClientError::Transport {
            endpoint,
            source: e,
        }
    }
}

fn parse<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, ClientError> {
    serde_json::from_str(body).map_err(|e| ClientError::MalformedResponse {
        endpoint,
        reason: e.to_string(),
    })
}

fn jpeg_part(
    endpoint: &'static str,
    bytes: Vec<u8>,
    file_name: &'static str,
) -> Result<Part, ClientError> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/jpeg")
        .map_err(|source| ClientError::Transport { endpoint, source })
}

fn octet_part(
    endpoint: &'static str,
    bytes: Vec<u8>,
    file_name: &'static str,
) -> Result<Part, ClientError> {
    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("application/octet-stream")
        .map_err(|source| ClientError::Transport { endpoint, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_debug_is_redacted() {
        let token = AccessToken::new("secret-jwt");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
        assert_eq!(token.as_str(), "secret-jwt");
    }

    #[test]
    fn provider_status_accepts_numeric_code() {
        let v = json!({"code": 200, "message": "OK"});
        let s = ProviderStatus::from_value(Some(&v));
        assert_eq!(s.code.as_deref(), Some("200"));
        assert_eq!(s.message.as_deref(), Some("OK"));
        assert_eq!(ProviderStatus::from_value(None), ProviderStatus::default());
    }

    #[test]
    fn envelope_tolerates_missing_parts() {
        let env: Envelope = serde_json::from_str("{}").unwrap();
        assert!(env.result.is_null());
        assert!(env.request_id.is_none());
    }

    #[test]
    fn parse_reports_malformed_json() {
        let err = parse::<Envelope>(FACE_COMPARE, "<html>").unwrap_err();
        assert!(matches!(
            err,
            ClientError::MalformedResponse { endpoint: "face-compare", .. }
        ));
    }

    #[test]
    fn client_keeps_config() {
        let client = IdentityClient::new(ClientConfig::with_base_url("http://localhost:4000/"))
            .unwrap();
        assert_eq!(client.config().base_url, "http://localhost:4000/");
    }
}

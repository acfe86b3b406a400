//! Liveness session types.
//!
//! Liveness runs on the provider side: the client creates a session, the
//! user completes it out of band through `session_url`, and the workflow
//! polls `process_id` for the outcome.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProviderStatus;

/// Look and messages of the provider-hosted liveness page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessUiConfig {
    pub default_language: String,
    pub theme: String,
    pub primary_color: String,
    pub hide_topbar: bool,
    pub welcome_message: BTreeMap<String, String>,
    pub success_message: BTreeMap<String, String>,
    pub failure_message: BTreeMap<String, String>,
    /// Where the page sends the user once the session ends.
    #[serde(skip)]
    pub redirect_url: Option<String>,
}

fn messages(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(lang, text)| (lang.to_string(), text.to_string()))
        .collect()
}

impl Default for LivenessUiConfig {
    fn default() -> Self {
        Self {
            default_language: "pt-BR".into(),
            theme: "dark".into(),
            primary_color: "#820AD1".into(),
            hide_topbar: true,
            welcome_message: messages(&[
                ("pt-BR", "Vamos iniciar sua verificação de vivacidade."),
                ("en", "Let's begin your liveness verification."),
                ("es", "Vamos a comenzar tu verificación de vivacidad."),
                ("fr", "Commençons votre vérification de vivacité."),
            ]),
            success_message: messages(&[
                ("pt-BR", "Vivacidade confirmada com sucesso!"),
                ("en", "Liveness successfully confirmed!"),
                ("es", "¡Vivacidad confirmada con éxito!"),
                ("fr", "Vivacité confirmée avec succès !"),
            ]),
            failure_message: messages(&[
                (
                    "pt-BR",
                    "Não foi possível confirmar sua vivacidade. Tente novamente.",
                ),
                ("en", "We couldn't confirm your liveness. Please try again."),
                ("es", "No fue posible confirmar tu vivacidad. Intenta de nuevo."),
                ("fr", "Impossible de confirmer votre vivacité. Veuillez réessayer."),
            ]),
            redirect_url: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionRequest<'a> {
    pub webhook: Webhook<'a>,
    pub ui_customization: &'a LivenessUiConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<&'a str>,
}

#[derive(Serialize)]
pub(crate) struct Webhook<'a> {
    pub url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusRequest<'a> {
    pub process_id: &'a str,
}

/// A created liveness session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LivenessSession {
    pub session_url: String,
    pub process_id: String,
}

/// Poll result for a liveness session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessStatus {
    /// Provider session status, `"undefined"` when not reported.
    pub status: String,
    /// Provider liveness probability in `[0, 1]`; 0.0 when not reported.
    pub liveness_score: f64,
    /// Frontal face capture, base64.
    pub frontal_image: Option<String>,
    pub request_id: Option<String>,
    pub provider_status: ProviderStatus,
}

impl LivenessStatus {
    /// Liveness score on the 0–100 scale used by reconciliation. Unrounded,
    /// so the approval threshold sees the provider's actual value.
    pub fn score_percent(&self) -> f64 {
        self.liveness_score * 100.0
    }

    pub(crate) fn from_result(
        result: &Value,
        request_id: Option<String>,
        provider_status: ProviderStatus,
    ) -> Self {
        let status = result
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("undefined")
            .to_string();
        let frontal_image = result
            .get("frontalImage")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Self {
            status,
            liveness_score: find_liveness_score(result).unwrap_or(0.0),
            frontal_image,
            request_id,
            provider_status,
        }
    }
}

/// The score appears at the top of `result` or nested under `metrics` or
/// `results`, depending on provider version.
fn find_liveness_score(result: &Value) -> Option<f64> {
    [
        result.get("livenessScore"),
        result.pointer("/metrics/livenessScore"),
        result.pointer("/results/livenessScore"),
    ]
    .into_iter()
    .flatten()
    .find_map(number)
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Client configuration.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://mostqiapi.com";
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Provider base URL, without trailing slash.
    pub base_url: String,
    /// Timeout for the authentication call.
    pub auth_timeout: Duration,
    /// Timeout for extraction, liveness and face-compare calls.
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: concat!("cnhcheck/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Default configuration pointed at `base_url`.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_contract() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, "https://mostqiapi.com");
        assert_eq!(cfg.auth_timeout, Duration::from_secs(10));
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert!(cfg.user_agent.starts_with("cnhcheck/"));
    }

    #[test]
    fn url_joins_without_double_slash() {
        let cfg = ClientConfig::with_base_url("http://localhost:4000/");
        assert_eq!(cfg.url("/user/authenticate"), "http://localhost:4000/user/authenticate");
    }
}

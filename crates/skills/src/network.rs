//! HTTP plumbing shared by the provider adapters.

use std::time::Duration;

use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;

use answer_engine_core::config::AdapterConfig;
use answer_engine_core::AdapterError;

/// Longest error body kept in an `AdapterError::Http`.
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Connection settings of one provider.
#[derive(Clone)]
pub struct ProviderEndpoint {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<Secret<String>>,
    pub(crate) timeout: Duration,
}

impl ProviderEndpoint {
    /// Build an endpoint; an empty configured base url falls back to `default_base_url`.
    pub fn new(base_url: &str, default_base_url: &str, api_key: Option<Secret<String>>, timeout: Duration) -> Self {
        let base_url = if base_url.trim().is_empty() {
            default_base_url
        } else {
            base_url
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("answer-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        }
    }

    /// Build an endpoint from a provider config section.
    pub fn from_config(config: &AdapterConfig, default_base_url: &str, default_timeout_ms: u64) -> Self {
        Self::new(
            &config.base_url,
            default_base_url,
            config.api_key.clone(),
            Duration::from_millis(config.timeout_ms.unwrap_or(default_timeout_ms)),
        )
    }

    /// Absolute url for `path`.
    pub fn url(&self, path: &str) -> Result<url::Url, AdapterError> {
        url::Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| AdapterError::NotConfigured(format!("invalid base url {}: {}", self.base_url, e)))
    }

    /// The API key, or `NotConfigured` naming `provider`.
    pub fn require_key(&self, provider: &str) -> Result<&str, AdapterError> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| AdapterError::NotConfigured(format!("{} api key missing", provider)))
    }

    /// The API key if one is set.
    pub fn optional_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret().as_str())
            .filter(|k| !k.is_empty())
    }
}

/// Send a request and decode a JSON body.
pub async fn send_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, AdapterError> {
    let response = request
        .send()
        .await
        .map_err(|e| AdapterError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Http {
            status: status.as_u16(),
            body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AdapterError::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AdapterError::MalformedPayload(e.to_string()))
}

/// Whether `candidate` is an absolute http(s) url.
pub fn is_valid_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

/// Host of a url, used as a fallback title.
pub fn host_of(candidate: &str) -> Option<String> {
    url::Url::parse(candidate)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

/// First `max_chars` characters of `text`, with an ellipsis when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com/a?b=c"));
        assert!(is_valid_url("http://127.0.0.1:8080/"));
        assert!(!is_valid_url("ftp://example.com/file"));
        assert!(!is_valid_url("not a url"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_truncate_on_char_boundary() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo…");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("  padded  ", 10), "padded");
    }

    #[test]
    fn test_empty_base_url_uses_default() {
        let endpoint = ProviderEndpoint::new("", "https://api.example.com/", None, Duration::from_secs(1));
        assert_eq!(endpoint.base_url, "https://api.example.com");
        assert_eq!(endpoint.url("/search").unwrap().as_str(), "https://api.example.com/search");
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        let endpoint = ProviderEndpoint::new("http://localhost", "", Some(Secret::new(String::new())), Duration::from_secs(1));
        assert!(matches!(endpoint.require_key("exa"), Err(AdapterError::NotConfigured(_))));
        assert!(endpoint.optional_key().is_none());
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://www.nature.com/articles/x").as_deref(), Some("nature.com"));
        assert_eq!(host_of("nope"), None);
    }
}

//! Shared helpers for HTTP collaborators.

use felos_domain::config::AuthConfig;
use felos_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// A plaintext `key` wins (with a warning), then the named env var.
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key'; prefer 'env' instead"
        );
        return Ok(key.clone());
    }

    match std::env::var(&auth.env) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Auth(format!(
            "environment variable '{}' not set or empty",
            auth.env
        ))),
    }
}

/// Build a `(header name, header value)` pair for an API key.
pub fn auth_header(auth: &AuthConfig, key: &str) -> (String, String) {
    (auth.header.clone(), format!("{}{}", auth.prefix, key))
}

/// Build a reqwest client with the given per-request timeout.
pub fn http_client(timeout_ms: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(timeout_ms))
        .build()
        .map_err(from_reqwest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plaintext_key_wins() {
        let auth = AuthConfig {
            key: Some("sk-inline".into()),
            ..AuthConfig::bearer_from_env("FELOS_TEST_UNUSED_ENV_1")
        };
        assert_eq!(resolve_api_key(&auth).unwrap(), "sk-inline");
    }

    #[test]
    fn env_key_is_read() {
        let var = "FELOS_TEST_RESOLVE_ENV_KEY_4821";
        std::env::set_var(var, "env-secret");
        let auth = AuthConfig::bearer_from_env(var);
        assert_eq!(resolve_api_key(&auth).unwrap(), "env-secret");
        std::env::remove_var(var);
    }

    #[test]
    fn missing_env_names_the_variable() {
        let auth = AuthConfig::bearer_from_env("FELOS_TEST_NONEXISTENT_9931");
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("FELOS_TEST_NONEXISTENT_9931"));
    }

    #[test]
    fn bearer_header_shape() {
        let auth = AuthConfig::default();
        let (name, value) = auth_header(&auth, "abc");
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Bearer abc");
    }
}

//! API-key authentication for mutating endpoints.
//!
//! The key is compared in constant time; a missing header and a wrong key
//! are indistinguishable to the caller.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;

/// Header carrying the caller's credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Configured shared secret.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wraps the configured secret.
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    /// Whether `headers` carries the correct key, compared in constant time.
    #[must_use]
    pub fn authorizes(&self, headers: &HeaderMap) -> bool {
        let Some(presented) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) else {
            return false;
        };
        presented.as_bytes().ct_eq(self.0.as_bytes()).into()
    }
}

impl std::fmt::Debug for ApiKey {
    // Never log the secret.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(key: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_str(key).expect("value"));
        headers
    }

    #[test]
    fn accepts_matching_key() {
        let key = ApiKey::new("s3cret".to_string());
        assert!(key.authorizes(&headers_with("s3cret")));
    }

    #[test]
    fn rejects_wrong_missing_and_prefix_keys() {
        let key = ApiKey::new("s3cret".to_string());
        assert!(!key.authorizes(&HeaderMap::new()));
        assert!(!key.authorizes(&headers_with("wrong")));
        assert!(!key.authorizes(&headers_with("s3cre")));
        assert!(!key.authorizes(&headers_with("s3cret-and-more")));
    }

    #[test]
    fn debug_does_not_leak_the_secret() {
        let key = ApiKey::new("s3cret".to_string());
        assert_eq!(format!("{key:?}"), "ApiKey(..)");
    }
}

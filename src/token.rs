//! Credentials and access tokens.
//!
//! Client credentials are long-lived and supplied from configuration (admin
//! clients) or generated per scenario (test principals). Access tokens are
//! opaque bearer strings; their expiry is tracked only well enough to reuse a
//! token across consecutive scenarios.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Safety margin subtracted from a token's advertised lifetime.
const EXPIRY_SKEW_SECS: i64 = 30;

/// A string that must never appear in logs or debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret, for placing on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// OAuth client id and secret, scoped to one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredential {
    pub client_id: String,
    pub client_secret: Secret,
}

impl ClientCredential {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: Secret::new(client_secret),
        }
    }

    /// A fresh throwaway client (`test-client-<uuid>`, secret `<id>-password`).
    pub fn generate() -> Self {
        let client_id = format!("test-client-{}", uuid::Uuid::new_v4());
        let client_secret = format!("{client_id}-password");
        Self::new(client_id, client_secret)
    }
}

/// Successful token-endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,
}

/// Opaque bearer token with a best-effort expiry.
#[derive(Clone)]
pub struct AccessToken {
    value: Secret,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            value: Secret::new(value),
            expires_at,
        }
    }

    /// Build a token from a token-endpoint response received at `issued_at`.
    ///
    /// An `expires_in` that does not fit a timestamp leaves the expiry unknown.
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        let expires_at = response.expires_in.and_then(|secs| {
            let lifetime = ChronoDuration::try_seconds(secs.checked_sub(EXPIRY_SKEW_SECS)?)?;
            issued_at.checked_add_signed(lifetime)
        });
        Self::new(response.access_token, expires_at)
    }

    /// The bearer value for an `Authorization` header.
    pub fn bearer(&self) -> &str {
        self.value.expose()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token can still be reused at `now`.
    ///
    /// Tokens without an advertised lifetime are treated as usable; the
    /// identity service rejects them with an auth error if they are not.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &self.value)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

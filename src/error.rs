//! Error types for federation verification.
//!
//! Every step of the workflow reports failures through [`FederationError`]. The
//! variants follow the failure taxonomy of the workflow: credential problems,
//! transport problems, registry state mismatches, browser states that do not
//! match expectations, and attribute values that do not match the assertion.
//! Nothing in this crate retries; the first error aborts the current scenario.

use std::time::Duration;

/// Main error type for federation verification.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    /// Bad or expired credentials, or a rejected bearer token
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// Transport-level failure talking to the identity service
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A record with the same natural key already exists
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The addressed record does not exist (stale id, already deleted client)
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The identity service answered with a status the workflow does not expect
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The browser is not in the expected UI state
    #[error("Expectation failed at {context}: expected {expected:?}, got {actual:?}")]
    Expectation {
        context: String,
        expected: String,
        actual: String,
    },

    /// A bounded element wait elapsed before the element appeared
    #[error("Timed out after {waited:?} waiting for element {locator}")]
    ElementTimeout { locator: String, waited: Duration },

    /// The page was inspected and the element is not part of it
    #[error("Element {locator} is not present on the page")]
    ElementMissing { locator: String },

    /// A federated attribute does not carry the expected values
    #[error("Attribute '{attribute}' mismatch: expected {expected:?}, got {actual:?}")]
    Assertion {
        attribute: String,
        expected: Vec<String>,
        actual: Option<Vec<String>>,
    },

    /// The identity service returned state that violates a registry invariant
    #[error("Data integrity violation: {message}")]
    DataIntegrity { message: String },

    /// The target environment is not an allow-listed acceptance environment
    #[error("Refusing to run against {base_url}: not an acceptance environment")]
    EnvironmentRejected { base_url: String },

    /// Configuration is missing or malformed
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The browser driver itself failed (session lost, protocol error)
    #[error("Browser driver error: {message}")]
    Driver { message: String },

    /// A URL could not be built from configuration
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl FederationError {
    /// Create an authentication error.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a browser-driver error.
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Create a data-integrity error.
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity {
            message: message.into(),
        }
    }

    /// Create an expectation error naming where the mismatch was observed.
    pub fn expectation(
        context: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Expectation {
            context: context.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Whether the error came from the browser rather than the identity API.
    pub fn is_browser_failure(&self) -> bool {
        matches!(
            self,
            Self::Expectation { .. }
                | Self::ElementTimeout { .. }
                | Self::ElementMissing { .. }
                | Self::Driver { .. }
        )
    }
}

/// Result type for federation verification.
pub type FederationResult<T> = Result<T, FederationError>;

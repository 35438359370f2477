//! End-to-end verification of SAML federation for a multi-tenant identity service.
//!
//! Proves that the identity service federates logins to an external SAML
//! identity provider (ADFS) and maps the provider's attribute assertions onto
//! the federated user, in the system zone and in a secondary zone.
//!
//! # Core Components
//!
//! - [`ensure_identity_provider`] - idempotent create-or-update of an IdP registration
//! - [`LoginFlow`] - browser-driven SSO login with both IdP session branches
//! - [`verify_attributes`] - passcode exchange and user-attribute assertion
//! - [`ScenarioRunner`] - the two scenarios with guaranteed teardown
//! - [`IdpRegistry`] / [`TokenClient`] - what the workflow needs from the identity service
//! - [`Browser`] - what the workflow needs from a browser
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use federation_check::{AcceptanceConfig, IdentityClient, Scenario, ScenarioRunner};
//! use federation_check::browser::WebDriverBrowser;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AcceptanceConfig::load()?;
//! config.guard()?;
//! let metadata = config.read_metadata()?;
//! let api = IdentityClient::new(config.http_timeout)?;
//! let browser = WebDriverBrowser::connect(&config.webdriver_url, config.element_timeout).await?;
//!
//! let mut runner = ScenarioRunner::new(&api, &browser, &config, metadata)?;
//! let reports = runner.run_all(&Scenario::all()).await?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod browser;
pub mod client;
pub mod config;
pub mod error;
pub mod federation;
pub mod fixtures;
pub mod identity_provider;
pub mod login;
pub mod report;
pub mod scenario;
pub mod token;
pub mod zone;

// Re-export commonly used types for convenience
pub use attributes::{ExpectedAttributes, UserAttributes, UserInfo, check_attributes, verify_attributes};
pub use browser::{Browser, BrowserElement, Locator};
pub use client::{IdentityClient, IdpRegistry, TokenClient};
pub use config::AcceptanceConfig;
pub use error::{FederationError, FederationResult};
pub use federation::{UpsertAction, ensure_identity_provider};
pub use identity_provider::{IdentityProvider, SamlProviderDefinition};
pub use login::{IdpCredentials, LoginBranch, LoginFlow, drive_login_flow};
pub use report::{ScenarioReport, ScenarioStatus};
pub use scenario::{Scenario, ScenarioOutcome, ScenarioRunner, Teardown};
pub use token::{AccessToken, ClientCredential, Secret};
pub use zone::Zone;

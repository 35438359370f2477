//! Environment-backed configuration for acceptance runs.
//!
//! Values are read from environment-style variables with strict validation:
//! non-UTF-8 and empty values fail closed, numeric values must be positive.
//! [`AcceptanceConfig::from_lookup`] accepts any lookup function so callers
//! and tests can supply values without touching the process environment.
//!
//! # Example
//!
//! ```rust
//! use federation_check::config::AcceptanceConfig;
//!
//! let config = AcceptanceConfig::from_lookup(|name| match name {
//!     "BASE_URL" => Some("login.gcp.uaa-acceptance.cf-app.com".to_string()),
//!     _ => None,
//! })
//! .unwrap();
//!
//! assert_eq!(config.protocol, "https://");
//! assert_eq!(config.admin.client_id, "admin");
//! assert!(config.guard().is_ok());
//! ```

use crate::error::{FederationError, FederationResult};
use crate::login::IdpCredentials;
use crate::token::{ClientCredential, Secret};
use crate::zone::Zone;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

/// Default allow-listed acceptance host pattern.
pub const DEFAULT_ACCEPTANCE_PATTERN: &str = ".uaa-acceptance.cf-app.com";

/// Environment keys recognized by [`AcceptanceConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEnv {
    BaseUrl,
    Protocol,
    AdminClientId,
    AdminClientSecret,
    ZoneId,
    AcceptanceHostPatterns,
    MetadataPath,
    IdpUsername,
    IdpPassword,
    WebDriverUrl,
    ElementTimeoutSeconds,
    HttpTimeoutSeconds,
}

impl ConfigEnv {
    /// Returns the canonical environment variable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BaseUrl => "BASE_URL",
            Self::Protocol => "PROTOCOL",
            Self::AdminClientId => "ADMIN_CLIENT_ID",
            Self::AdminClientSecret => "ADMIN_CLIENT_SECRET",
            Self::ZoneId => "ZONE_ID",
            Self::AcceptanceHostPatterns => "ACCEPTANCE_HOST_PATTERNS",
            Self::MetadataPath => "ADFS_METADATA_PATH",
            Self::IdpUsername => "ADFS_USERNAME",
            Self::IdpPassword => "ADFS_PASSWORD",
            Self::WebDriverUrl => "WEBDRIVER_URL",
            Self::ElementTimeoutSeconds => "ELEMENT_TIMEOUT_SECS",
            Self::HttpTimeoutSeconds => "HTTP_TIMEOUT_SECS",
        }
    }
}

/// Typed configuration for one acceptance run.
#[derive(Debug, Clone)]
pub struct AcceptanceConfig {
    /// Root domain of the identity service, without scheme
    pub base_url: String,
    /// Scheme prefix, `https://` unless overridden
    pub protocol: String,
    /// System-zone admin client
    pub admin: ClientCredential,
    /// Subdomain of the secondary zone
    pub zone_id: String,
    /// The base URL must contain one of these to be considered safe
    pub acceptance_patterns: Vec<String>,
    /// File holding the IdP metadata document
    pub metadata_path: Option<PathBuf>,
    /// Federated user typed into the IdP sign-in form
    pub idp_credentials: IdpCredentials,
    pub webdriver_url: String,
    /// Bounded wait for every element lookup
    pub element_timeout: Duration,
    pub http_timeout: Duration,
}

impl AcceptanceConfig {
    /// Load configuration from the process environment.
    pub fn load() -> FederationResult<Self> {
        Self::from_os_lookup(|name| std::env::var_os(name))
    }

    /// Load configuration through a lookup returning raw OS strings.
    ///
    /// The first non-UTF-8 value fails the load with a `Config` error naming
    /// its variable.
    pub fn from_os_lookup<F>(mut lookup: F) -> FederationResult<Self>
    where
        F: FnMut(&str) -> Option<OsString>,
    {
        let mut invalid = None;
        let config = Self::from_lookup(|name| match lookup(name) {
            Some(raw) => match raw.into_string() {
                Ok(value) => Some(value),
                Err(_) => {
                    invalid.get_or_insert_with(|| name.to_string());
                    None
                }
            },
            None => None,
        });
        if let Some(name) = invalid {
            return Err(FederationError::config(format!("{name} must be valid UTF-8")));
        }
        config
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(mut lookup: F) -> FederationResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut read = |key: ConfigEnv| read_nonempty(key, lookup(key.as_str()));

        let base_url = read(ConfigEnv::BaseUrl)?.ok_or_else(|| {
            FederationError::config(format!("{} must be set", ConfigEnv::BaseUrl.as_str()))
        })?;
        let protocol = read(ConfigEnv::Protocol)?.unwrap_or_else(|| "https://".to_string());
        let admin_client_id =
            read(ConfigEnv::AdminClientId)?.unwrap_or_else(|| "admin".to_string());
        let admin_client_secret =
            read(ConfigEnv::AdminClientSecret)?.unwrap_or_else(|| "adminsecret".to_string());
        let zone_id = read(ConfigEnv::ZoneId)?.unwrap_or_else(|| "idats".to_string());
        let acceptance_patterns = read(ConfigEnv::AcceptanceHostPatterns)?
            .map(|raw| parse_patterns(&raw))
            .transpose()?
            .unwrap_or_else(|| vec![DEFAULT_ACCEPTANCE_PATTERN.to_string()]);
        let metadata_path = read(ConfigEnv::MetadataPath)?.map(PathBuf::from);
        let username = read(ConfigEnv::IdpUsername)?
            .unwrap_or_else(|| "techuser1@adfs.cf-app.com".to_string());
        let password = read(ConfigEnv::IdpPassword)?.unwrap_or_else(|| "Password01".to_string());
        let webdriver_url =
            read(ConfigEnv::WebDriverUrl)?.unwrap_or_else(|| "http://localhost:4444".to_string());
        let element_timeout = read(ConfigEnv::ElementTimeoutSeconds)?
            .map(|raw| parse_seconds(ConfigEnv::ElementTimeoutSeconds, &raw))
            .transpose()?
            .unwrap_or(Duration::from_secs(10));
        let http_timeout = read(ConfigEnv::HttpTimeoutSeconds)?
            .map(|raw| parse_seconds(ConfigEnv::HttpTimeoutSeconds, &raw))
            .transpose()?
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            protocol,
            admin: ClientCredential::new(admin_client_id, admin_client_secret),
            zone_id,
            acceptance_patterns,
            metadata_path,
            idp_credentials: IdpCredentials {
                username,
                password: Secret::new(password),
            },
            webdriver_url,
            element_timeout,
            http_timeout,
        })
    }

    /// The root base URL including the scheme.
    pub fn base_url_with_protocol(&self) -> String {
        format!("{}{}", self.protocol, self.base_url)
    }

    /// Refuse to run unless the target is an allow-listed acceptance environment.
    ///
    /// Must be called before any mutating call is issued.
    pub fn guard(&self) -> FederationResult<()> {
        let target = self.base_url_with_protocol();
        if self
            .acceptance_patterns
            .iter()
            .any(|pattern| target.contains(pattern.as_str()))
        {
            Ok(())
        } else {
            Err(FederationError::EnvironmentRejected { base_url: target })
        }
    }

    pub fn system_zone(&self) -> FederationResult<Zone> {
        Zone::system(&self.protocol, &self.base_url)
    }

    pub fn secondary_zone(&self) -> FederationResult<Zone> {
        Zone::named(self.zone_id.clone(), &self.protocol, &self.base_url)
    }

    /// Read the IdP metadata document from [`Self::metadata_path`].
    pub fn read_metadata(&self) -> FederationResult<String> {
        let path = self.metadata_path.as_ref().ok_or_else(|| {
            FederationError::config(format!("{} must be set", ConfigEnv::MetadataPath.as_str()))
        })?;
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FederationError::config(format!("cannot read metadata {}: {}", path.display(), e))
        })?;
        Ok(raw.trim_end().to_string())
    }
}

fn read_nonempty(key: ConfigEnv, raw: Option<String>) -> FederationResult<Option<String>> {
    match raw {
        Some(value) if value.trim().is_empty() => Err(FederationError::config(format!(
            "{} must not be empty",
            key.as_str()
        ))),
        other => Ok(other),
    }
}

fn parse_seconds(key: ConfigEnv, raw: &str) -> FederationResult<Duration> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        FederationError::config(format!(
            "{} must be a positive integer number of seconds",
            key.as_str()
        ))
    })?;
    if secs == 0 {
        return Err(FederationError::config(format!(
            "{} must be greater than zero",
            key.as_str()
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn parse_patterns(raw: &str) -> FederationResult<Vec<String>> {
    let patterns: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect();
    if patterns.is_empty() {
        return Err(FederationError::config(format!(
            "{} must name at least one pattern",
            ConfigEnv::AcceptanceHostPatterns.as_str()
        )));
    }
    Ok(patterns)
}

//! Identity zones (tenants) and their addressing.
//!
//! The identity service hosts several zones under one root domain. The system
//! zone answers on the root domain itself; every other zone is addressed by a
//! subdomain prefix (`https://{zone}.{root}`). Registry calls, token calls and
//! browser navigation are all scoped by the zone base URL.

use crate::error::FederationResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Identifier the identity service uses for its system zone.
pub const SYSTEM_ZONE_ID: &str = "uaa";

/// A tenant of the identity service together with its base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    id: String,
    base_url: String,
}

impl Zone {
    /// The system zone, addressed by the root domain without a prefix.
    pub fn system(protocol: &str, root_domain: &str) -> FederationResult<Self> {
        let base_url = format!("{}{}", protocol, trim_root(root_domain));
        Url::parse(&base_url)?;
        Ok(Self {
            id: SYSTEM_ZONE_ID.to_string(),
            base_url,
        })
    }

    /// A secondary zone addressed by its subdomain.
    pub fn named(id: impl Into<String>, protocol: &str, root_domain: &str) -> FederationResult<Self> {
        let id = id.into();
        let base_url = format!("{}{}.{}", protocol, id, trim_root(root_domain));
        Url::parse(&base_url)?;
        Ok(Self { id, base_url })
    }

    /// The zone identifier (`uaa` for the system zone).
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base URL including the scheme, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether this is the system zone.
    pub fn is_system(&self) -> bool {
        self.id == SYSTEM_ZONE_ID
    }

    /// Absolute URL for a path served by this zone.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Whether `location` is served by this zone rather than another host.
    ///
    /// A subdomain zone never owns URLs of its parent and vice versa, since the
    /// match requires the full base URL followed by a path boundary.
    pub fn owns(&self, location: &str) -> bool {
        match location.strip_prefix(self.base_url.as_str()) {
            Some(rest) => {
                rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('#')
            }
            None => false,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.base_url)
    }
}

fn trim_root(root_domain: &str) -> &str {
    root_domain.trim().trim_end_matches('/')
}

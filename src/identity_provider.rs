//! Identity-provider registration records.
//!
//! [`IdentityProvider`] mirrors the record the identity-provider management
//! API stores per zone. The `config` member depends on the provider type, so
//! it is kept as raw JSON on the record and decoded on demand; SAML
//! registrations decode into [`SamlProviderDefinition`].
//!
//! # Example
//!
//! ```rust
//! use federation_check::identity_provider::{IdentityProvider, SamlProviderDefinition};
//!
//! let definition = SamlProviderDefinition::new("<md:EntityDescriptor/>")
//!     .with_attribute_mapping(
//!         "user.attribute.email",
//!         "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
//!     )
//!     .with_link_text("ADFS SAML for IDaTS");
//!
//! let provider = IdentityProvider::saml("idats-adfs", "ADFS SAML for IDaTS", &definition).unwrap();
//! assert!(provider.is_saml());
//! assert!(provider.id.is_none());
//! assert_eq!(provider.saml_definition().unwrap(), definition);
//! ```

use crate::error::{FederationError, FederationResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Provider type string for SAML registrations.
pub const SAML_PROVIDER_TYPE: &str = "saml";

/// SAML name-id format used when the IdP decides the subject format.
pub const NAME_ID_UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified";

/// An identity-provider record scoped to one zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProvider {
    /// Server-assigned id; absent until the record is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Natural key, unique within a zone
    pub origin_key: String,
    /// Display name
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_zone_id: Option<String>,
    /// Type-specific definition, as stored by the server
    #[serde(default)]
    pub config: Value,
}

impl IdentityProvider {
    /// Build an active SAML registration that has not been persisted yet.
    pub fn saml(
        origin_key: impl Into<String>,
        name: impl Into<String>,
        definition: &SamlProviderDefinition,
    ) -> FederationResult<Self> {
        Ok(Self {
            id: None,
            origin_key: origin_key.into(),
            name: name.into(),
            provider_type: SAML_PROVIDER_TYPE.to_string(),
            active: true,
            identity_zone_id: None,
            config: serde_json::to_value(definition)?,
        })
    }

    pub fn is_saml(&self) -> bool {
        self.provider_type == SAML_PROVIDER_TYPE
    }

    /// Decode the SAML definition from `config`.
    ///
    /// Servers that were not asked for the raw configuration return `config`
    /// as an embedded JSON string; both shapes are accepted.
    pub fn saml_definition(&self) -> FederationResult<SamlProviderDefinition> {
        if !self.is_saml() {
            return Err(FederationError::data_integrity(format!(
                "identity provider '{}' is of type '{}', not '{}'",
                self.origin_key, self.provider_type, SAML_PROVIDER_TYPE
            )));
        }
        match &self.config {
            Value::String(raw) => Ok(serde_json::from_str(raw)?),
            other => Ok(serde_json::from_value(other.clone())?),
        }
    }

    /// Copy of this record carrying `id`, as sent on update.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id:{} name:{} type:{} origin:{} active:{}",
            self.id.as_deref().unwrap_or("<unassigned>"),
            self.name,
            self.provider_type,
            self.origin_key,
            self.active
        )
    }
}

/// SAML-specific part of a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamlProviderDefinition {
    /// Local attribute name (`user.attribute.<name>`) to SAML claim URI
    #[serde(default)]
    pub attribute_mappings: BTreeMap<String, String>,
    /// Create a local shadow user on first federated login
    pub add_shadow_user_on_login: bool,
    /// Persist mapped custom attributes on the user record
    pub store_custom_attributes: bool,
    /// Metadata document (raw XML) or a URL serving it
    #[serde(rename = "metaDataLocation")]
    pub metadata_location: String,
    #[serde(rename = "nameID")]
    pub name_id_format: String,
    pub assertion_consumer_index: i32,
    pub metadata_trust_check: bool,
    #[serde(rename = "skipSslValidation")]
    pub skip_tls_validation: bool,
    /// Text of the login-page link for this provider
    #[serde(default)]
    pub link_text: String,
    #[serde(rename = "showSamlLink")]
    pub show_link: bool,
}

impl SamlProviderDefinition {
    /// A definition for `metadata` with shadow users and custom attributes enabled.
    pub fn new(metadata: impl Into<String>) -> Self {
        Self {
            attribute_mappings: BTreeMap::new(),
            add_shadow_user_on_login: true,
            store_custom_attributes: true,
            metadata_location: metadata.into(),
            name_id_format: NAME_ID_UNSPECIFIED.to_string(),
            assertion_consumer_index: 0,
            metadata_trust_check: false,
            skip_tls_validation: false,
            link_text: String::new(),
            show_link: false,
        }
    }

    /// Map a local attribute to a SAML claim. A repeated local name replaces
    /// the earlier claim.
    pub fn with_attribute_mapping(
        mut self,
        local_attribute: impl Into<String>,
        claim_uri: impl Into<String>,
    ) -> Self {
        self.attribute_mappings
            .insert(local_attribute.into(), claim_uri.into());
        self
    }

    /// Show a login-page link with the given text.
    pub fn with_link_text(mut self, text: impl Into<String>) -> Self {
        self.link_text = text.into();
        self.show_link = true;
        self
    }

    pub fn with_skip_tls_validation(mut self, skip: bool) -> Self {
        self.skip_tls_validation = skip;
        self
    }
}

/// SHA-256 fingerprint of a metadata document, base64 encoded.
pub fn metadata_fingerprint(metadata: &str) -> String {
    let digest = Sha256::digest(metadata.as_bytes());
    STANDARD.encode(digest)
}

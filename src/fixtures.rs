//! The ADFS registration and the attributes its federated users must carry.

use crate::attributes::ExpectedAttributes;
use crate::error::FederationResult;
use crate::identity_provider::{IdentityProvider, SamlProviderDefinition};

/// Origin key of the ADFS registration in every zone.
pub const ADFS_ORIGIN_KEY: &str = "idats-adfs";

/// Display name and login-page link text of the ADFS registration.
pub const ADFS_LINK_TEXT: &str = "ADFS SAML for IDaTS";

pub const EMAIL_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
pub const ROLE_CLAIM: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";

/// Custom attribute populated from the role claim.
pub const FIXED_CUSTOM_ATTRIBUTE: &str = "fixedCustomAttributeToTestValue";

/// Value the ADFS instance asserts for the role claim.
pub const FIXED_CUSTOM_VALUE: &str = "microsoft";

/// The ADFS registration for `metadata`.
pub fn adfs_identity_provider(metadata: &str) -> FederationResult<IdentityProvider> {
    let definition = SamlProviderDefinition::new(metadata)
        .with_attribute_mapping("user.attribute.email", EMAIL_CLAIM)
        .with_attribute_mapping(format!("user.attribute.{FIXED_CUSTOM_ATTRIBUTE}"), ROLE_CLAIM)
        .with_link_text(ADFS_LINK_TEXT)
        .with_skip_tls_validation(true);
    IdentityProvider::saml(ADFS_ORIGIN_KEY, ADFS_LINK_TEXT, &definition)
}

/// Attributes a user federated from ADFS as `username` must carry.
pub fn adfs_expected_attributes(username: &str) -> ExpectedAttributes {
    ExpectedAttributes::new()
        .expect("email", [username])
        .expect(FIXED_CUSTOM_ATTRIBUTE, [FIXED_CUSTOM_VALUE])
}

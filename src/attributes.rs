//! Verification of federated user attributes.
//!
//! After a federated login the browser session belongs to the federated user.
//! The zone's passcode page hands out a one-time passcode for that session;
//! exchanging it through the password grant yields a token for the same
//! principal, and the user-info record behind that token must carry the
//! attributes mapped from the SAML assertion.

use crate::browser::{Browser, Locator, text_of};
use crate::client::TokenClient;
use crate::error::{FederationError, FederationResult};
use crate::token::ClientCredential;
use crate::zone::Zone;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Heading fragment of the passcode page.
pub const PASSCODE_HEADING: &str = "Temporary Authentication Code";

/// Attribute name to ordered values, as the user-info endpoint reports them.
pub type UserAttributes = BTreeMap<String, Vec<String>>;

/// The subset of the user-info record this workflow inspects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_attributes: UserAttributes,
}

/// Attribute values a federated user must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedAttributes {
    values: BTreeMap<String, Vec<String>>,
}

impl ExpectedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `attribute` to hold exactly `values`, in order.
    pub fn expect<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values
            .insert(attribute.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Check `actual` against every expected attribute.
///
/// Attributes that are not expected are ignored. The first mismatch is
/// reported with both the expected and the actual values.
pub fn check_attributes(
    actual: &UserAttributes,
    expected: &ExpectedAttributes,
) -> FederationResult<()> {
    for (attribute, values) in expected.iter() {
        match actual.get(attribute) {
            Some(found) if found == values => {}
            found => {
                return Err(FederationError::Assertion {
                    attribute: attribute.clone(),
                    expected: values.clone(),
                    actual: found.cloned(),
                });
            }
        }
    }
    Ok(())
}

/// Read the one-time passcode for the browser's current session.
///
/// Each call issues a new passcode and may invalidate earlier ones, so read
/// it once per token exchange.
pub async fn read_passcode<B: Browser>(browser: &B, zone: &Zone) -> FederationResult<String> {
    browser.navigate(&zone.url("/passcode")).await?;
    let heading = text_of(browser, &Locator::css("h1")).await?;
    if !heading.contains(PASSCODE_HEADING) {
        return Err(FederationError::expectation(
            format!("passcode page of zone {}", zone.id()),
            PASSCODE_HEADING,
            heading,
        ));
    }
    let passcode = text_of(browser, &Locator::css("h2")).await?.trim().to_string();
    if passcode.is_empty() {
        return Err(FederationError::expectation(
            format!("passcode page of zone {}", zone.id()),
            "a passcode",
            "an empty value",
        ));
    }
    debug!("Read passcode of length {} in zone {}", passcode.len(), zone.id());
    Ok(passcode)
}

/// Prove the browser's federated user carries the expected attributes.
///
/// Returns the user-info record that passed the check.
pub async fn verify_attributes<T, B>(
    tokens: &T,
    browser: &B,
    zone: &Zone,
    principal: &ClientCredential,
    expected: &ExpectedAttributes,
) -> FederationResult<UserInfo>
where
    T: TokenClient,
    B: Browser,
{
    let passcode = read_passcode(browser, zone).await?;
    let token = tokens.password_token(zone, principal, &passcode).await?;
    let user_info = tokens.user_info(zone, &token).await?;
    check_attributes(&user_info.user_attributes, expected)?;
    info!(
        "Verified {} attribute(s) for {} in zone {}",
        expected.len(),
        user_info.user_name.as_deref().unwrap_or("<unnamed>"),
        zone.id()
    );
    Ok(user_info)
}

//! Common test utilities for federation workflow tests.
//!
//! Provides an in-memory identity service, a scripted browser over it, and
//! builders for the configuration both scenarios run with.

#![allow(dead_code)]

pub mod fake_browser;

pub use fake_browser::{FakeBrowser, IDP_SIGN_IN_URL};
pub use fake_service::FakeIdentityService;

use federation_check::config::AcceptanceConfig;
use federation_check::fixtures::{EMAIL_CLAIM, ROLE_CLAIM};
use federation_check::token::{AccessToken, ClientCredential};
use federation_check::zone::Zone;
use federation_check::{IdpRegistry, TokenClient};
use std::collections::HashMap;

pub const PROTOCOL: &str = "https://";
pub const ROOT_DOMAIN: &str = "login.uaa-acceptance.cf-app.com";
pub const SECONDARY_ZONE_ID: &str = "idats";
pub const USERNAME: &str = "techuser1@adfs.cf-app.com";
pub const PASSWORD: &str = "Password01";
pub const METADATA: &str = r#"<md:EntityDescriptor xmlns:md="urn:oasis:names:tc:SAML:2.0:metadata" entityID="http://adfs.cf-app.test/adfs/services/trust"/>"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Configuration for the acceptance environment, with `overrides` applied.
pub fn config_with(overrides: &[(&str, &str)]) -> AcceptanceConfig {
    let mut env: HashMap<String, String> = HashMap::new();
    env.insert("BASE_URL".to_string(), ROOT_DOMAIN.to_string());
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    AcceptanceConfig::from_lookup(|key| env.get(key).cloned()).expect("valid test configuration")
}

pub fn test_config() -> AcceptanceConfig {
    config_with(&[])
}

pub fn system_zone() -> Zone {
    Zone::system(PROTOCOL, ROOT_DOMAIN).expect("system zone")
}

pub fn secondary_zone() -> Zone {
    Zone::named(SECONDARY_ZONE_ID, PROTOCOL, ROOT_DOMAIN).expect("secondary zone")
}

/// A service with the secondary zone and the ADFS test account asserting
/// `role` for the role claim.
pub fn service_with_role(role: &str) -> FakeIdentityService {
    FakeIdentityService::new()
        .with_zone(SECONDARY_ZONE_ID)
        .with_account(
            USERNAME,
            PASSWORD,
            vec![(EMAIL_CLAIM, vec![USERNAME]), (ROLE_CLAIM, vec![role])],
        )
}

/// The standard environment: service plus a fresh browser over it.
pub fn environment() -> (FakeIdentityService, FakeBrowser) {
    let service = service_with_role("microsoft");
    let browser = FakeBrowser::new(service.clone(), PROTOCOL, ROOT_DOMAIN);
    (service, browser)
}

/// System-zone admin token from the seeded `admin` client.
pub async fn system_admin_token(service: &FakeIdentityService) -> AccessToken {
    service
        .client_access_token(
            &system_zone(),
            &ClientCredential::new("admin", "adminsecret"),
            "",
        )
        .await
        .expect("system admin token")
}

/// Admin token for the secondary zone, via a freshly created zone admin client.
pub async fn secondary_admin_token(service: &FakeIdentityService) -> AccessToken {
    let system_token = system_admin_token(service).await;
    let credential = ClientCredential::generate();
    service
        .create_zone_admin_client(&system_zone(), &system_token, &credential, SECONDARY_ZONE_ID)
        .await
        .expect("zone admin client");
    service
        .client_access_token(&secondary_zone(), &credential, "")
        .await
        .expect("zone admin token")
}

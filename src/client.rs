//! Clients for the identity service's management and token APIs.
//!
//! Two traits describe what the workflow needs from the identity service:
//!
//! - [`IdpRegistry`] - identity-provider records and OAuth client records
//! - [`TokenClient`] - token grants and the user-info endpoint
//!
//! [`IdentityClient`] implements both over HTTP with `reqwest`. Every call is
//! scoped by the [`Zone`] it is addressed to; management calls carry a bearer
//! admin token for that zone. Calls are never retried.

use crate::attributes::UserInfo;
use crate::error::{FederationError, FederationResult};
use crate::identity_provider::IdentityProvider;
use crate::token::{AccessToken, ClientCredential, TokenResponse};
use crate::zone::Zone;
use chrono::Utc;
use log::debug;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// Header that targets a zone from a request made on the system zone.
pub const ZONE_HEADER: &str = "X-Identity-Zone-Id";

/// Authorities granted to a bootstrapped zone administrator client.
pub const ZONE_ADMIN_AUTHORITIES: &[&str] = &[
    "uaa.admin",
    "clients.read",
    "clients.write",
    "clients.secret",
    "clients.admin",
    "scim.read",
    "scim.write",
    "idps.read",
    "idps.write",
];

/// Identity-provider and OAuth client management, scoped per zone.
pub trait IdpRegistry: Send + Sync {
    /// All identity providers registered in `zone`.
    fn list_identity_providers(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
    ) -> impl Future<Output = FederationResult<Vec<IdentityProvider>>> + Send;

    /// Register a new provider; fails with a conflict if its origin key exists.
    fn create_identity_provider(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        provider: &IdentityProvider,
    ) -> impl Future<Output = FederationResult<IdentityProvider>> + Send;

    /// Replace the provider stored under `id`; fails with not-found if `id` is stale.
    fn update_identity_provider(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        id: &str,
        provider: &IdentityProvider,
    ) -> impl Future<Output = FederationResult<IdentityProvider>> + Send;

    /// Register an OAuth client allowed to use the password (passcode) grant.
    fn create_password_client(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        principal: &ClientCredential,
    ) -> impl Future<Output = FederationResult<()>> + Send;

    /// From the system zone, register an administrator client inside `target_zone_id`.
    fn create_zone_admin_client(
        &self,
        system_zone: &Zone,
        admin_token: &AccessToken,
        credential: &ClientCredential,
        target_zone_id: &str,
    ) -> impl Future<Output = FederationResult<()>> + Send;

    fn delete_client(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        client_id: &str,
    ) -> impl Future<Output = FederationResult<()>> + Send;

    /// From the system zone, delete a client registered inside `target_zone_id`.
    fn delete_zone_client(
        &self,
        system_zone: &Zone,
        admin_token: &AccessToken,
        target_zone_id: &str,
        client_id: &str,
    ) -> impl Future<Output = FederationResult<()>> + Send;
}

/// Token endpoint and user-info access, scoped per zone.
pub trait TokenClient: Send + Sync {
    /// Client-credentials grant. An empty `scope` requests the client's defaults.
    fn client_access_token(
        &self,
        zone: &Zone,
        credential: &ClientCredential,
        scope: &str,
    ) -> impl Future<Output = FederationResult<AccessToken>> + Send;

    /// Password grant with a one-time passcode in place of a password.
    fn password_token(
        &self,
        zone: &Zone,
        principal: &ClientCredential,
        passcode: &str,
    ) -> impl Future<Output = FederationResult<AccessToken>> + Send;

    fn user_info(
        &self,
        zone: &Zone,
        token: &AccessToken,
    ) -> impl Future<Output = FederationResult<UserInfo>> + Send;
}

/// OAuth client record as posted to the client management endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    pub authorized_grant_types: Vec<String>,
    pub scope: Vec<String>,
    pub authorities: Vec<String>,
    pub resource_ids: Vec<String>,
}

impl ClientRegistration {
    /// A client for the passcode exchange with user-attribute access.
    pub fn password(principal: &ClientCredential) -> Self {
        Self {
            client_id: principal.client_id.clone(),
            client_secret: principal.client_secret.expose().to_string(),
            authorized_grant_types: vec!["password".to_string()],
            scope: vec!["openid".to_string(), "user_attributes".to_string()],
            authorities: vec!["uaa.none".to_string()],
            resource_ids: vec!["none".to_string()],
        }
    }

    /// A client-credentials client administering one zone.
    pub fn zone_admin(credential: &ClientCredential) -> Self {
        Self {
            client_id: credential.client_id.clone(),
            client_secret: credential.client_secret.expose().to_string(),
            authorized_grant_types: vec!["client_credentials".to_string()],
            scope: vec!["uaa.none".to_string()],
            authorities: ZONE_ADMIN_AUTHORITIES.iter().map(|a| a.to_string()).collect(),
            resource_ids: vec!["none".to_string()],
        }
    }
}

/// HTTP client for the identity service.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: Client,
}

impl IdentityClient {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> FederationResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("federation-check/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_http_client(http: Client) -> Self {
        Self { http }
    }

    fn identity_providers_url(zone: &Zone, id: Option<&str>) -> String {
        match id {
            Some(id) => zone.url(&format!("/identity-providers/{id}?rawConfig=true")),
            None => zone.url("/identity-providers?rawConfig=true"),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestBuilder,
    ) -> FederationResult<T> {
        let response = request.header("Accept", "application/json").send().await?;
        let response = check_status(what, response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, what: &str, request: RequestBuilder) -> FederationResult<()> {
        let response = request.header("Accept", "application/json").send().await?;
        check_status(what, response).await?;
        Ok(())
    }

    async fn token_grant(
        &self,
        zone: &Zone,
        credential: &ClientCredential,
        form: &[(&str, &str)],
    ) -> FederationResult<AccessToken> {
        let issued_at = Utc::now();
        let request = self
            .http
            .post(zone.url("/oauth/token"))
            .basic_auth(&credential.client_id, Some(credential.client_secret.expose()))
            .form(form);
        let response: TokenResponse = self.send_json("token grant", request).await?;
        Ok(AccessToken::from_response(response, issued_at))
    }
}

impl IdpRegistry for IdentityClient {
    async fn list_identity_providers(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
    ) -> FederationResult<Vec<IdentityProvider>> {
        debug!("Listing identity providers in zone {}", zone.id());
        let request = self
            .http
            .get(Self::identity_providers_url(zone, None))
            .bearer_auth(admin_token.bearer());
        self.send_json("list identity providers", request).await
    }

    async fn create_identity_provider(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        provider: &IdentityProvider,
    ) -> FederationResult<IdentityProvider> {
        debug!(
            "Creating identity provider '{}' in zone {}",
            provider.origin_key,
            zone.id()
        );
        let request = self
            .http
            .post(Self::identity_providers_url(zone, None))
            .bearer_auth(admin_token.bearer())
            .json(provider);
        self.send_json("create identity provider", request).await
    }

    async fn update_identity_provider(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        id: &str,
        provider: &IdentityProvider,
    ) -> FederationResult<IdentityProvider> {
        debug!(
            "Updating identity provider '{}' ({}) in zone {}",
            provider.origin_key,
            id,
            zone.id()
        );
        let body = provider.clone().with_id(id);
        let request = self
            .http
            .put(Self::identity_providers_url(zone, Some(id)))
            .bearer_auth(admin_token.bearer())
            .json(&body);
        self.send_json("update identity provider", request).await
    }

    async fn create_password_client(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        principal: &ClientCredential,
    ) -> FederationResult<()> {
        debug!(
            "Creating password client {} in zone {}",
            principal.client_id,
            zone.id()
        );
        let request = self
            .http
            .post(zone.url("/oauth/clients"))
            .bearer_auth(admin_token.bearer())
            .json(&ClientRegistration::password(principal));
        self.send_empty("create password client", request).await
    }

    async fn create_zone_admin_client(
        &self,
        system_zone: &Zone,
        admin_token: &AccessToken,
        credential: &ClientCredential,
        target_zone_id: &str,
    ) -> FederationResult<()> {
        debug!(
            "Creating zone admin client {} for zone {}",
            credential.client_id, target_zone_id
        );
        let request = self
            .http
            .post(system_zone.url("/oauth/clients"))
            .bearer_auth(admin_token.bearer())
            .header(ZONE_HEADER, target_zone_id)
            .json(&ClientRegistration::zone_admin(credential));
        self.send_empty("create zone admin client", request).await
    }

    async fn delete_client(
        &self,
        zone: &Zone,
        admin_token: &AccessToken,
        client_id: &str,
    ) -> FederationResult<()> {
        debug!("Deleting client {} in zone {}", client_id, zone.id());
        let request = self
            .http
            .delete(zone.url(&format!("/oauth/clients/{client_id}")))
            .bearer_auth(admin_token.bearer());
        self.send_empty("delete client", request).await
    }

    async fn delete_zone_client(
        &self,
        system_zone: &Zone,
        admin_token: &AccessToken,
        target_zone_id: &str,
        client_id: &str,
    ) -> FederationResult<()> {
        debug!("Deleting client {} in zone {}", client_id, target_zone_id);
        let request = self
            .http
            .delete(system_zone.url(&format!("/oauth/clients/{client_id}")))
            .bearer_auth(admin_token.bearer())
            .header(ZONE_HEADER, target_zone_id);
        self.send_empty("delete zone client", request).await
    }
}

impl TokenClient for IdentityClient {
    async fn client_access_token(
        &self,
        zone: &Zone,
        credential: &ClientCredential,
        scope: &str,
    ) -> FederationResult<AccessToken> {
        debug!(
            "Requesting client token for {} in zone {}",
            credential.client_id,
            zone.id()
        );
        let mut form = vec![("grant_type", "client_credentials")];
        if !scope.is_empty() {
            form.push(("scope", scope));
        }
        self.token_grant(zone, credential, &form).await
    }

    async fn password_token(
        &self,
        zone: &Zone,
        principal: &ClientCredential,
        passcode: &str,
    ) -> FederationResult<AccessToken> {
        debug!(
            "Exchanging passcode through client {} in zone {}",
            principal.client_id,
            zone.id()
        );
        let form = [("grant_type", "password"), ("passcode", passcode)];
        self.token_grant(zone, principal, &form).await
    }

    async fn user_info(&self, zone: &Zone, token: &AccessToken) -> FederationResult<UserInfo> {
        let request = self
            .http
            .get(zone.url("/userinfo"))
            .bearer_auth(token.bearer());
        self.send_json("user info", request).await
    }
}

/// Map a non-success response onto the error taxonomy.
///
/// A rejected grant (`invalid_grant`, e.g. an expired or consumed passcode)
/// is a credential problem even though it arrives as 400.
async fn check_status(what: &str, response: Response) -> FederationResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            FederationError::auth(format!("{what} rejected ({status}): {body}"))
        }
        StatusCode::BAD_REQUEST if body.contains("invalid_grant") => {
            FederationError::auth(format!("{what} rejected ({status}): {body}"))
        }
        StatusCode::NOT_FOUND => FederationError::NotFound {
            message: format!("{what}: {body}"),
        },
        StatusCode::CONFLICT => FederationError::Conflict {
            message: format!("{what}: {body}"),
        },
        _ => FederationError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        },
    })
}

//! End-to-end federation scenarios.
//!
//! A scenario proves federation for one zone:
//!
//! 1. log the browser out of the zone
//! 2. obtain an admin token for the zone (bootstrapping a zone administrator
//!    client from the system zone for secondary zones)
//! 3. ensure the ADFS registration exists
//! 4. create a throwaway password client
//! 5. log in through ADFS and verify the federated user's attributes
//!
//! Every client created along the way is recorded in a [`Teardown`] ledger
//! and deleted once the scenario ends, whether it passed or not. The ADFS
//! registration is left in place because setup is idempotent.
//!
//! Scenarios share one browser session and mutate zone configuration, so
//! they run strictly one after another.

use crate::attributes::{UserInfo, verify_attributes};
use crate::browser::Browser;
use crate::client::{IdpRegistry, TokenClient};
use crate::config::AcceptanceConfig;
use crate::error::{FederationError, FederationResult};
use crate::federation::ensure_identity_provider;
use crate::fixtures::{ADFS_LINK_TEXT, adfs_expected_attributes, adfs_identity_provider};
use crate::identity_provider::IdentityProvider;
use crate::login::{LoginBranch, drive_login_flow};
use crate::report::ScenarioReport;
use crate::token::{AccessToken, ClientCredential};
use crate::zone::Zone;
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;

/// The two federation scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Federation in the system zone
    SystemZone,
    /// Federation in the configured secondary zone
    SecondaryZone,
}

impl Scenario {
    /// Both scenarios, in run order.
    pub fn all() -> [Scenario; 2] {
        [Scenario::SystemZone, Scenario::SecondaryZone]
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SystemZone => write!(f, "system zone"),
            Self::SecondaryZone => write!(f, "secondary zone"),
        }
    }
}

/// What a passing scenario observed.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub zone: Zone,
    /// The ADFS registration as persisted in the zone
    pub provider: IdentityProvider,
    pub login: LoginBranch,
    pub user_info: UserInfo,
}

#[derive(Debug)]
struct PendingClient {
    /// Zone the deletion request is sent to
    zone: Zone,
    admin_token: AccessToken,
    /// Zone holding the client when it differs from `zone`
    target_zone_id: Option<String>,
    client_id: String,
}

impl PendingClient {
    fn holder(&self) -> &str {
        self.target_zone_id.as_deref().unwrap_or(self.zone.id())
    }
}

/// Ledger of clients to delete when a scenario ends.
///
/// Entries are released in reverse order of creation, so a client is always
/// deleted before the administrator client that created it. Clients inside a
/// secondary zone may be recorded against the system zone, which deletes them
/// through the zone header.
#[derive(Debug, Default)]
pub struct Teardown {
    pending: Vec<PendingClient>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `client_id` in `zone` must be deleted with `admin_token`.
    pub fn defer_client_deletion(
        &mut self,
        zone: &Zone,
        admin_token: &AccessToken,
        client_id: impl Into<String>,
    ) {
        self.pending.push(PendingClient {
            zone: zone.clone(),
            admin_token: admin_token.clone(),
            target_zone_id: None,
            client_id: client_id.into(),
        });
    }

    /// Record that `client_id` in `target_zone_id` must be deleted from the
    /// system zone with `admin_token`.
    pub fn defer_zone_client_deletion(
        &mut self,
        system_zone: &Zone,
        admin_token: &AccessToken,
        target_zone_id: impl Into<String>,
        client_id: impl Into<String>,
    ) {
        self.pending.push(PendingClient {
            zone: system_zone.clone(),
            admin_token: admin_token.clone(),
            target_zone_id: Some(target_zone_id.into()),
            client_id: client_id.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Delete every recorded client, then log the browser out of `zone`.
    ///
    /// Every step is attempted even when an earlier one fails; the first
    /// failure is returned. A client that is already gone counts as deleted.
    pub async fn release<R, B>(&mut self, registry: &R, browser: &B, zone: &Zone) -> FederationResult<()>
    where
        R: IdpRegistry,
        B: Browser,
    {
        let mut first_error = None;
        while let Some(pending) = self.pending.pop() {
            let deleted = match &pending.target_zone_id {
                Some(target) => {
                    registry
                        .delete_zone_client(
                            &pending.zone,
                            &pending.admin_token,
                            target,
                            &pending.client_id,
                        )
                        .await
                }
                None => {
                    registry
                        .delete_client(&pending.zone, &pending.admin_token, &pending.client_id)
                        .await
                }
            };
            match deleted {
                Ok(()) => info!(
                    "Deleted client {} in zone {}",
                    pending.client_id,
                    pending.holder()
                ),
                Err(FederationError::NotFound { .. }) => debug!(
                    "Client {} in zone {} was already deleted",
                    pending.client_id,
                    pending.holder()
                ),
                Err(e) => {
                    warn!(
                        "Failed to delete client {} in zone {}: {}",
                        pending.client_id,
                        pending.holder(),
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Err(e) = logout(browser, zone).await {
            warn!("Failed to log out of zone {}: {}", zone.id(), e);
            first_error.get_or_insert(e);
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Combine a scenario result with its teardown result.
///
/// A scenario failure takes precedence; a teardown failure behind it is only
/// logged.
pub fn settle<T>(outcome: FederationResult<T>, released: FederationResult<()>) -> FederationResult<T> {
    match (outcome, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(primary), Ok(())) => Err(primary),
        (Err(primary), Err(cleanup)) => {
            warn!("Teardown also failed: {}", cleanup);
            Err(primary)
        }
    }
}

async fn logout<B: Browser>(browser: &B, zone: &Zone) -> FederationResult<()> {
    debug!("Logging out of zone {}", zone.id());
    browser.navigate(&zone.url("/logout.do")).await
}

/// Runs the federation scenarios against one acceptance environment.
pub struct ScenarioRunner<'a, A, B> {
    api: &'a A,
    browser: &'a B,
    config: &'a AcceptanceConfig,
    metadata: String,
    system_admin: Option<AccessToken>,
}

impl<'a, A, B> ScenarioRunner<'a, A, B>
where
    A: IdpRegistry + TokenClient,
    B: Browser,
{
    /// Create a runner for the environment in `config`.
    ///
    /// Fails with [`FederationError::EnvironmentRejected`] before anything
    /// else happens if the environment is not allow-listed.
    pub fn new(
        api: &'a A,
        browser: &'a B,
        config: &'a AcceptanceConfig,
        metadata: impl Into<String>,
    ) -> FederationResult<Self> {
        config.guard()?;
        Ok(Self {
            api,
            browser,
            config,
            metadata: metadata.into(),
            system_admin: None,
        })
    }

    pub fn zone_for(&self, scenario: Scenario) -> FederationResult<Zone> {
        match scenario {
            Scenario::SystemZone => self.config.system_zone(),
            Scenario::SecondaryZone => self.config.secondary_zone(),
        }
    }

    /// Run `scenario`, releasing everything it created before returning.
    pub async fn run(&mut self, scenario: Scenario) -> FederationResult<ScenarioOutcome> {
        let zone = self.zone_for(scenario)?;
        info!("Starting {} scenario against {}", scenario, zone);

        let mut teardown = Teardown::new();
        let outcome = self.execute(scenario, &zone, &mut teardown).await;
        let released = teardown.release(self.api, self.browser, &zone).await;
        let result = settle(outcome, released);

        match &result {
            Ok(_) => info!("{} scenario passed", scenario),
            Err(e) => info!("{} scenario failed: {}", scenario, e),
        }
        result
    }

    pub async fn run_system_zone(&mut self) -> FederationResult<ScenarioOutcome> {
        self.run(Scenario::SystemZone).await
    }

    pub async fn run_secondary_zone(&mut self) -> FederationResult<ScenarioOutcome> {
        self.run(Scenario::SecondaryZone).await
    }

    /// Run `scenarios` in order. A failing scenario does not stop later ones.
    pub async fn run_all(&mut self, scenarios: &[Scenario]) -> FederationResult<Vec<ScenarioReport>> {
        let mut reports = Vec::with_capacity(scenarios.len());
        for &scenario in scenarios {
            let zone = self.zone_for(scenario)?;
            let started_at = Utc::now();
            let result = self.run(scenario).await;
            let finished_at = Utc::now();
            reports.push(ScenarioReport::from_result(
                scenario,
                &zone,
                started_at,
                finished_at,
                &result,
            ));
        }
        Ok(reports)
    }

    async fn execute(
        &mut self,
        scenario: Scenario,
        zone: &Zone,
        teardown: &mut Teardown,
    ) -> FederationResult<ScenarioOutcome> {
        logout(self.browser, zone).await?;

        let zone_token = self.zone_admin_token(zone, teardown).await?;

        let desired = adfs_identity_provider(&self.metadata)?;
        let provider = ensure_identity_provider(self.api, zone, &zone_token, &desired).await?;

        let principal = ClientCredential::generate();
        self.api
            .create_password_client(zone, &zone_token, &principal)
            .await?;
        teardown.defer_client_deletion(zone, &zone_token, principal.client_id.clone());

        let credentials = &self.config.idp_credentials;
        let login = drive_login_flow(self.browser, zone, ADFS_LINK_TEXT, credentials).await?;

        let expected = adfs_expected_attributes(&credentials.username);
        let user_info =
            verify_attributes(self.api, self.browser, zone, &principal, &expected).await?;

        Ok(ScenarioOutcome {
            scenario,
            zone: zone.clone(),
            provider,
            login,
            user_info,
        })
    }

    /// System admin token, reused while it has not expired.
    async fn system_admin_token(&mut self) -> FederationResult<AccessToken> {
        if let Some(token) = self.system_admin.as_ref().filter(|t| t.is_usable()) {
            return Ok(token.clone());
        }
        let system_zone = self.config.system_zone()?;
        let token = self
            .api
            .client_access_token(&system_zone, &self.config.admin, "")
            .await?;
        debug!("Obtained system admin token expiring at {:?}", token.expires_at());
        self.system_admin = Some(token.clone());
        Ok(token)
    }

    /// Admin token for `zone`.
    ///
    /// Secondary zones get a fresh administrator client created from the
    /// system zone. It is recorded for deletion from the system zone as soon
    /// as it exists, before its own token grant.
    async fn zone_admin_token(
        &mut self,
        zone: &Zone,
        teardown: &mut Teardown,
    ) -> FederationResult<AccessToken> {
        let system_token = self.system_admin_token().await?;
        if zone.is_system() {
            return Ok(system_token);
        }

        let system_zone = self.config.system_zone()?;
        let zone_admin = ClientCredential::generate();
        self.api
            .create_zone_admin_client(&system_zone, &system_token, &zone_admin, zone.id())
            .await?;
        teardown.defer_zone_client_deletion(
            &system_zone,
            &system_token,
            zone.id(),
            zone_admin.client_id.clone(),
        );
        let zone_token = self.api.client_access_token(zone, &zone_admin, "").await?;
        info!(
            "Bootstrapped zone admin client {} for zone {}",
            zone_admin.client_id,
            zone.id()
        );
        Ok(zone_token)
    }
}

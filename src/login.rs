//! Browser-driven SSO login through an external SAML identity provider.
//!
//! The flow starts at the zone's login page and activates the link configured
//! for the identity provider. From there it takes one of two branches:
//!
//! * the browser left the zone's host and shows the IdP sign-in form, so the
//!   federated user's credentials are typed in and submitted;
//! * the browser never left the zone because the IdP already holds a session
//!   from an earlier flow in the same browser, so credential entry is skipped.
//!
//! Both branches must end on the zone's landing page.

use crate::browser::{Browser, BrowserElement, Locator, text_of};
use crate::error::{FederationError, FederationResult};
use crate::token::Secret;
use crate::zone::Zone;
use log::{debug, info};
use serde::Serialize;

/// Heading fragment shown on the landing page after a successful login.
pub const LANDING_HEADING: &str = "Where to?";

/// Username and password of the federated (IdP-side) user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpCredentials {
    pub username: String,
    pub password: Secret,
}

/// Where the IdP's sign-in form lives on its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInForm {
    /// Element holding the sign-in prompt
    pub prompt: Locator,
    /// Text the prompt must contain
    pub prompt_text: String,
    pub username_field: Locator,
    pub password_field: Locator,
    pub submit: Locator,
}

impl SignInForm {
    /// The Active Directory Federation Services forms-based sign-in page.
    pub fn adfs() -> Self {
        Self {
            prompt: Locator::id("loginMessage"),
            prompt_text: "Sign in with your organizational account".to_string(),
            username_field: Locator::name("UserName"),
            password_field: Locator::name("Password"),
            submit: Locator::id("submitButton"),
        }
    }
}

impl Default for SignInForm {
    fn default() -> Self {
        Self::adfs()
    }
}

/// States the login flow moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    AtLoginPage,
    AtIdpOrAlreadyAuthenticated,
    CredentialsPrompted,
    SubmittedCredentials,
    AlreadyAuthenticated,
    AtLandingPage,
}

/// Which branch the flow took to reach the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginBranch {
    SubmittedCredentials,
    AlreadyAuthenticated,
}

/// Drives the login flow for one zone.
pub struct LoginFlow<'a, B: Browser> {
    browser: &'a B,
    zone: &'a Zone,
    form: SignInForm,
    state: LoginState,
}

impl<'a, B: Browser> LoginFlow<'a, B> {
    pub fn new(browser: &'a B, zone: &'a Zone) -> Self {
        Self {
            browser,
            zone,
            form: SignInForm::default(),
            state: LoginState::AtLoginPage,
        }
    }

    /// Use a different IdP sign-in form layout.
    pub fn with_form(mut self, form: SignInForm) -> Self {
        self.form = form;
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    /// Run the flow to the landing page.
    ///
    /// The link whose visible text equals `idp_link_text` must be present on
    /// the login page; its absence means the registration does not show its
    /// login link.
    pub async fn run(
        &mut self,
        idp_link_text: &str,
        credentials: &IdpCredentials,
    ) -> FederationResult<LoginBranch> {
        let login_url = self.zone.url("/login");
        self.browser.navigate(&login_url).await?;
        self.transition(LoginState::AtLoginPage);

        let link = self.browser.find(&Locator::link_text(idp_link_text)).await?;
        link.click().await?;
        self.transition(LoginState::AtIdpOrAlreadyAuthenticated);

        let location = self.browser.current_url().await?;
        let branch = if self.zone.owns(&location) {
            self.transition(LoginState::AlreadyAuthenticated);
            LoginBranch::AlreadyAuthenticated
        } else {
            debug!("Redirected to identity provider at {}", location);
            self.transition(LoginState::CredentialsPrompted);
            self.submit_credentials(credentials).await?;
            self.transition(LoginState::SubmittedCredentials);
            LoginBranch::SubmittedCredentials
        };

        let heading = text_of(self.browser, &Locator::css("h1")).await?;
        if !heading.contains(LANDING_HEADING) {
            return Err(FederationError::expectation(
                format!("landing page of zone {}", self.zone.id()),
                LANDING_HEADING,
                heading,
            ));
        }
        self.transition(LoginState::AtLandingPage);
        info!("Logged in to zone {} via {:?}", self.zone.id(), branch);
        Ok(branch)
    }

    async fn submit_credentials(&self, credentials: &IdpCredentials) -> FederationResult<()> {
        let prompt = text_of(self.browser, &self.form.prompt).await?;
        if !prompt.contains(&self.form.prompt_text) {
            return Err(FederationError::expectation(
                "identity provider sign-in page",
                self.form.prompt_text.clone(),
                prompt,
            ));
        }

        let username = self.browser.find(&self.form.username_field).await?;
        username.clear().await?;
        username.send_keys(&credentials.username).await?;

        let password = self.browser.find(&self.form.password_field).await?;
        password.send_keys(credentials.password.expose()).await?;

        self.browser.find(&self.form.submit).await?.click().await
    }

    fn transition(&mut self, next: LoginState) {
        debug!("Login flow {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Drive the login flow for `zone` with the default ADFS sign-in form.
pub async fn drive_login_flow<B: Browser>(
    browser: &B,
    zone: &Zone,
    idp_link_text: &str,
    credentials: &IdpCredentials,
) -> FederationResult<LoginBranch> {
    LoginFlow::new(browser, zone)
        .run(idp_link_text, credentials)
        .await
}

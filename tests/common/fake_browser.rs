//! Scripted browser over [`FakeIdentityService`].
//!
//! Models the pages the workflow visits: the zone login, landing, passcode
//! and logout pages, and the identity provider's sign-in form on its own
//! host. Logging out of a zone ends the zone session only; the identity
//! provider session stays, as it does with a real ADFS.

use super::fake_service::FakeIdentityService;
use federation_check::browser::{Browser, BrowserElement, Locator};
use federation_check::error::{FederationError, FederationResult};
use federation_check::zone::SYSTEM_ZONE_ID;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Location of the identity provider's sign-in form.
pub const IDP_SIGN_IN_URL: &str = "https://adfs.cf-app.test/adfs/ls/?SAMLRequest=fake";

const IDP_PROMPT: &str = "Sign in with your organizational account";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Blank,
    Login { zone_id: String },
    IdpSignIn { zone_id: String, origin_key: String },
    Landing { zone_id: String },
    Passcode { code: String },
    NotFound,
}

#[derive(Debug, Clone)]
enum ElementKind {
    Text(String),
    LoginLink { zone_id: String, origin_key: String },
    Field(String),
    Submit,
}

struct BrowserState {
    page: Page,
    location: String,
    idp_session: Option<String>,
    zone_sessions: HashMap<String, String>,
    fields: HashMap<String, String>,
    prefilled: HashMap<String, String>,
    rejected_login: bool,
    history: Vec<String>,
}

struct Inner {
    service: FakeIdentityService,
    protocol: String,
    root_domain: String,
    element_timeout: Duration,
    idp_prompt: Mutex<String>,
    landing_heading: Mutex<String>,
    stalled: Mutex<HashSet<Locator>>,
    state: Mutex<BrowserState>,
}

/// Shared handle to one scripted browser session.
#[derive(Clone)]
pub struct FakeBrowser {
    inner: Arc<Inner>,
}

impl FakeBrowser {
    pub fn new(service: FakeIdentityService, protocol: &str, root_domain: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                protocol: protocol.to_string(),
                root_domain: root_domain.to_string(),
                element_timeout: Duration::from_secs(10),
                idp_prompt: Mutex::new(IDP_PROMPT.to_string()),
                landing_heading: Mutex::new("Where to?".to_string()),
                stalled: Mutex::new(HashSet::new()),
                state: Mutex::new(BrowserState {
                    page: Page::Blank,
                    location: "about:blank".to_string(),
                    idp_session: None,
                    zone_sessions: HashMap::new(),
                    fields: HashMap::new(),
                    prefilled: HashMap::new(),
                    rejected_login: false,
                    history: Vec::new(),
                }),
            }),
        }
    }

    /// Replace the identity provider's sign-in prompt.
    pub fn set_idp_prompt(&self, prompt: &str) {
        *self.inner.idp_prompt.lock().expect("lock") = prompt.to_string();
    }

    /// Replace the landing page heading.
    pub fn set_landing_heading(&self, heading: &str) {
        *self.inner.landing_heading.lock().expect("lock") = heading.to_string();
    }

    /// Make lookups of `locator` wait out the element timeout.
    pub fn stall(&self, locator: Locator) {
        self.inner.stalled.lock().expect("lock").insert(locator);
    }

    /// Pretend an earlier flow left an identity provider session for `username`.
    pub fn start_idp_session(&self, username: &str) {
        self.inner.state().idp_session = Some(username.to_string());
    }

    pub fn has_idp_session(&self) -> bool {
        self.inner.state().idp_session.is_some()
    }

    pub fn is_logged_in(&self, zone_id: &str) -> bool {
        self.inner.state().zone_sessions.contains_key(zone_id)
    }

    /// Every URL navigated to, in order.
    pub fn history(&self) -> Vec<String> {
        self.inner.state().history.clone()
    }

    /// Have the sign-in form show `value` in the field `name`, as a browser
    /// remembering an earlier entry would.
    pub fn prefill(&self, name: &str, value: &str) {
        self.inner
            .state()
            .prefilled
            .insert(name.to_string(), value.to_string());
    }

    /// Value last typed into the form field `name`.
    pub fn field(&self, name: &str) -> Option<String> {
        self.inner.state().fields.get(name).cloned()
    }
}

impl Inner {
    fn state(&self) -> std::sync::MutexGuard<'_, BrowserState> {
        self.state.lock().expect("fake browser lock")
    }

    /// Zone id addressed by `url`, if it belongs to the identity service.
    fn zone_of(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?;
        if host == self.root_domain {
            return Some(SYSTEM_ZONE_ID.to_string());
        }
        host.strip_suffix(&format!(".{}", self.root_domain))
            .map(str::to_string)
    }

    fn zone_url(&self, zone_id: &str, path: &str) -> String {
        if zone_id == SYSTEM_ZONE_ID {
            format!("{}{}{}", self.protocol, self.root_domain, path)
        } else {
            format!("{}{}.{}{}", self.protocol, zone_id, self.root_domain, path)
        }
    }

    fn show(&self, state: &mut BrowserState, page: Page, location: String) {
        state.page = page;
        state.location = location;
    }

    fn land(&self, state: &mut BrowserState, zone_id: &str, origin_key: &str, username: &str) {
        self.service.federate(zone_id, origin_key, username);
        state
            .zone_sessions
            .insert(zone_id.to_string(), username.to_string());
        let location = self.zone_url(zone_id, "/");
        self.show(
            state,
            Page::Landing {
                zone_id: zone_id.to_string(),
            },
            location,
        );
    }

    fn lookup(&self, locator: &Locator) -> FederationResult<ElementKind> {
        if self.stalled.lock().expect("lock").contains(locator) {
            return Err(FederationError::ElementTimeout {
                locator: locator.to_string(),
                waited: self.element_timeout,
            });
        }
        let state = self.state();
        let found = match (&state.page, locator) {
            (Page::Login { .. }, Locator::Css(css)) if css == "h1" => {
                Some(ElementKind::Text("Welcome!".to_string()))
            }
            (Page::Login { zone_id }, Locator::LinkText(text)) => self
                .service
                .login_links(zone_id)
                .into_iter()
                .find(|(link_text, _)| link_text == text)
                .map(|(_, origin_key)| ElementKind::LoginLink {
                    zone_id: zone_id.clone(),
                    origin_key,
                }),
            (Page::IdpSignIn { .. }, Locator::Id(id)) if id == "loginMessage" => {
                let prompt = if state.rejected_login {
                    "Incorrect user ID or password.".to_string()
                } else {
                    self.idp_prompt.lock().expect("lock").clone()
                };
                Some(ElementKind::Text(prompt))
            }
            (Page::IdpSignIn { .. }, Locator::Css(css)) if css == "h1" => {
                Some(ElementKind::Text("Sign In".to_string()))
            }
            (Page::IdpSignIn { .. }, Locator::Name(name))
                if name == "UserName" || name == "Password" =>
            {
                Some(ElementKind::Field(name.clone()))
            }
            (Page::IdpSignIn { .. }, Locator::Id(id)) if id == "submitButton" => {
                Some(ElementKind::Submit)
            }
            (Page::Landing { .. }, Locator::Css(css)) if css == "h1" => Some(ElementKind::Text(
                self.landing_heading.lock().expect("lock").clone(),
            )),
            (Page::Passcode { .. }, Locator::Css(css)) if css == "h1" => Some(ElementKind::Text(
                "Temporary Authentication Code".to_string(),
            )),
            (Page::Passcode { code }, Locator::Css(css)) if css == "h2" => {
                Some(ElementKind::Text(code.clone()))
            }
            _ => None,
        };
        found.ok_or_else(|| FederationError::ElementMissing {
            locator: locator.to_string(),
        })
    }

    fn activate(&self, kind: &ElementKind) -> FederationResult<()> {
        let mut state = self.state();
        match kind {
            ElementKind::LoginLink {
                zone_id,
                origin_key,
            } => match state.idp_session.clone() {
                Some(username) => self.land(&mut state, zone_id, origin_key, &username),
                None => {
                    state.fields = state.prefilled.clone();
                    state.rejected_login = false;
                    self.show(
                        &mut state,
                        Page::IdpSignIn {
                            zone_id: zone_id.clone(),
                            origin_key: origin_key.clone(),
                        },
                        IDP_SIGN_IN_URL.to_string(),
                    );
                }
            },
            ElementKind::Submit => {
                let Page::IdpSignIn {
                    zone_id,
                    origin_key,
                } = state.page.clone()
                else {
                    return Err(FederationError::driver("submit outside the sign-in form"));
                };
                let username = state.fields.get("UserName").cloned().unwrap_or_default();
                let password = state.fields.get("Password").cloned().unwrap_or_default();
                if self.service.authenticate_account(&username, &password) {
                    state.idp_session = Some(username.clone());
                    self.land(&mut state, &zone_id, &origin_key, &username);
                } else {
                    state.rejected_login = true;
                }
            }
            ElementKind::Text(_) | ElementKind::Field(_) => {}
        }
        Ok(())
    }
}

impl Browser for FakeBrowser {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> FederationResult<()> {
        let parsed = Url::parse(url)?;
        let inner = &self.inner;
        let mut state = inner.state();
        state.history.push(url.to_string());

        let Some(zone_id) = inner.zone_of(&parsed) else {
            inner.show(&mut state, Page::NotFound, url.to_string());
            return Ok(());
        };
        match parsed.path() {
            "/login" => {
                let location = inner.zone_url(&zone_id, "/login");
                inner.show(&mut state, Page::Login { zone_id }, location);
            }
            "/logout.do" => {
                state.zone_sessions.remove(&zone_id);
                let location = inner.zone_url(&zone_id, "/login");
                inner.show(&mut state, Page::Login { zone_id }, location);
            }
            "/passcode" => match state.zone_sessions.get(&zone_id).cloned() {
                Some(username) => {
                    let code = inner.service.issue_passcode(&zone_id, &username);
                    inner.show(&mut state, Page::Passcode { code }, url.to_string());
                }
                None => {
                    let location = inner.zone_url(&zone_id, "/login");
                    inner.show(&mut state, Page::Login { zone_id }, location);
                }
            },
            "/" if state.zone_sessions.contains_key(&zone_id) => {
                inner.show(&mut state, Page::Landing { zone_id }, url.to_string());
            }
            _ => inner.show(&mut state, Page::NotFound, url.to_string()),
        }
        Ok(())
    }

    async fn find(&self, locator: &Locator) -> FederationResult<FakeElement> {
        let kind = self.inner.lookup(locator)?;
        Ok(FakeElement {
            inner: Arc::clone(&self.inner),
            kind,
        })
    }

    async fn current_url(&self) -> FederationResult<String> {
        Ok(self.inner.state().location.clone())
    }
}

/// Element handle returned by [`FakeBrowser::find`].
pub struct FakeElement {
    inner: Arc<Inner>,
    kind: ElementKind,
}

impl BrowserElement for FakeElement {
    async fn text(&self) -> FederationResult<String> {
        Ok(match &self.kind {
            ElementKind::Text(text) => text.clone(),
            ElementKind::Field(name) => self
                .inner
                .state()
                .fields
                .get(name)
                .cloned()
                .unwrap_or_default(),
            ElementKind::LoginLink { .. } | ElementKind::Submit => String::new(),
        })
    }

    async fn click(&self) -> FederationResult<()> {
        self.inner.activate(&self.kind)
    }

    async fn clear(&self) -> FederationResult<()> {
        if let ElementKind::Field(name) = &self.kind {
            self.inner.state().fields.remove(name);
        }
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> FederationResult<()> {
        if let ElementKind::Field(name) = &self.kind {
            self.inner
                .state()
                .fields
                .entry(name.clone())
                .or_default()
                .push_str(text);
        }
        Ok(())
    }
}

//! Routing guard that decides where a load should land.
//!
//! Every load (or navigation) is evaluated once against the stored token's
//! validity and the current location:
//!
//! | token  | location            | result                                    |
//! |--------|---------------------|-------------------------------------------|
//! | valid  | not `/remote`       | `Authenticated`, redirect to remote       |
//! | invalid| `connect`           | `AwaitingHandshake` or `HandshakeError`   |
//! | invalid| anything else, `/`  | `Unauthenticated`, redirect to connect    |
//! | valid  | `/remote`           | `Authenticated`, stay                     |

use serde::Serialize;
use std::collections::HashMap;
use url::Url;

const BARE_PATH_BASE: &str = "http://localhost/";

/// Shown when the connect link is missing one of its parameters.
pub const HANDSHAKE_ERROR_MESSAGE: &str = "Error: Missing token or service URL";

/// The three screens of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Root,
    Connect,
    Remote,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Connect => "/connect",
            Route::Remote => "/remote",
        }
    }
}

/// A path plus its decoded query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub path: String,
    pub query: HashMap<String, String>,
}

impl Location {
    /// Location of a route with an empty query.
    pub fn route(route: Route) -> Self {
        Self {
            path: route.path().to_owned(),
            query: HashMap::new(),
        }
    }

    /// Parse a full URL (`https://host/connect?token=..`) or a bare path
    /// with an optional query (`/connect?token=..`). Bare paths are resolved
    /// against a placeholder origin; only the path and query are kept.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        let input = input.trim();
        let url = match Url::parse(input) {
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(BARE_PATH_BASE)?.join(input)?
            }
            parsed => parsed?,
        };

        // First occurrence of a key wins.
        let mut query = HashMap::new();
        for (key, value) in url.query_pairs() {
            query
                .entry(key.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Ok(Self {
            path: url.path().to_owned(),
            query,
        })
    }

    /// A non-empty query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn is_remote(&self) -> bool {
        self.path.contains("/remote")
    }

    fn is_connect(&self) -> bool {
        self.path.contains("connect")
    }

    fn is_root(&self) -> bool {
        self.path == "/"
    }
}

/// Temporary credentials from the connect link, held until the exchange succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandshakeContext {
    pub token: String,
    pub service_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BootstrapState {
    /// No usable token; the user must go through the connect link.
    Unauthenticated,
    /// On the connect screen with both handshake parameters present.
    AwaitingHandshake { context: HandshakeContext },
    /// On the connect screen with a parameter missing. Blocks the screen.
    HandshakeError,
    /// A valid, unexpired token is stored.
    Authenticated,
}

/// Result of evaluating one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub state: BootstrapState,
    pub redirect: Option<Route>,
}

/// Decide the state for a load given token validity and the current location.
pub fn evaluate(token_valid: bool, location: &Location) -> Transition {
    if token_valid && !location.is_remote() {
        return Transition {
            state: BootstrapState::Authenticated,
            redirect: Some(Route::Remote),
        };
    }

    if !token_valid && location.is_connect() {
        let state = match (location.param("token"), location.param("serviceUrl")) {
            (Some(token), Some(service_url)) => BootstrapState::AwaitingHandshake {
                context: HandshakeContext {
                    token: token.to_owned(),
                    service_url: service_url.to_owned(),
                },
            },
            _ => BootstrapState::HandshakeError,
        };
        return Transition {
            state,
            redirect: None,
        };
    }

    if !token_valid || location.is_root() {
        return Transition {
            state: BootstrapState::Unauthenticated,
            redirect: Some(Route::Connect),
        };
    }

    Transition {
        state: BootstrapState::Authenticated,
        redirect: None,
    }
}

/// Stateful wrapper around [`evaluate`] for one client lifetime.
///
/// Once a handshake error has been seen it stays latched: the error keeps
/// blocking child content even if later navigations would evaluate cleanly.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    state: BootstrapState,
    error_latched: bool,
}

impl Default for Bootstrap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootstrap {
    pub fn new() -> Self {
        Self {
            state: BootstrapState::Unauthenticated,
            error_latched: false,
        }
    }

    /// Evaluate a navigation and record the resulting state.
    pub fn navigate(&mut self, token_valid: bool, location: &Location) -> Transition {
        let transition = evaluate(token_valid, location);
        if transition.state == BootstrapState::HandshakeError {
            self.error_latched = true;
        }
        log::debug!(
            "Bootstrap {} -> {:?} (redirect {:?})",
            location.path,
            transition.state,
            transition.redirect
        );
        self.state = transition.state.clone();
        transition
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    pub fn has_error(&self) -> bool {
        self.error_latched
    }

    /// Whether the current screen may render. False once the handshake error is latched.
    pub fn renders_children(&self) -> bool {
        !self.error_latched
    }

    /// The handshake context of the current connect screen, if any.
    pub fn handshake(&self) -> Option<&HandshakeContext> {
        match &self.state {
            BootstrapState::AwaitingHandshake { context } => Some(context),
            _ => None,
        }
    }
}

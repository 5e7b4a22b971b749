//! Launch credentials: parsing the process arguments and resolving them
//! against an [`Identity`] into what the validate call needs.
//!
//! The companion launches the game with arguments such as
//!
//! ```text
//! game.exe --token abc123 --user-id 42 --port 7423
//! game.exe --session-token=opaque
//! ```
//!
//! Both `--key value` and `--key=value` are accepted. Unknown keys and
//! positional arguments are ignored, since the game may have its own.
//! Parsing never fails: whether something is *missing* is only decided in
//! [`Credentials::resolve`], once the provider's requirements are known.

use std::collections::HashMap;
use std::fmt;

use lanyard_protocol::{CompanionEndpoint, ValidateRequest};
use lanyard_transport::CredentialRequirements;
use tracing::{debug, warn};

use crate::error::{CredentialField, SessionError};

// ---------------------------------------------------------------------------
// LaunchArgs
// ---------------------------------------------------------------------------

/// Raw `--key value` pairs read from the process arguments.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct LaunchArgs {
    values: HashMap<String, String>,
}

impl LaunchArgs {
    pub const TOKEN: &'static str = "token";
    pub const USER_ID: &'static str = "user-id";
    pub const PORT: &'static str = "port";
    pub const SESSION_TOKEN: &'static str = "session-token";

    /// Reads the current process arguments (skipping the program name).
    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    /// Parses an argument list. Keys are matched case-insensitively and a
    /// repeated key keeps its last value.
    pub fn parse<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut values = HashMap::new();
        let mut args = args.into_iter().peekable();

        while let Some(arg) = args.next() {
            let Some(flag) = arg.as_ref().strip_prefix("--") else {
                continue;
            };
            let (key, value) = match flag.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => {
                    let takes_next = args
                        .peek()
                        .is_some_and(|next| !next.as_ref().starts_with("--"));
                    let value = if takes_next {
                        args.next()
                            .map(|v| v.as_ref().to_string())
                            .unwrap_or_default()
                    } else {
                        String::new()
                    };
                    (flag.to_string(), value)
                }
            };
            let key = key.to_ascii_lowercase();
            if values.insert(key.clone(), value).is_some() {
                debug!(key = %key, "launch argument repeated, keeping the last value");
            }
        }

        Self { values }
    }

    /// The value for `key`, or `None` when absent or blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// The companion port. `Err` carries the raw value when it is present
    /// but not a valid non-zero port.
    pub fn port(&self) -> Result<Option<u16>, String> {
        match self.get(Self::PORT) {
            None => Ok(None),
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) if port != 0 => Ok(Some(port)),
                _ => Err(raw.to_string()),
            },
        }
    }
}

impl fmt::Debug for LaunchArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Token values are secrets; only the keys are printed.
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("LaunchArgs").field("keys", &keys).finish()
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Who is asking to be authenticated.
///
/// An application passes its id together with the token it was given; a
/// game that was launched by the companion passes only its game id and
/// the token is read from the launch arguments.
#[derive(Clone, PartialEq, Eq)]
pub enum Identity {
    Application { app_id: String, token: String },
    Game { game_id: String },
}

impl Identity {
    pub fn application(app_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::Application {
            app_id: app_id.into(),
            token: token.into(),
        }
    }

    pub fn game(game_id: impl Into<String>) -> Self {
        Self::Game {
            game_id: game_id.into(),
        }
    }

    fn subject(&self) -> &str {
        match self {
            Self::Application { app_id, .. } => app_id,
            Self::Game { game_id } => game_id,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Application { app_id, .. } => f
                .debug_struct("Application")
                .field("app_id", app_id)
                .field("token", &"<redacted>")
                .finish(),
            Self::Game { game_id } => {
                f.debug_struct("Game").field("game_id", game_id).finish()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Everything the validate call needs, read once and never changed.
#[derive(Clone)]
pub struct Credentials {
    pub identity: Identity,
    pub token: String,
    pub user_id: Option<String>,
    pub endpoint: Option<CompanionEndpoint>,
}

impl Credentials {
    /// Combines `identity` and `args` under `requirements`.
    ///
    /// Fails closed: every required field that is absent or blank is
    /// collected into one [`SessionError::MissingCredentials`], in the
    /// order token, user id, endpoint. A port that is present but not a
    /// number counts as a missing endpoint.
    pub fn resolve(
        identity: &Identity,
        args: &LaunchArgs,
        requirements: CredentialRequirements,
    ) -> Result<Self, SessionError> {
        let mut missing = Vec::new();

        if identity.subject().trim().is_empty() {
            missing.push(CredentialField::Subject);
        }

        let token = match identity {
            Identity::Application { token, .. } => {
                Some(token.trim()).filter(|t| !t.is_empty())
            }
            Identity::Game { .. } => match requirements {
                CredentialRequirements::SessionToken => {
                    args.get(LaunchArgs::SESSION_TOKEN)
                }
                CredentialRequirements::TokenUserEndpoint => {
                    args.get(LaunchArgs::TOKEN)
                }
            },
        };
        if token.is_none() {
            missing.push(CredentialField::Token);
        }

        let user_id = args.get(LaunchArgs::USER_ID).map(str::to_string);
        if requirements.needs_user_id() && user_id.is_none() {
            missing.push(CredentialField::UserId);
        }

        let endpoint = match args.port() {
            Ok(port) => port.map(CompanionEndpoint::loopback),
            Err(raw) => {
                warn!(value = %raw, "ignoring unparsable companion port");
                None
            }
        };
        if requirements.needs_endpoint() && endpoint.is_none() {
            missing.push(CredentialField::Endpoint);
        }

        match token {
            Some(token) if missing.is_empty() => Ok(Self {
                identity: identity.clone(),
                token: token.to_string(),
                user_id,
                endpoint,
            }),
            _ => Err(SessionError::MissingCredentials(missing)),
        }
    }

    /// The body of the validate call.
    pub fn request(&self) -> ValidateRequest {
        let (app_id, game_id) = match &self.identity {
            Identity::Application { app_id, .. } => (Some(app_id.clone()), None),
            Identity::Game { game_id } => (None, Some(game_id.clone())),
        };
        ValidateRequest {
            token: self.token.clone(),
            user_id: self.user_id.clone(),
            app_id,
            game_id,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identity", &self.identity)
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

//! Core protocol types for Lanyard's wire format.
//!
//! Every type in this module is a request or response body exchanged with
//! the companion application. Field names follow the companion's JSON
//! conventions (`camelCase`), which is why most structs carry
//! `#[serde(rename_all = "camelCase")]`.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Host the companion listens on when the launch arguments only carry a port.
pub const DEFAULT_COMPANION_HOST: &str = "127.0.0.1";

// ---------------------------------------------------------------------------
// Companion endpoint
// ---------------------------------------------------------------------------

/// Where the companion application can be reached.
///
/// Not a wire type itself. It is parsed from the launch arguments and
/// tells the HTTP transport which loopback port to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompanionEndpoint {
    pub host: String,
    pub port: u16,
}

impl CompanionEndpoint {
    /// An endpoint on [`DEFAULT_COMPANION_HOST`].
    pub fn loopback(port: u16) -> Self {
        Self {
            host: DEFAULT_COMPANION_HOST.to_string(),
            port,
        }
    }

    /// `http://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for CompanionEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Session validation
// ---------------------------------------------------------------------------

/// Body of the validate call.
///
/// Exactly one of `app_id` / `game_id` is set, depending on which
/// identity the game initialized with. `user_id` is only sent by
/// transports that require it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
}

/// Successful answer to a validate call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReply {
    pub game_id: String,
    pub user_id: String,
}

impl ValidateReply {
    /// Rejects replies that decoded but carry no usable identity.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] naming the empty field.
    pub fn check(&self) -> Result<(), ProtocolError> {
        if self.game_id.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "validate reply has an empty gameId".into(),
            ));
        }
        if self.user_id.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "validate reply has an empty userId".into(),
            ));
        }
        Ok(())
    }
}

/// Answer to a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReply {
    pub alive: bool,
}

/// The signed-in companion user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Fire-and-forget messages sent to the companion. The sender never
/// learns whether they arrived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// The game shut its session down deliberately.
    #[serde(rename_all = "camelCase")]
    SessionEnded { game_id: String },
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Whether a stat holds an integer or a float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Int,
    Float,
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
        }
    }
}

/// A stat value together with its kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Int(i64),
    Float(f64),
}

impl StatValue {
    pub fn kind(&self) -> StatKind {
        match self {
            Self::Int(_) => StatKind::Int,
            Self::Float(_) => StatKind::Float,
        }
    }
}

/// One stat as it travels on the wire.
///
/// Internally tagged: `{"kind":"int","id":"kills","value":5}`. A float
/// stat may arrive with an integral JSON number (`"value": 2`); serde
/// widens it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StatRecord {
    Int { id: String, value: i64 },
    Float { id: String, value: f64 },
}

impl StatRecord {
    pub fn new(id: impl Into<String>, value: StatValue) -> Self {
        let id = id.into();
        match value {
            StatValue::Int(value) => Self::Int { id, value },
            StatValue::Float(value) => Self::Float { id, value },
        }
    }

    pub fn int(id: impl Into<String>, value: i64) -> Self {
        Self::new(id, StatValue::Int(value))
    }

    pub fn float(id: impl Into<String>, value: f64) -> Self {
        Self::new(id, StatValue::Float(value))
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Int { id, .. } | Self::Float { id, .. } => id,
        }
    }

    pub fn value(&self) -> StatValue {
        match self {
            Self::Int { value, .. } => StatValue::Int(*value),
            Self::Float { value, .. } => StatValue::Float(*value),
        }
    }

    pub fn kind(&self) -> StatKind {
        self.value().kind()
    }
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

/// One achievement as listed by the companion.
///
/// Only `id` is mandatory; the companion omits presentation fields for
/// achievements it has no metadata for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub unlocked: bool,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlocked_at: Option<u64>,
    /// `0.0..1.0`; never `1.0` (a complete achievement is `unlocked`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

impl AchievementRecord {
    /// A bare record for an id with no listed metadata, unlocked now.
    pub fn unlocked_now(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            icon: String::new(),
            unlocked: true,
            unlocked_at: Some(unix_now()),
            progress: None,
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

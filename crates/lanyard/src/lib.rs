//! # Lanyard
//!
//! Companion-issued sessions for launched games.
//!
//! A game launched by the companion desktop application receives a token
//! on its command line. Lanyard validates that token, keeps checking that
//! the companion is still there, ends the process when either fails, and
//! syncs the user's stats and achievements through a local cache.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lanyard::prelude::*;
//!
//! # async fn run() -> Result<(), LanyardError> {
//! lanyard::init_tracing();
//!
//! let lanyard = Lanyard::builder().build_http(HttpConfig::default(), ProcessHost)?;
//! lanyard.authenticate(Identity::game("my-game")).await?;
//!
//! lanyard.stats().request_stats().await?;
//! let kills = lanyard.stats().get_int("kills")?;
//! lanyard.stats().set_int("kills", kills + 1)?;
//! lanyard.stats().store_stats().await?;
//!
//! lanyard.achievements().unlock("first_blood").await?;
//! lanyard.shutdown();
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod logging;

pub use client::{Lanyard, LanyardBuilder};
pub use error::LanyardError;
pub use logging::{init_tracing, init_tracing_with, DEFAULT_FILTER};

pub use lanyard_heartbeat as heartbeat;
pub use lanyard_protocol as protocol;
pub use lanyard_session as session;
pub use lanyard_sync as sync;
pub use lanyard_transport as transport;

pub mod prelude {
    pub use crate::{Lanyard, LanyardBuilder, LanyardError};
    pub use lanyard_heartbeat::HeartbeatConfig;
    pub use lanyard_protocol::{AchievementRecord, CompanionEndpoint, StatKind, StatValue, UserInfo};
    pub use lanyard_session::{
        Event, ExitReason, Host, Identity, LaunchArgs, ProcessHost, SessionConfig, SessionError,
        SessionState,
    };
    pub use lanyard_sync::{AchievementCache, StatCache, StatEntry, SyncConfig, SyncError};
    pub use lanyard_transport::{
        CredentialRequirements, HttpConfig, HttpProvider, RemoteSessionProvider, TransportError,
    };
}

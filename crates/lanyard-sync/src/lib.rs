//! Stat and achievement caches for Lanyard.
//!
//! Both caches follow the same pattern: a remote call gated on the session
//! being authenticated, a local map behind a mutex, and events on the
//! session's [`EventBus`](lanyard_session::EventBus).
//!
//! - [`StatCache`]: bulk load, local get/set with dirty tracking, flush
//! - [`AchievementCache`]: unlock, progress, full-replace listing
//!
//! A completion that arrives after the session stopped being authenticated
//! (shutdown, lost companion) changes nothing and reports
//! [`SyncError::NotAuthenticated`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Facade (above)           ← Lanyard owns one of each cache
//!     ↕
//! Sync Layer (this crate)
//!     ↕
//! Session Layer (below)    ← is_authenticated, events, provider
//! ```

mod achievements;
mod config;
mod error;
mod stats;

pub use achievements::AchievementCache;
pub use config::SyncConfig;
pub use error::SyncError;
pub use stats::{StatCache, StatEntry};

//! Wire protocol between a launched game and the Lanyard companion
//! application.
//!
//! This crate defines the "language" both sides speak:
//!
//! - **Types** ([`ValidateRequest`], [`StatRecord`], [`AchievementRecord`],
//!   etc.): the request and response bodies exchanged with the companion.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those bodies are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about sockets or session state. It
//! only describes the shape of data on the wire:
//!
//! ```text
//! Session / Sync (state) → Transport (requests) → Protocol (bodies, bytes)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AchievementRecord, CompanionEndpoint, HealthReply, Notification,
    StatKind, StatRecord, StatValue, UserInfo, ValidateReply,
    ValidateRequest, DEFAULT_COMPANION_HOST,
};

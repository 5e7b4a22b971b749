//! Session lifecycle for Lanyard.
//!
//! This crate decides whether the process is allowed to keep running:
//!
//! 1. **Credentials**: reading the launch arguments the companion passed
//!    ([`LaunchArgs`]) and combining them with who is asking
//!    ([`Identity`]) into [`Credentials`]
//! 2. **Validation**: one validate call against the companion, bounded by
//!    a timeout ([`SessionLifecycle::init`])
//! 3. **Liveness**: a heartbeat-driven monitor that ends the process the
//!    first time the companion stops answering
//! 4. **Events**: everything observable goes out on one broadcast
//!    [`EventBus`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Sync Layer (above)       ← stat and achievement caches gated on the session
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Transport Layer (below)  ← RemoteSessionProvider
//! ```

mod credentials;
mod error;
mod events;
mod host;
mod lifecycle;
mod session;

pub use credentials::{Credentials, Identity, LaunchArgs};
pub use error::{CredentialField, SessionError};
pub use events::{Event, EventBus};
pub use host::{ExitReason, Host, ProcessHost};
pub use lifecycle::{SessionLifecycle, SessionLifecycleBuilder};
pub use session::{Session, SessionConfig, SessionState};

//! Shared fixtures for the cache tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use lanyard_session::{
    Event, ExitReason, Host, Identity, LaunchArgs, SessionLifecycle,
    SessionLifecycleBuilder, SessionState,
};
use lanyard_transport::mock::MockProvider;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;

/// A host that records termination requests instead of exiting.
#[derive(Clone, Default)]
pub struct QuietHost {
    pub exits: Arc<Mutex<Vec<ExitReason>>>,
}

impl Host for QuietHost {
    fn terminate(&self, _code: i32, reason: &ExitReason) {
        self.exits.lock().unwrap().push(reason.clone());
    }
}

/// A session that has not been initialised.
pub fn unauthenticated(provider: MockProvider) -> SessionLifecycle<MockProvider> {
    SessionLifecycleBuilder::new()
        .args(LaunchArgs::parse(["--token=tok", "--user-id=u1", "--port=7423"]))
        .build(provider, QuietHost::default())
}

/// A session that validated as game `g1`, user `u1`.
pub async fn authenticated(provider: MockProvider) -> SessionLifecycle<MockProvider> {
    let session = unauthenticated(provider);
    assert!(session.init(Identity::game("g1")));
    assert_eq!(session.settled().await, SessionState::Authenticated);
    session
}

/// Every event currently buffered for `rx`.
pub fn drain(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty) => return events,
            Err(other) => panic!("unexpected receive error: {other:?}"),
        }
    }
}

//! Integration tests for the `Lanyard` facade: the full flow a game goes
//! through, from launch arguments to shutdown, over a scripted provider.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use lanyard::prelude::*;
use lanyard::protocol::{Notification, StatRecord};
use lanyard::transport::mock::{MockOp, MockProvider, Probe};
use tokio::time;

// =========================================================================
// Helpers
// =========================================================================

#[derive(Clone, Default)]
struct RecordingHost {
    exits: Arc<Mutex<Vec<(i32, ExitReason)>>>,
}

impl RecordingHost {
    fn exits(&self) -> Vec<(i32, ExitReason)> {
        self.exits.lock().unwrap().clone()
    }
}

impl Host for RecordingHost {
    fn terminate(&self, code: i32, reason: &ExitReason) {
        self.exits.lock().unwrap().push((code, reason.clone()));
    }
}

fn launch() -> LaunchArgs {
    LaunchArgs::parse([
        "game.exe",
        "--token=launch-token",
        "--user-id",
        "u1",
        "--port",
        "7423",
    ])
}

fn client(provider: MockProvider, host: &RecordingHost) -> Lanyard<MockProvider> {
    LanyardBuilder::new()
        .args(launch())
        .session_config(SessionConfig {
            liveness: HeartbeatConfig::with_interval(
                Duration::from_secs(30),
                Duration::from_secs(5),
            ),
            exit_code: 3,
            ..SessionConfig::default()
        })
        .build(provider, host.clone())
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_full_session_flow() {
    let host = RecordingHost::default();
    let provider = MockProvider::accepting("g1", "u1");
    provider.set_stats(vec![StatRecord::int("kills", 5)]);
    let lanyard = client(provider, &host);
    let mut events = lanyard.subscribe();

    lanyard.authenticate(Identity::game("g1")).await.unwrap();
    assert_eq!(lanyard.game_id().as_deref(), Some("g1"));
    assert_eq!(lanyard.user_info().await.unwrap().id, "u1");

    lanyard.stats().request_stats().await.unwrap();
    let kills = lanyard.stats().get_int("kills").unwrap();
    lanyard.stats().set_int("kills", kills + 1).unwrap();
    lanyard.stats().store_stats().await.unwrap();
    lanyard.achievements().set_progress("first_blood", 1.0).await.unwrap();

    lanyard.shutdown();

    let provider = lanyard.session().provider();
    assert_eq!(provider.stored(), vec![vec![StatRecord::int("kills", 6)]]);
    assert_eq!(provider.unlocked(), vec!["first_blood"]);
    assert_eq!(
        provider.notifications(),
        vec![Notification::SessionEnded {
            game_id: "g1".into()
        }]
    );
    assert!(host.exits().is_empty());

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            Event::AuthenticationComplete { success: true },
            Event::StatsReceived,
            Event::StatsStored,
            Event::AchievementUnlocked {
                id: "first_blood".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_authenticate_rejected_reports_reason_and_exits() {
    let host = RecordingHost::default();
    let lanyard = client(MockProvider::rejecting("token revoked"), &host);

    let err = lanyard
        .authenticate(Identity::game("g1"))
        .await
        .unwrap_err();

    match err {
        LanyardError::NotAuthenticated { state, message } => {
            assert_eq!(state, SessionState::Failed);
            assert!(message.contains("token revoked"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    time::sleep(Duration::from_secs(2)).await;
    let exits = host.exits();
    assert_eq!(exits.len(), 1);
    assert_eq!(exits[0].0, 3);
}

#[tokio::test(start_paused = true)]
async fn test_cache_calls_fail_after_companion_is_lost() {
    let host = RecordingHost::default();
    let provider = MockProvider::accepting("g1", "u1");
    provider.script_probe(1, Probe::NotAlive);
    let lanyard = client(provider, &host);
    lanyard.authenticate(Identity::game("g1")).await.unwrap();

    time::sleep(Duration::from_secs(31)).await;

    assert_eq!(lanyard.state(), SessionState::Disconnected);
    assert!(matches!(
        lanyard.achievements().unlock("a").await,
        Err(SyncError::NotAuthenticated)
    ));
    assert_eq!(lanyard.session().provider().calls(MockOp::Unlock), 0);
    assert!(matches!(
        host.exits().as_slice(),
        [(3, ExitReason::CompanionDisconnected(_))]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_clones_share_session_and_caches() {
    let host = RecordingHost::default();
    let lanyard = client(MockProvider::accepting("g1", "u1"), &host);
    let other = lanyard.clone();

    lanyard.authenticate(Identity::game("g1")).await.unwrap();
    other.achievements().unlock("a").await.unwrap();

    assert!(other.is_authenticated());
    assert!(lanyard.achievements().is_unlocked("a"));
}

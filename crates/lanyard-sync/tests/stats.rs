//! Integration tests for the stat cache against a scripted provider.

mod common;

use std::time::Duration;

use lanyard_protocol::{StatKind, StatRecord};
use lanyard_session::Event;
use lanyard_sync::{StatCache, SyncConfig, SyncError};
use lanyard_transport::mock::{MockOp, MockProvider};
use lanyard_transport::TransportError;
use tokio::time;

use common::{authenticated, drain, unauthenticated};

fn provider_with_stats() -> MockProvider {
    let provider = MockProvider::accepting("g1", "u1");
    provider.set_stats(vec![
        StatRecord::int("kills", 5),
        StatRecord::float("accuracy", 0.5),
    ]);
    provider
}

async fn loaded_cache() -> StatCache<MockProvider> {
    let session = authenticated(provider_with_stats()).await;
    let cache = StatCache::new(session, SyncConfig::default());
    cache.request_stats().await.unwrap();
    cache
}

// =========================================================================
// Loading
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_get_and_set_before_load_is_cache_not_loaded() {
    let session = authenticated(provider_with_stats()).await;
    let cache = StatCache::new(session, SyncConfig::default());

    assert!(!cache.is_loaded());
    assert!(matches!(cache.get_int("kills"), Err(SyncError::CacheNotLoaded)));
    assert!(matches!(cache.set_int("kills", 1), Err(SyncError::CacheNotLoaded)));
    assert!(matches!(
        cache.store_stats().await,
        Err(SyncError::CacheNotLoaded)
    ));
    assert_eq!(provider(&cache).calls(MockOp::StoreStats), 0);
}

#[tokio::test(start_paused = true)]
async fn test_request_stats_loads_values_and_fires_event() {
    let session = authenticated(provider_with_stats()).await;
    let mut rx = session.subscribe();
    let cache = StatCache::new(session, SyncConfig::default());

    assert_eq!(cache.request_stats().await.unwrap(), 2);

    assert!(cache.is_loaded());
    assert_eq!(cache.get_int("kills").unwrap(), 5);
    assert_eq!(cache.get_float("accuracy").unwrap(), 0.5);
    assert!(cache.dirty_ids().is_empty());
    assert_eq!(drain(&mut rx), vec![Event::StatsReceived]);
}

#[tokio::test(start_paused = true)]
async fn test_request_failure_leaves_cache_untouched() {
    let cache = loaded_cache().await;
    cache.set_int("kills", 6).unwrap();
    let mut rx = cache_session_events(&cache);
    provider(&cache).fail_stats("backend down");

    let result = cache.request_stats().await;

    assert!(matches!(result, Err(SyncError::Transport(_))));
    assert_eq!(cache.get_int("kills").unwrap(), 6);
    assert_eq!(cache.dirty_ids(), vec!["kills"]);
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_request_replaces_previous_entries() {
    let cache = loaded_cache().await;
    provider(&cache).set_stats(vec![StatRecord::int("deaths", 2)]);

    cache.request_stats().await.unwrap();

    assert!(matches!(
        cache.get_int("kills"),
        Err(SyncError::UnknownStat(id)) if id == "kills"
    ));
    assert_eq!(cache.get_int("deaths").unwrap(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_request_without_session_makes_no_call() {
    let session = unauthenticated(provider_with_stats());
    let cache = StatCache::new(session.clone(), SyncConfig::default());

    assert!(matches!(
        cache.request_stats().await,
        Err(SyncError::NotAuthenticated)
    ));
    assert_eq!(session.provider().calls(MockOp::RequestStats), 0);
}

// =========================================================================
// Local reads and writes
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_wrong_kind_and_unknown_id_fail_without_coercion() {
    let cache = loaded_cache().await;

    match cache.get_float("kills") {
        Err(SyncError::WrongKind { id, expected, actual }) => {
            assert_eq!(id, "kills");
            assert_eq!(expected, StatKind::Float);
            assert_eq!(actual, StatKind::Int);
        }
        other => panic!("expected wrong kind, got {other:?}"),
    }
    assert!(matches!(
        cache.set_int("accuracy", 1),
        Err(SyncError::WrongKind { .. })
    ));
    assert!(matches!(
        cache.set_int("headshots", 1),
        Err(SyncError::UnknownStat(_))
    ));
    assert_eq!(cache.get_float("accuracy").unwrap(), 0.5);
    assert!(cache.dirty_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_set_marks_dirty_without_remote_call() {
    let cache = loaded_cache().await;
    let before = provider(&cache).total_calls();

    cache.set_int("kills", 6).unwrap();
    cache.set_float("accuracy", 0.75).unwrap();

    assert_eq!(cache.get_int("kills").unwrap(), 6);
    assert_eq!(cache.dirty_ids(), vec!["accuracy", "kills"]);
    assert_eq!(provider(&cache).total_calls(), before);
}

#[tokio::test(start_paused = true)]
async fn test_reset_forgets_entries_and_loaded_flag() {
    let cache = loaded_cache().await;

    cache.reset();

    assert!(!cache.is_loaded());
    assert!(cache.entries().is_empty());
    assert!(matches!(cache.get_int("kills"), Err(SyncError::CacheNotLoaded)));
}

// =========================================================================
// Storing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_store_success_clears_dirty_and_sends_every_entry() {
    let cache = loaded_cache().await;
    let mut rx = cache_session_events(&cache);
    cache.set_int("kills", 6).unwrap();

    cache.store_stats().await.unwrap();

    assert!(cache.dirty_ids().is_empty());
    assert!(!cache.entry("kills").unwrap().dirty);
    assert_eq!(drain(&mut rx), vec![Event::StatsStored]);

    let mut sent = provider(&cache).stored().pop().unwrap();
    sent.sort_by(|a, b| a.id().cmp(b.id()));
    assert_eq!(
        sent,
        vec![StatRecord::float("accuracy", 0.5), StatRecord::int("kills", 6)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_store_failure_keeps_dirty_and_fires_failed() {
    let cache = loaded_cache().await;
    let mut rx = cache_session_events(&cache);
    cache.set_int("kills", 6).unwrap();
    provider(&cache).fail_store(Some("disk full"));

    let result = cache.store_stats().await;

    assert!(matches!(result, Err(SyncError::Transport(_))));
    assert_eq!(cache.dirty_ids(), vec!["kills"]);
    match drain(&mut rx).as_slice() {
        [Event::StatsStoreFailed { message }] => {
            assert!(message.contains("disk full"), "got: {message}");
        }
        other => panic!("expected one StatsStoreFailed, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_set_during_inflight_store_stays_dirty() {
    let cache = loaded_cache().await;
    cache.set_int("kills", 6).unwrap();
    provider(&cache).delay_ops(Duration::from_secs(1));

    let (stored, set) = tokio::join!(cache.store_stats(), async {
        time::sleep(Duration::from_millis(500)).await;
        cache.set_int("kills", 7)
    });

    stored.unwrap();
    set.unwrap();
    assert_eq!(cache.dirty_ids(), vec!["kills"]);
    assert_eq!(cache.get_int("kills").unwrap(), 7);
    assert!(provider(&cache).stored()[0].contains(&StatRecord::int("kills", 6)));
}

#[tokio::test(start_paused = true)]
async fn test_store_times_out_with_configured_limit() {
    let session = authenticated(provider_with_stats()).await;
    let cache = StatCache::new(
        session,
        SyncConfig {
            request_timeout: Duration::from_secs(2),
        },
    );
    cache.request_stats().await.unwrap();
    provider(&cache).delay_ops(Duration::from_secs(5));

    let result = cache.store_stats().await;

    assert!(matches!(
        result,
        Err(SyncError::Transport(TransportError::Timeout(d))) if d == Duration::from_secs(2)
    ));
}

// =========================================================================
// Shutdown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_request_completing_after_shutdown_is_dropped() {
    let session = authenticated(provider_with_stats()).await;
    let mut rx = session.subscribe();
    session.provider().delay_ops(Duration::from_secs(1));
    let cache = StatCache::new(session.clone(), SyncConfig::default());

    let (result, ()) = tokio::join!(cache.request_stats(), async {
        time::sleep(Duration::from_millis(500)).await;
        session.shutdown();
    });

    assert!(matches!(result, Err(SyncError::NotAuthenticated)));
    assert!(!cache.is_loaded());
    assert!(drain(&mut rx).is_empty());
}

// =========================================================================
// Helpers
// =========================================================================

fn provider(cache: &StatCache<MockProvider>) -> &MockProvider {
    cache.session().provider()
}

fn cache_session_events(
    cache: &StatCache<MockProvider>,
) -> tokio::sync::broadcast::Receiver<Event> {
    cache.session().subscribe()
}

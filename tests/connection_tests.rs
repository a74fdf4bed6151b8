// Push-channel state machine, retry timer and URL derivation tests

use dashsync::config::ConnectionConfig;
use dashsync::connection::{
    ConnectionManager, ConnectionSignal, ConnectionState, Effect, ReconnectPolicy, RetryTimer,
    push_url,
};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

fn scheduled_delay(effects: &[Effect]) -> Option<Duration> {
    effects.iter().find_map(|e| match e {
        Effect::ScheduleRetry { delay, .. } => Some(*delay),
        _ => None,
    })
}

fn fail_current(manager: &mut ConnectionManager) -> Vec<Effect> {
    let generation = manager.generation();
    manager.on_closed(generation)
}

#[test]
fn test_connect_from_idle_opens_channel() {
    let mut manager = ConnectionManager::default();
    assert_eq!(manager.state(), ConnectionState::Idle);
    let before = manager.generation();

    let effects = manager.connect();

    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert_ne!(manager.generation(), before);
    assert_eq!(
        effects,
        vec![Effect::OpenChannel {
            generation: manager.generation()
        }]
    );
}

#[test]
fn test_open_notifies_connected_and_resets_attempts() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    fail_current(&mut manager);
    let g = manager.generation();
    manager.on_retry_due(g);
    assert_eq!(manager.attempts(), 1);

    let effects = manager.on_open(manager.generation());

    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(manager.attempts(), 0);
    assert_eq!(effects, vec![Effect::Notify(ConnectionSignal::Connected)]);
    assert!(manager.accepts_frame(manager.generation()));
}

#[test]
fn test_backoff_doubles_then_gives_up() {
    let mut manager = ConnectionManager::default();
    manager.connect();

    let mut delays = Vec::new();
    for _ in 0..5 {
        let effects = fail_current(&mut manager);
        assert_eq!(manager.state(), ConnectionState::Retrying);
        assert!(effects.contains(&Effect::Notify(ConnectionSignal::Disconnected)));
        delays.push(scheduled_delay(&effects).unwrap().as_millis());
        let g = manager.generation();
        let reopen = manager.on_retry_due(g);
        assert!(matches!(reopen.as_slice(), [Effect::OpenChannel { .. }]));
    }
    assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000]);

    // sixth consecutive failure
    let effects = fail_current(&mut manager);
    assert_eq!(manager.state(), ConnectionState::GivenUp);
    assert_eq!(effects, vec![Effect::Notify(ConnectionSignal::GivenUp)]);
    assert_eq!(scheduled_delay(&effects), None);
}

#[test]
fn test_successful_open_restarts_backoff_sequence() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    fail_current(&mut manager);
    let g = manager.generation();
    manager.on_retry_due(g);
    fail_current(&mut manager);
    let g = manager.generation();
    manager.on_retry_due(g);
    manager.on_open(manager.generation());

    let effects = fail_current(&mut manager);
    assert_eq!(scheduled_delay(&effects), Some(Duration::from_millis(1000)));
}

#[test]
fn test_teardown_invalidates_pending_retry() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    let effects = fail_current(&mut manager);
    let armed = effects
        .iter()
        .find_map(|e| match e {
            Effect::ScheduleRetry { generation, .. } => Some(*generation),
            _ => None,
        })
        .unwrap();

    let effects = manager.teardown();
    assert_eq!(effects, vec![Effect::CancelRetry, Effect::CloseChannel]);
    assert_eq!(manager.state(), ConnectionState::Idle);

    // timer that was already in flight fires anyway
    let late = manager.on_retry_due(armed);
    assert!(late.is_empty());
    assert_eq!(manager.state(), ConnectionState::Idle);
}

#[test]
fn test_stale_socket_events_are_ignored() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    let old = manager.generation();
    fail_current(&mut manager);
    let g = manager.generation();
    manager.on_retry_due(g);
    assert_ne!(manager.generation(), old);

    assert!(manager.on_open(old).is_empty());
    assert!(manager.on_closed(old).is_empty());
    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert!(!manager.accepts_frame(old));
}

#[test]
fn test_frames_rejected_unless_open() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    assert!(!manager.accepts_frame(manager.generation()));
}

#[test]
fn test_manual_connect_after_give_up_resets_budget() {
    let policy = ReconnectPolicy {
        max_attempts: 1,
        base_delay: Duration::from_millis(10),
    };
    let mut manager = ConnectionManager::new(policy);
    manager.connect();
    fail_current(&mut manager);
    let g = manager.generation();
    manager.on_retry_due(g);
    fail_current(&mut manager);
    assert_eq!(manager.state(), ConnectionState::GivenUp);

    let effects = manager.connect();
    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert_eq!(manager.attempts(), 0);
    assert!(matches!(effects.as_slice(), [Effect::OpenChannel { .. }]));
}

#[test]
fn test_connect_ignored_while_active() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    let g = manager.generation();
    assert!(manager.connect().is_empty());
    assert_eq!(manager.generation(), g);
}

#[test]
fn test_policy_from_config() {
    let config = ConnectionConfig {
        max_attempts: 3,
        base_delay_ms: 250,
        connect_timeout_ms: 1000,
    };
    let policy = ReconnectPolicy::from_config(&config);
    assert_eq!(policy.delay_for(0), Some(Duration::from_millis(250)));
    assert_eq!(policy.delay_for(2), Some(Duration::from_millis(1000)));
    assert_eq!(policy.delay_for(3), None);
}

#[test]
fn test_push_url_maps_scheme_and_path() {
    let http = Url::parse("http://dash.local:8000/ui?tab=1").unwrap();
    assert_eq!(push_url(&http).unwrap().as_str(), "ws://dash.local:8000/api/ws");
    let https = Url::parse("https://dash.example.com").unwrap();
    assert_eq!(push_url(&https).unwrap().as_str(), "wss://dash.example.com/api/ws");
    let ftp = Url::parse("ftp://dash.local").unwrap();
    assert!(push_url(&ftp).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_retry_timer_fires_after_delay() {
    let mut manager = ConnectionManager::default();
    manager.connect();
    let generation = manager.generation();
    let (tx, mut rx) = mpsc::channel(4);
    let mut timer = RetryTimer::new();

    timer.schedule(generation, Duration::from_secs(2), tx, generation);
    assert_eq!(timer.pending_generation(), Some(generation));
    // let the timer task register its sleep
    tokio::task::yield_now().await;

    tokio::time::advance(Duration::from_millis(1999)).await;
    assert!(rx.try_recv().is_err());

    tokio::time::advance(Duration::from_millis(2)).await;
    assert_eq!(rx.recv().await, Some(generation));
}

#[tokio::test(start_paused = true)]
async fn test_retry_timer_cancel_suppresses_event() {
    let (tx, mut rx) = mpsc::channel::<u32>(4);
    let mut timer = RetryTimer::new();
    timer.schedule(Default::default(), Duration::from_secs(1), tx, 7);
    assert!(timer.cancel());
    assert!(!timer.cancel());

    tokio::time::advance(Duration::from_secs(5)).await;
    // sender was dropped with the aborted task
    assert_eq!(rx.recv().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_retry_timer_reschedule_replaces_previous() {
    let (tx, mut rx) = mpsc::channel::<u32>(4);
    let mut timer = RetryTimer::new();
    timer.schedule(Default::default(), Duration::from_secs(1), tx.clone(), 1);
    timer.schedule(Default::default(), Duration::from_secs(3), tx, 2);

    tokio::time::advance(Duration::from_secs(4)).await;
    assert_eq!(rx.recv().await, Some(2));
    assert!(rx.try_recv().is_err());
}

// Display target resolution tests

mod common;

use common::*;
use dashsync::aggregator::{DashboardState, Message, Source};
use dashsync::models::ClientStatus;
use dashsync::selector::{DisplayTarget, SourceSelector};

fn state_with_clients() -> DashboardState {
    let mut state = DashboardState::new(10);
    state.apply(
        Message::SystemSnapshot(minimal_snapshot("local-box")),
        Source::Pull,
    );
    state.apply(
        Message::Directory(vec![
            remote("on", ClientStatus::Online),
            remote("off", ClientStatus::Offline),
        ]),
        Source::Pull,
    );
    state
}

#[test]
fn test_local_target_resolves_to_local_snapshot() {
    let state = state_with_clients();
    let selector = SourceSelector::new();
    let resolved = selector.resolve(&state);
    assert!(resolved.is_local);
    assert!(resolved.client.is_none());
    assert_eq!(resolved.snapshot.unwrap().hostname, "local-box");
}

#[test]
fn test_remote_without_metrics_falls_back_to_local() {
    let state = state_with_clients();
    let mut selector = SourceSelector::new();
    selector.select(DisplayTarget::Remote("on".into()));

    let resolved = selector.resolve(&state);
    assert!(!resolved.is_local);
    assert!(resolved.snapshot.is_none());
    assert_eq!(resolved.client.unwrap().server_id, "on");
    assert_eq!(
        selector.display_snapshot(&state).unwrap().hostname,
        "local-box"
    );
}

#[test]
fn test_remote_with_metrics_shows_remote_snapshot() {
    let mut state = state_with_clients();
    state.apply(
        Message::ClientPatch {
            server_id: "on".into(),
            metrics: minimal_snapshot("far-away"),
        },
        Source::Push,
    );
    let mut selector = SourceSelector::new();
    selector.select(DisplayTarget::Remote("on".into()));
    assert_eq!(
        selector.display_snapshot(&state).unwrap().hostname,
        "far-away"
    );
}

#[test]
fn test_unknown_remote_resolves_to_nothing() {
    let state = state_with_clients();
    let mut selector = SourceSelector::new();
    selector.select(DisplayTarget::Remote("missing".into()));
    let resolved = selector.resolve(&state);
    assert!(resolved.client.is_none());
    assert!(resolved.snapshot.is_none());
    assert_eq!(selector.target(), &DisplayTarget::Remote("missing".into()));
}

#[test]
fn test_only_online_clients_are_selectable() {
    let state = state_with_clients();
    assert!(SourceSelector::can_select(&state, &DisplayTarget::Local));
    assert!(SourceSelector::can_select(
        &state,
        &DisplayTarget::Remote("on".into())
    ));
    assert!(!SourceSelector::can_select(
        &state,
        &DisplayTarget::Remote("off".into())
    ));
    assert!(!SourceSelector::can_select(
        &state,
        &DisplayTarget::Remote("missing".into())
    ));
}

// ABOUTME: Integration tests for the state observer.
// ABOUTME: Verifies tag matching, status normalization, and the live/terminated precedence rules.

mod support;

use std::collections::BTreeMap;
use support::fake_gateway::FakeGateway;
use support::{fast_retry, name};
use vs::machine::{CanonicalState, ReconcileErrorKind, StateObserver};
use vs::provider::NAME_TAG;

fn observer(gateway: &FakeGateway) -> StateObserver<'_, FakeGateway> {
    StateObserver::new(gateway, fast_retry(2))
}

#[tokio::test]
async fn no_match_is_absent() {
    let gateway = FakeGateway::new().with_instance("web2", &["running"]);

    let machine = observer(&gateway).observe(&name("web1")).await.unwrap();

    assert_eq!(machine.state, CanonicalState::Absent);
    assert_eq!(machine.instance_id, None);
    assert_eq!(machine.address, None);
}

#[tokio::test]
async fn provider_statuses_are_normalized() {
    let cases = [
        ("initializing", CanonicalState::Pending),
        ("starting", CanonicalState::Pending),
        ("running", CanonicalState::Running),
        ("stopping", CanonicalState::Stopping),
        ("off", CanonicalState::Stopped),
        ("stopped", CanonicalState::Stopped),
        ("deleting", CanonicalState::Terminated),
        ("terminated", CanonicalState::Terminated),
    ];

    for (status, expected) in cases {
        let gateway = FakeGateway::new().with_instance("web1", &[status]);
        let machine = observer(&gateway).observe(&name("web1")).await.unwrap();
        assert_eq!(machine.state, expected, "{status}");
        assert!(machine.instance_id.is_some());
    }
}

#[tokio::test]
async fn attributes_come_from_the_matching_instance() {
    let gateway = FakeGateway::new();
    let id = gateway.add_instance("web1", &["running"]);

    let machine = observer(&gateway).observe(&name("web1")).await.unwrap();

    assert_eq!(machine.instance_id, Some(id));
    assert_eq!(machine.instance_type.as_deref(), Some("cx22"));
    assert!(machine.address.is_some());
    assert_eq!(machine.tags[NAME_TAG], "web1");
}

#[tokio::test]
async fn loosely_matched_records_are_discarded() {
    let gateway = FakeGateway::new()
        .with_instance("web10", &["running"])
        .with_instance("web1", &["off"]);
    gateway.ignore_filter();

    let mut untagged = BTreeMap::new();
    untagged.insert("team".to_string(), "infra".to_string());
    let _id = gateway.add_raw("web1", untagged, &["running"]);

    let machine = observer(&gateway).observe(&name("web1")).await.unwrap();

    assert_eq!(machine.state, CanonicalState::Stopped);
}

#[tokio::test]
async fn live_instance_wins_over_terminated_leftovers() {
    let gateway = FakeGateway::new().with_instance("web1", &["terminated"]);
    let live = gateway.add_instance("web1", &["running"]);

    let machine = observer(&gateway).observe(&name("web1")).await.unwrap();

    assert_eq!(machine.state, CanonicalState::Running);
    assert_eq!(machine.instance_id, Some(live));
}

#[tokio::test]
async fn only_terminated_instances_mean_terminated() {
    let gateway = FakeGateway::new();
    let first = gateway.add_instance("web1", &["terminated"]);
    let _id = gateway.add_instance("web1", &["deleting"]);

    let machine = observer(&gateway).observe(&name("web1")).await.unwrap();

    assert_eq!(machine.state, CanonicalState::Terminated);
    assert_eq!(machine.instance_id, Some(first));
}

#[tokio::test]
async fn two_live_instances_are_ambiguous() {
    let gateway = FakeGateway::new()
        .with_instance("web1", &["running"])
        .with_instance("web1", &["initializing"]);

    let err = observer(&gateway).observe(&name("web1")).await.unwrap_err();

    assert_eq!(err.kind(), ReconcileErrorKind::AmbiguousMachine);
    assert!(err.to_string().contains("2 live provider instances"));
}

#[tokio::test]
async fn unrecognized_status_is_an_error() {
    let gateway = FakeGateway::new().with_instance("web1", &["hibernating"]);

    let err = observer(&gateway).observe(&name("web1")).await.unwrap_err();

    assert_eq!(err.kind(), ReconcileErrorKind::UnknownState);
    assert!(err.to_string().contains("hibernating"));
}

#[tokio::test]
async fn every_observation_queries_the_provider() {
    let gateway = FakeGateway::new().with_instance("web1", &["running", "stopping", "off"]);
    let observer = observer(&gateway);

    let states = [
        observer.observe(&name("web1")).await.unwrap().state,
        observer.observe(&name("web1")).await.unwrap().state,
        observer.observe(&name("web1")).await.unwrap().state,
    ];

    assert_eq!(
        states,
        [
            CanonicalState::Running,
            CanonicalState::Stopping,
            CanonicalState::Stopped
        ]
    );
    assert_eq!(gateway.list_calls(), 3);
}

#[tokio::test]
async fn list_all_is_sorted_and_keeps_unknown_states() {
    let gateway = FakeGateway::new()
        .with_instance("zeta", &["running"])
        .with_instance("alpha", &["rescue-mode"]);
    let _id = gateway.add_raw("manual", BTreeMap::new(), &["off"]);

    let instances = observer(&gateway).list_all().await.unwrap();

    let names: Vec<_> = instances.iter().map(|i| i.record.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "manual", "zeta"]);
    assert_eq!(instances[0].canonical_state, None);
    assert_eq!(instances[1].canonical_state, Some(CanonicalState::Stopped));
    assert_eq!(instances[2].canonical_state, Some(CanonicalState::Running));
}

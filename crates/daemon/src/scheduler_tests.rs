// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flux_core::FakeClock;
use flux_store::{FakeStore, Playbook};
use std::time::Duration;

fn stream_with_daily(id: &str) -> Stream {
    Stream {
        id: StreamId::new(id),
        name: format!("stream {}", id),
        active: true,
        cadence_config_json: Some(
            r#"[{"name":"daily","playbookSlug":"triage","schedule":{"every":1,"unit":"days"}}]"#
                .to_string(),
        ),
    }
}

fn active_playbook(slug: &str) -> Playbook {
    Playbook {
        id: format!("pb-{}", slug),
        slug: slug.to_string(),
        stream_id: None,
        status: "active".to_string(),
    }
}

fn scheduler(store: &FakeStore, clock: &FakeClock) -> CadenceScheduler<FakeStore, FakeClock> {
    CadenceScheduler::new(Arc::new(store.clone()), clock.clone())
}

#[tokio::test]
async fn cadence_fires_without_marker() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_stream(stream_with_daily("s-1"));
    store.add_playbook(active_playbook("triage"));

    scheduler(&store, &clock).check_cadences().await;

    let runs = store.created_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].playbook_id, "pb-triage");
    assert_eq!(
        runs[0].thread_id,
        format!("cadence:s-1:daily:{}", clock.epoch_ms())
    );
    let params: serde_json::Value = serde_json::from_str(&runs[0].params_json).unwrap();
    assert_eq!(params["cadence"], "daily");
    assert_eq!(params["source"], "cadence");

    // Marker written as ISO-8601
    let marker = store
        .kv_value(&StreamId::new("s-1"), CADENCE_NAMESPACE, "daily:lastRun")
        .unwrap();
    assert!(marker.ends_with('Z'), "marker should be ISO: {}", marker);
}

#[tokio::test]
async fn repeated_ticks_do_not_duplicate_runs() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_stream(stream_with_daily("s-1"));
    store.add_playbook(active_playbook("triage"));
    let scheduler = scheduler(&store, &clock);

    scheduler.check_cadences().await;
    scheduler.check_cadences().await;
    scheduler.check_cadences().await;
    assert_eq!(store.created_runs().len(), 1);

    // One full period later it fires again.
    clock.advance(Duration::from_millis(86_400_000));
    scheduler.check_cadences().await;
    assert_eq!(store.created_runs().len(), 2);
}

#[tokio::test]
async fn not_due_before_period_elapses() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_stream(stream_with_daily("s-1"));
    store.add_playbook(active_playbook("triage"));
    let scheduler = scheduler(&store, &clock);

    scheduler.check_cadences().await;
    clock.advance(Duration::from_millis(86_400_000 - 1));
    scheduler.check_cadences().await;
    assert_eq!(store.created_runs().len(), 1);
}

#[tokio::test]
async fn disabled_entries_are_skipped() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_stream(Stream {
        id: StreamId::new("s-1"),
        name: "s".to_string(),
        active: true,
        cadence_config_json: Some(
            r#"[{"name":"off","playbookSlug":"triage","enabled":false,"schedule":{"every":1,"unit":"hours"}}]"#
                .to_string(),
        ),
    });
    store.add_playbook(active_playbook("triage"));

    scheduler(&store, &clock).check_cadences().await;
    assert!(store.created_runs().is_empty());
}

#[tokio::test]
async fn inactive_playbook_writes_marker_without_run() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_stream(stream_with_daily("s-1"));
    store.add_playbook(Playbook {
        id: "pb-triage".to_string(),
        slug: "triage".to_string(),
        stream_id: None,
        status: "draft".to_string(),
    });

    scheduler(&store, &clock).check_cadences().await;
    assert!(store.created_runs().is_empty());
    assert!(store
        .kv_value(&StreamId::new("s-1"), CADENCE_NAMESPACE, "daily:lastRun")
        .is_some());
}

#[tokio::test]
async fn one_stream_failure_does_not_abort_others() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_stream(stream_with_daily("s-1"));
    store.add_stream(stream_with_daily("s-2"));
    store.add_playbook(active_playbook("triage"));
    // First marker read fails; the second stream must still fire.
    store.fail_times("memory_kv.get", 1);

    scheduler(&store, &clock).check_cadences().await;
    let runs = store.created_runs();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].thread_id.starts_with("cadence:s-2:"));
}

#[tokio::test]
async fn inactive_streams_are_ignored() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    let mut stream = stream_with_daily("s-1");
    stream.active = false;
    store.add_stream(stream);
    store.add_playbook(active_playbook("triage"));

    scheduler(&store, &clock).check_cadences().await;
    assert!(store.created_runs().is_empty());
}

#[tokio::test]
async fn legacy_trigger_fires_with_admin_marker() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_trigger(CronTrigger {
        id: "trig-1".to_string(),
        playbook_slug: "report".to_string(),
        stream_id: None,
        config_json: r#"{"schedule":{"every":2,"unit":"hours"}}"#.to_string(),
    });
    store.add_playbook(active_playbook("report"));
    let scheduler = scheduler(&store, &clock);

    scheduler.check_cadences().await;
    let runs = store.created_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(
        runs[0].thread_id,
        format!("cadence:global:trig-1:{}", clock.epoch_ms())
    );
    assert!(store
        .admin_value("last_playbook_trigger_run:trig-1")
        .is_some());

    // Not due again until two hours elapse.
    scheduler.check_cadences().await;
    assert_eq!(store.created_runs().len(), 1);
    clock.advance(Duration::from_millis(2 * 3_600_000));
    scheduler.check_cadences().await;
    assert_eq!(store.created_runs().len(), 2);
}

#[tokio::test]
async fn malformed_trigger_config_is_skipped() {
    let store = FakeStore::new();
    let clock = FakeClock::new();
    store.add_trigger(CronTrigger {
        id: "trig-bad".to_string(),
        playbook_slug: "report".to_string(),
        stream_id: None,
        config_json: "not json".to_string(),
    });
    store.add_playbook(active_playbook("report"));

    scheduler(&store, &clock).check_cadences().await;
    assert!(store.created_runs().is_empty());
}

#[test]
fn marker_roundtrip() {
    let iso = to_iso(1_722_500_000_123);
    assert_eq!(parse_marker(&iso), Some(1_722_500_000_123));
    assert!(parse_marker("garbage").is_none());
}

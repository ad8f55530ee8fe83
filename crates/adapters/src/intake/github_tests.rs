// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use flux_core::IntegrationId;
use flux_store::FakeStore;
use serde_json::json;

fn integration(cursor: Option<&str>) -> Integration {
    Integration {
        id: IntegrationId::new("int-1"),
        kind: "github".to_string(),
        config: json!({"owner": "acme", "repo": "api", "stages": ["triage", "ready"]}),
        intake_cursor: cursor.map(str::to_string),
        enabled: true,
        last_error: None,
    }
}

fn issue(number: u64) -> Value {
    json!({"number": number, "title": format!("issue {}", number)})
}

#[test]
fn statuses_prefer_golden_path_lifecycle() {
    let golden = GoldenPathConfig::parse(
        "lifecycle:\n  - statuses:\n      - name: incoming\n      - name: active\n",
    )
    .unwrap();
    let statuses = select_statuses(Some(&golden), &integration(None));
    assert_eq!(statuses, vec!["incoming", "active"]);
}

#[test]
fn statuses_fall_back_to_configured_stages() {
    let empty_golden = GoldenPathConfig::parse("feedback: {}").unwrap();
    assert_eq!(
        select_statuses(Some(&empty_golden), &integration(None)),
        vec!["triage", "ready"]
    );
    assert_eq!(
        select_statuses(None, &integration(None)),
        vec!["triage", "ready"]
    );
}

#[test]
fn cursor_filters_already_seen_issues() {
    let issues = vec![issue(3), issue(5), issue(8)];

    let fresh = issues_after_cursor(&issues, Some(5));
    assert_eq!(fresh.len(), 1);
    assert_eq!(issue_number(fresh[0]), Some(8));

    let all = issues_after_cursor(&issues, None);
    assert_eq!(all.len(), 3);

    assert_eq!(max_issue_number(&issues), Some(8));
}

#[test]
fn issues_without_numbers_are_skipped() {
    let issues = vec![json!({"title": "no number"}), issue(2)];
    let fresh = issues_after_cursor(&issues, None);
    assert_eq!(fresh.len(), 1);
}

#[tokio::test]
async fn ingest_routes_each_fresh_issue() {
    let store = FakeStore::new();
    let store_dyn: Arc<dyn Store> = Arc::new(store.clone());
    let integration = integration(Some("3"));

    let issues = vec![issue(4), issue(5)];
    let fresh: Vec<&Value> = issues.iter().collect();
    let ingested = ingest_issues(&store_dyn, &integration, "acme", "api", &fresh)
        .await
        .unwrap();

    assert_eq!(ingested, 2);
    let events = store.ingested_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].1.resource_id, "acme/api#4");
    assert_eq!(events[0].1.resource_type, "issue");
    assert!(!events[0].1.auto_route);
    // Every ingested event was explicitly routed.
    assert_eq!(store.routed_events().len(), 2);
}

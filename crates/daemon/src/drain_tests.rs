// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sessions::SessionRegistry;
use flux_adapters::backend::BackendRegistry;
use flux_adapters::FakeBackend;
use flux_core::{FakeClock, Task, TaskId};
use flux_store::FakeStore;

fn harness(
    limit: usize,
) -> (
    Arc<FakeStore>,
    FakeBackend,
    Arc<DrainLoop<FakeStore, FakeClock>>,
) {
    let store = Arc::new(FakeStore::new());
    let backend = FakeBackend::new("claude-cli");
    let mut registry = BackendRegistry::new();
    registry.register(Arc::new(backend.clone()));
    let executor = Arc::new(TaskExecutor::new(
        Arc::clone(&store),
        registry,
        Arc::new(SessionRegistry::new()),
        FakeClock::new(),
    ));
    let config = DrainLoopConfig {
        interval: Duration::from_secs(3600),
        limit,
        ..DrainLoopConfig::default()
    };
    let drain = Arc::new(DrainLoop::new(Arc::clone(&store), executor, config));
    (store, backend, drain)
}

fn todo(id: &str) -> Task {
    Task::new(TaskId::new(id), "claude-cli", "{}")
}

async fn wait_for_calls(backend: &FakeBackend, count: usize) {
    for _ in 0..200 {
        if backend.call_count() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("backend never reached {} calls", count);
}

#[tokio::test]
async fn tick_drains_all_pages() {
    let (store, backend, drain) = harness(2);
    for i in 0..5 {
        store.add_task(todo(&format!("t-{}", i)));
    }

    drain.tick().await;

    assert_eq!(backend.call_count(), 5, "all pages drained in one tick");
    for i in 0..5 {
        let task = store.task(&TaskId::new(format!("t-{}", i))).unwrap();
        assert!(task.status.is_terminal());
    }
}

#[tokio::test]
async fn short_page_ends_the_drain() {
    let (store, backend, drain) = harness(10);
    store.add_task(todo("t-1"));

    drain.tick().await;
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn concurrent_tick_coalesces_into_one_rerun() {
    let (store, backend, drain) = harness(10);
    backend.hold_executions();
    store.add_task(todo("t-1"));

    let first = {
        let drain = Arc::clone(&drain);
        tokio::spawn(async move { drain.tick().await })
    };
    // Wait until the first tick is inside the held execution.
    wait_for_calls(&backend, 1).await;

    // A task arriving mid-drain plus a wake-up: the wake-up coalesces.
    store.add_task(todo("t-2"));
    drain.tick().await; // returns immediately, sets rerun
    assert_eq!(backend.call_count(), 1, "second drain must not start yet");

    backend.release("t-1");
    wait_for_calls(&backend, 2).await;
    backend.release("t-2");
    first.await.unwrap();

    assert_eq!(backend.executed_task_ids(), vec!["t-1", "t-2"]);
}

#[tokio::test]
async fn trigger_now_wakes_the_loop() {
    let (store, backend, drain) = harness(10);
    store.add_task(todo("t-1"));

    drain.start();
    drain.trigger_now();
    wait_for_calls(&backend, 1).await;
    drain.stop();
}

#[tokio::test]
async fn stop_ends_drain_after_current_page() {
    let (store, backend, drain) = harness(1);
    backend.hold_executions();
    store.add_task(todo("t-1"));
    store.add_task(todo("t-2"));

    let ticking = {
        let drain = Arc::clone(&drain);
        tokio::spawn(async move { drain.tick().await })
    };
    wait_for_calls(&backend, 1).await;

    drain.stop();
    backend.release("t-1");
    ticking.await.unwrap();

    assert_eq!(backend.call_count(), 1, "stopped drain must not take t-2");
}

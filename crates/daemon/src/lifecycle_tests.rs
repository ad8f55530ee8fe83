// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        convex_url: "https://store.example".to_string(),
        flux_host: None,
        flux_token: None,
        flux_org_id: None,
        gateway_url: None,
        gateway_token: None,
        backend: None,
        allow_direct_cli: true,
        repo_workspace_root: None,
        max_concurrent: 4,
        max_pending_review: 5,
        auto_pause_after_n_fails: 5,
        state_dir: dir.path().to_path_buf(),
        log_path: dir.path().join("daemon.log"),
        lock_path: dir.path().join("fluxd.lock"),
    }
}

#[tokio::test]
async fn startup_without_gateway_disables_push_and_workers() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let result = startup(&config).await.unwrap();
    assert!(result.push.is_none());
    assert!(result.intake.is_none());
    assert!(result.feedback.is_none());
    assert_eq!(result.device_id.len(), 64);
    assert!(!result.supervisor.is_running());
}

#[tokio::test]
async fn second_startup_fails_on_lock() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let _first = startup(&config).await.unwrap();
    let second = startup(&config).await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));
}

#[tokio::test]
async fn lock_contains_pid() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let _result = startup(&config).await.unwrap();

    let content = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(content.trim().parse::<u32>().unwrap(), std::process::id());
}

#[tokio::test]
async fn unreachable_gateway_handshake_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.gateway_url = Some("http://127.0.0.1:1".to_string());
    config.gateway_token = Some("token".to_string());

    let result = startup(&config).await;
    assert!(matches!(result, Err(LifecycleError::Handshake(_))));
}

#[tokio::test]
async fn no_backend_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    config.allow_direct_cli = false;

    let result = startup(&config).await;
    assert!(matches!(result, Err(LifecycleError::NoBackend)));
}

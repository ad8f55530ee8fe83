// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn first_run_generates_and_persists_identity() {
    let dir = tempfile::tempdir().unwrap();
    let (identity, device_id) = load_or_create_identity(dir.path()).unwrap();

    assert!(identity.private_key_pem.contains("BEGIN PRIVATE KEY"));
    assert!(identity.public_key_pem.contains("BEGIN PUBLIC KEY"));
    assert_eq!(device_id.len(), 64, "hex sha-256");

    // File is owner-only.
    use std::os::unix::fs::PermissionsExt;
    let mode = std::fs::metadata(dir.path().join("device.json"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn identity_is_stable_across_loads() {
    let dir = tempfile::tempdir().unwrap();
    let (first, first_id) = load_or_create_identity(dir.path()).unwrap();
    let (second, second_id) = load_or_create_identity(dir.path()).unwrap();
    assert_eq!(first.public_key_pem, second.public_key_pem);
    assert_eq!(first_id, second_id);
}

#[test]
fn corrupt_device_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("device.json"), "{nope").unwrap();
    assert!(load_or_create_identity(dir.path()).is_err());
}

#[test]
fn tokens_roundtrip_by_device_and_role() {
    let dir = tempfile::tempdir().unwrap();
    save_token(
        dir.path(),
        "dev-1",
        DeviceToken {
            token: "secret".to_string(),
            role: "runner".to_string(),
            scopes: vec!["tasks".to_string()],
            updated_at_ms: 123,
        },
    )
    .unwrap();

    let tokens = load_tokens(dir.path());
    let entry = tokens.get("dev-1:runner").unwrap();
    assert_eq!(entry.token, "secret");
    assert_eq!(entry.scopes, vec!["tasks"]);

    // Missing file yields an empty map.
    let empty = load_tokens(tempfile::tempdir().unwrap().path());
    assert!(empty.is_empty());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::task::{Task, TaskId};
use serde_json::json;

fn packet() -> TaskPacket {
    TaskPacket::bare(Task::new(TaskId::new("t-1"), "claude-cli", "fix the bug"))
}

#[test]
fn rendered_prompt_wins() {
    let mut p = packet();
    p.prompt.rendered = Some("do the thing".to_string());
    p.prompt.template = Some("ignored".to_string());
    assert_eq!(p.materialize_prompt(), "do the thing");
}

#[test]
fn blank_rendered_falls_back_to_pieces() {
    let mut p = packet();
    p.prompt.rendered = Some("   ".to_string());
    p.prompt.template = Some("You are a fixer.".to_string());
    p.prompt.vars = json!({"repo": "acme/api"});
    p.prompt.context = Some("main is broken".to_string());

    let prompt = p.materialize_prompt();
    assert_eq!(
        prompt,
        "You are a fixer.\n\n{\"repo\":\"acme/api\"}\n\nmain is broken\n\nTask: fix the bug"
    );
}

#[test]
fn bare_packet_materializes_task_block_only() {
    assert_eq!(packet().materialize_prompt(), "Task: fix the bug");
}

#[test]
fn backend_resolution_order() {
    let mut p = packet();
    assert_eq!(p.resolve_backend(None), "claude-cli");
    assert_eq!(p.resolve_backend(Some("codex")), "codex-cli");

    p.prompt.backend = Some("claude-code".to_string());
    assert_eq!(p.resolve_backend(Some("codex")), "claude-cli");

    p.execution.backend = Some("codex".to_string());
    assert_eq!(p.resolve_backend(Some("claude")), "codex-cli");
}

#[test]
fn packet_deserializes_with_missing_sections() {
    let p: TaskPacket = serde_json::from_value(json!({
        "task": {"id": "t-9", "status": "todo", "kind": "claude-cli"}
    }))
    .unwrap();
    assert!(p.prompt.rendered.is_none());
    assert!(p.execution.backend.is_none());
    assert_eq!(p.resolve_backend(None), "claude-cli");
}

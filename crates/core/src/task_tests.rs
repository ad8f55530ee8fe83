// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use yare::parameterized;

#[parameterized(
    todo_doing = { TaskStatus::Todo, TaskStatus::Doing, true },
    todo_blocked = { TaskStatus::Todo, TaskStatus::Blocked, true },
    todo_review = { TaskStatus::Todo, TaskStatus::Review, false },
    todo_done = { TaskStatus::Todo, TaskStatus::Done, false },
    doing_review = { TaskStatus::Doing, TaskStatus::Review, true },
    doing_done = { TaskStatus::Doing, TaskStatus::Done, true },
    doing_todo = { TaskStatus::Doing, TaskStatus::Todo, false },
    blocked_todo = { TaskStatus::Blocked, TaskStatus::Todo, true },
    blocked_review = { TaskStatus::Blocked, TaskStatus::Review, false },
    review_done = { TaskStatus::Review, TaskStatus::Done, true },
    review_doing = { TaskStatus::Review, TaskStatus::Doing, true },
    review_blocked = { TaskStatus::Review, TaskStatus::Blocked, false },
    failed_todo = { TaskStatus::Failed, TaskStatus::Todo, true },
    failed_doing = { TaskStatus::Failed, TaskStatus::Doing, false },
    done_anything = { TaskStatus::Done, TaskStatus::Todo, false },
    cancelled_anything = { TaskStatus::Cancelled, TaskStatus::Failed, false },
)]
fn transition_table(from: TaskStatus, to: TaskStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn terminal_statuses_have_no_transitions() {
    assert!(TaskStatus::Done.is_terminal());
    assert!(TaskStatus::Cancelled.is_terminal());
    assert!(TaskStatus::Done.allowed_transitions().is_empty());
    assert!(TaskStatus::Cancelled.allowed_transitions().is_empty());
}

#[test]
fn apply_status_sets_started_at_once() {
    let mut task = Task::new(TaskId::new("t-1"), "claude-cli", "{}");
    task.apply_status(TaskStatus::Doing, 1_000).unwrap();
    assert_eq!(task.started_at_ms, Some(1_000));

    // Bounce through blocked and back; started_at must not move.
    task.apply_status(TaskStatus::Blocked, 2_000).unwrap();
    task.apply_status(TaskStatus::Doing, 3_000).unwrap();
    assert_eq!(task.started_at_ms, Some(1_000));
}

#[test]
fn apply_status_rejects_invalid_transition() {
    let mut task = Task::new(TaskId::new("t-1"), "claude-cli", "{}");
    let err = task.apply_status(TaskStatus::Done, 1_000).unwrap_err();
    assert_eq!(err.from, TaskStatus::Todo);
    assert_eq!(err.to, TaskStatus::Done);
    // Status unchanged after rejection
    assert_eq!(task.status, TaskStatus::Todo);
}

#[test]
fn status_serde_uses_snake_case() {
    let json = serde_json::to_string(&TaskStatus::Cancelled).unwrap();
    assert_eq!(json, "\"cancelled\"");
    let back: TaskStatus = serde_json::from_str("\"review\"").unwrap();
    assert_eq!(back, TaskStatus::Review);
}

fn any_status() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

proptest! {
    // Every transition the state machine accepts is in the allowed set,
    // and every transition outside the set is rejected without mutation.
    #[test]
    fn transitions_respect_allowed_graph(from in any_status(), to in any_status()) {
        let mut task = Task::new(TaskId::new("t"), "claude-cli", "");
        task.status = from;
        let result = task.apply_status(to, 42);
        if from.can_transition(to) {
            prop_assert!(result.is_ok());
            prop_assert_eq!(task.status, to);
        } else {
            prop_assert!(result.is_err());
            prop_assert_eq!(task.status, from);
        }
    }

    // Walking any sequence of statuses only ever lands on allowed edges.
    #[test]
    fn random_walk_stays_on_graph(steps in prop::collection::vec(any_status(), 1..20)) {
        let mut task = Task::new(TaskId::new("t"), "claude-cli", "");
        let mut prev = task.status;
        for to in steps {
            if task.apply_status(to, 1).is_ok() {
                prop_assert!(prev.can_transition(to));
                prev = to;
            } else {
                prop_assert_eq!(task.status, prev);
            }
        }
    }
}

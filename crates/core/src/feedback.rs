// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound feedback events.
//!
//! A feedback event is a pending notification about a task or run
//! transition, delivered at-least-once by the feedback worker. Delivery
//! reaches `dead_letter` only after the retry budget is exhausted; the store
//! owns that bookkeeping.

use crate::integration::IntegrationId;
use crate::task::TaskId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for a feedback event.
    pub struct FeedbackEventId;
}

/// What the event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTopic {
    Task,
    Run,
}

/// Delivery status of a feedback event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    DeadLetter,
}

/// A pending outbound notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEvent {
    pub id: FeedbackEventId,
    pub topic: FeedbackTopic,
    pub event_type: String,
    #[serde(default)]
    pub payload_json: String,
    pub delivery: DeliveryStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_id: Option<IntegrationId>,
}

impl FeedbackEvent {
    /// Parse the payload, tolerating malformed JSON.
    pub fn payload(&self) -> FeedbackPayload {
        serde_json::from_str(&self.payload_json).unwrap_or_default()
    }
}

/// Loosely-typed payload of a task-status feedback event.
///
/// The store writes these camelCase; unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedbackPayload {
    pub status: Option<String>,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub resource_id: Option<String>,
    pub issue_number: Option<u64>,
    pub output: Option<String>,
    pub goal: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gateway HTTP client.
//!
//! The gateway fronts provider capabilities (GitHub, push tickets, the
//! runner handshake) behind a single `POST /tools/invoke` endpoint. Errors
//! carry a category and a retryable flag so workers can decide between
//! backoff and giving up.

use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default gateway RPC timeout.
pub const GATEWAY_TIMEOUT: Duration = Duration::from_secs(120);

/// Category of a capability failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    RateLimit,
    Auth,
    NotFound,
    ServerError,
    Unknown,
}

impl ErrorCategory {
    fn from_type(error_type: &str) -> Self {
        match error_type {
            "rate_limit" => ErrorCategory::RateLimit,
            "auth" => ErrorCategory::Auth,
            "not_found" => ErrorCategory::NotFound,
            "server_error" => ErrorCategory::ServerError,
            _ => ErrorCategory::Unknown,
        }
    }

    fn default_retryable(self) -> bool {
        match self {
            ErrorCategory::RateLimit | ErrorCategory::ServerError | ErrorCategory::Unknown => true,
            ErrorCategory::Auth | ErrorCategory::NotFound => false,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::RateLimit => write!(f, "rate_limit"),
            ErrorCategory::Auth => write!(f, "auth"),
            ErrorCategory::NotFound => write!(f, "not_found"),
            ErrorCategory::ServerError => write!(f, "server_error"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

/// A failed capability call.
#[derive(Debug, Clone, Error)]
#[error("{provider}.{operation} failed ({category}): {message}")]
pub struct CapabilityError {
    pub provider: String,
    pub operation: String,
    pub category: ErrorCategory,
    pub retryable: bool,
    pub message: String,
}

impl CapabilityError {
    fn new(operation: &str, category: ErrorCategory, message: impl Into<String>) -> Self {
        let (provider, op) = operation.split_once('.').unwrap_or(("gateway", operation));
        Self {
            provider: provider.to_string(),
            operation: op.to_string(),
            category,
            retryable: category.default_retryable(),
            message: message.into(),
        }
    }
}

/// Successful capability payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayResult {
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Deserialize)]
struct InvokeEnvelope {
    ok: bool,
    #[serde(default)]
    result: Option<GatewayResult>,
    #[serde(default)]
    error: Option<InvokeError>,
}

#[derive(Debug, Deserialize)]
struct InvokeError {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: String,
}

/// Push configuration and batch hints returned by the runner handshake.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Handshake {
    #[serde(default, rename = "wsUrl")]
    pub ws_url: Option<String>,
    #[serde(default, rename = "batchLimit")]
    pub batch_limit: Option<usize>,
}

/// Client for the gateway's tool-invoke endpoint.
#[derive(Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Invoke a capability action.
    pub async fn invoke(
        &self,
        action: &str,
        args: Value,
    ) -> Result<GatewayResult, CapabilityError> {
        let url = format!("{}/tools/invoke", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({"action": action, "args": args}))
            .send()
            .await
            .map_err(|e| {
                CapabilityError::new(action, ErrorCategory::ServerError, e.to_string())
            })?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(CapabilityError::new(
                action,
                ErrorCategory::Auth,
                "unauthorized",
            ));
        }
        if status.is_server_error() {
            return Err(CapabilityError::new(
                action,
                ErrorCategory::ServerError,
                format!("gateway returned {}", status),
            ));
        }

        let body = response.text().await.map_err(|e| {
            CapabilityError::new(action, ErrorCategory::ServerError, e.to_string())
        })?;
        parse_invoke_response(action, &body)
    }

    /// Mint a one-shot websocket auth ticket.
    pub async fn mint_push_ticket(&self) -> Result<String, CapabilityError> {
        let result = self.invoke("push.mintTicket", json!({})).await?;
        result
            .content
            .get("ticket")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                CapabilityError::new(
                    "push.mintTicket",
                    ErrorCategory::Unknown,
                    "response missing ticket",
                )
            })
    }

    /// Runner handshake: announce the device, receive push config and
    /// batch hints.
    pub async fn handshake(&self, device_id: &str) -> Result<Handshake, CapabilityError> {
        let result = self
            .invoke("runner.handshake", json!({"deviceId": device_id}))
            .await?;
        serde_json::from_value(result.content).map_err(|e| {
            CapabilityError::new("runner.handshake", ErrorCategory::Unknown, e.to_string())
        })
    }
}

/// Parse an invoke envelope body. Schema mismatches map to `unknown`
/// (retryable).
fn parse_invoke_response(action: &str, body: &str) -> Result<GatewayResult, CapabilityError> {
    let envelope: InvokeEnvelope = serde_json::from_str(body).map_err(|e| {
        CapabilityError::new(
            action,
            ErrorCategory::Unknown,
            format!("unexpected response shape: {}", e),
        )
    })?;

    if envelope.ok {
        return envelope.result.ok_or_else(|| {
            CapabilityError::new(action, ErrorCategory::Unknown, "ok response without result")
        });
    }

    let error = envelope.error.unwrap_or(InvokeError {
        message: "unknown gateway error".to_string(),
        error_type: String::new(),
    });
    Err(CapabilityError::new(
        action,
        ErrorCategory::from_type(&error.error_type),
        error.message,
    ))
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;

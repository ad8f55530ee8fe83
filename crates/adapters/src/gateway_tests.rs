// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn ok_envelope_yields_result() {
    let body = r#"{"ok":true,"result":{"content":{"ticket":"abc"},"details":{}}}"#;
    let result = parse_invoke_response("push.mintTicket", body).unwrap();
    assert_eq!(result.content["ticket"], "abc");
}

#[test]
fn ok_without_result_is_unknown_retryable() {
    let err = parse_invoke_response("github.listIssues", r#"{"ok":true}"#).unwrap_err();
    assert_eq!(err.category, ErrorCategory::Unknown);
    assert!(err.retryable);
}

#[parameterized(
    rate_limit = { "rate_limit", ErrorCategory::RateLimit, true },
    auth = { "auth", ErrorCategory::Auth, false },
    not_found = { "not_found", ErrorCategory::NotFound, false },
    server_error = { "server_error", ErrorCategory::ServerError, true },
    mystery = { "something_else", ErrorCategory::Unknown, true },
)]
fn error_types_map_to_categories(
    error_type: &str,
    category: ErrorCategory,
    retryable: bool,
) {
    let body = format!(
        r#"{{"ok":false,"error":{{"message":"nope","type":"{}"}}}}"#,
        error_type
    );
    let err = parse_invoke_response("github.postComment", &body).unwrap_err();
    assert_eq!(err.category, category);
    assert_eq!(err.retryable, retryable);
    assert_eq!(err.provider, "github");
    assert_eq!(err.operation, "postComment");
    assert_eq!(err.message, "nope");
}

#[test]
fn schema_mismatch_is_unknown_retryable() {
    let err = parse_invoke_response("github.listIssues", "<html>oops</html>").unwrap_err();
    assert_eq!(err.category, ErrorCategory::Unknown);
    assert!(err.retryable);
}

#[test]
fn action_without_dot_uses_gateway_provider() {
    let err = parse_invoke_response("ping", r#"{"ok":false}"#).unwrap_err();
    assert_eq!(err.provider, "gateway");
    assert_eq!(err.operation, "ping");
}

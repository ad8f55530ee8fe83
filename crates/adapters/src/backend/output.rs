// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent output parsing.
//!
//! CLI backends emit JSON envelopes on stdout, but agents also print
//! freeform text around them. The parser recovers the useful payload
//! without ever failing: worst case, the trimmed raw text comes back.

use serde_json::Value;

/// Extract the result payload from raw agent stdout.
///
/// 1. If the whole input parses as JSON and carries a `result` or
///    `response` string that is itself valid JSON, return that inner
///    string verbatim.
/// 2. If the whole input parses but has no such field, return the trimmed
///    input.
/// 3. If the outer parse fails, return the first balanced `{...}` substring
///    that parses as JSON.
/// 4. Otherwise return the trimmed input.
pub fn parse_agent_output(stdout: &str) -> String {
    let trimmed = stdout.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(inner) = inner_result(&value) {
            return inner;
        }
        return trimmed.to_string();
    }

    if let Some(embedded) = first_json_object(trimmed) {
        return embedded;
    }

    trimmed.to_string()
}

/// Pull usage accounting out of a CLI JSON envelope, when present.
///
/// Returns `(tokens_used, cost_usd)`. Tokens are input + output.
pub fn parse_usage(stdout: &str) -> (Option<u64>, Option<f64>) {
    let Ok(value) = serde_json::from_str::<Value>(stdout.trim()) else {
        return (None, None);
    };
    let tokens = value.get("usage").map(|usage| {
        let input = usage
            .get("input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let output = usage
            .get("output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        input + output
    });
    let cost = value.get("total_cost_usd").and_then(Value::as_f64);
    (tokens.filter(|t| *t > 0), cost)
}

fn inner_result(value: &Value) -> Option<String> {
    let inner = value
        .get("result")
        .or_else(|| value.get("response"))?
        .as_str()?;
    if serde_json::from_str::<Value>(inner).is_ok() {
        Some(inner.to_string())
    } else {
        None
    }
}

/// Scan for the first balanced `{...}` substring that parses as JSON.
///
/// Brace counting is string-aware so `}` inside JSON strings does not end
/// a candidate early.
fn first_json_object(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut start = 0;
    while let Some(open) = input[start..].find('{').map(|i| i + start) {
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        for (offset, &b) in bytes[open..].iter().enumerate() {
            if escaped {
                escaped = false;
                continue;
            }
            match b {
                b'\\' if in_string => escaped = true,
                b'"' => in_string = !in_string,
                b'{' if !in_string => depth += 1,
                b'}' if !in_string => {
                    depth -= 1;
                    if depth == 0 {
                        let candidate = &input[open..=open + offset];
                        if serde_json::from_str::<Value>(candidate).is_ok() {
                            return Some(candidate.to_string());
                        }
                        break;
                    }
                }
                _ => {}
            }
        }
        start = open + 1;
    }
    None
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn inner_json_result_is_unwrapped() {
    let stdout = r#"{"result":"{\"x\":1}"}"#;
    assert_eq!(parse_agent_output(stdout), r#"{"x":1}"#);
}

#[test]
fn inner_json_response_is_unwrapped() {
    let stdout = r#"{"response":"[1,2]"}"#;
    assert_eq!(parse_agent_output(stdout), "[1,2]");
}

#[test]
fn non_json_result_returns_whole_envelope() {
    // result is a plain sentence, not JSON — keep the original stdout.
    let stdout = r#"{"result":"all done"}"#;
    assert_eq!(parse_agent_output(stdout), stdout);
}

#[test]
fn embedded_object_is_recovered_from_noise() {
    let stdout = r#"garbage{"y":2}tail"#;
    assert_eq!(parse_agent_output(stdout), r#"{"y":2}"#);
}

#[test]
fn braces_inside_strings_do_not_split_candidates() {
    let stdout = r#"noise {"msg":"a } b","n":1} more"#;
    assert_eq!(parse_agent_output(stdout), r#"{"msg":"a } b","n":1}"#);
}

#[test]
fn unparseable_braces_fall_through_to_next_candidate() {
    let stdout = r#"{not json} {"ok":true}"#;
    assert_eq!(parse_agent_output(stdout), r#"{"ok":true}"#);
}

#[parameterized(
    plain_text = { "hello", "hello" },
    padded_text = { "  hello\n", "hello" },
    empty = { "", "" },
)]
fn freeform_text_is_trimmed(input: &str, expected: &str) {
    assert_eq!(parse_agent_output(input), expected);
}

#[test]
fn usage_extraction() {
    let stdout = r#"{"result":"ok","usage":{"input_tokens":100,"output_tokens":50},"total_cost_usd":0.12}"#;
    let (tokens, cost) = parse_usage(stdout);
    assert_eq!(tokens, Some(150));
    assert_eq!(cost, Some(0.12));
}

#[test]
fn usage_absent_yields_none() {
    assert_eq!(parse_usage("not json"), (None, None));
    assert_eq!(parse_usage(r#"{"result":"ok"}"#), (None, None));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    openclaw = { "openclaw", "claude-cli" },
    claude = { "claude", "claude-cli" },
    claude_code = { "claude-code", "claude-cli" },
    code = { "code", "claude-cli" },
    codex = { "codex", "codex-cli" },
    already_normal = { "claude-cli", "claude-cli" },
    unknown_passthrough = { "gemini-cli", "gemini-cli" },
    whitespace = { "  claude  ", "claude-cli" },
)]
fn alias_normalization(input: &str, expected: &str) {
    assert_eq!(normalize_backend(input), expected);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

/// Path to the Claude CLI binary (default: `claude` on PATH).
pub fn claude_bin() -> String {
    std::env::var("CLAUDE_BIN").unwrap_or_else(|_| "claude".to_string())
}

/// Preferred runner backend, if configured.
pub fn runner_backend() -> Option<String> {
    std::env::var("FLUX_BACKEND").ok().filter(|s| !s.is_empty())
}

/// Whether direct CLI execution is allowed ("1" or "true").
pub fn allow_direct_cli() -> bool {
    std::env::var("FLUX_ALLOW_DIRECT_CLI")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

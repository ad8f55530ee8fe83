// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status comment rendering.
//!
//! External systems (GitHub issues) receive a fixed-format comment on task
//! transitions. The template is part of the outward contract; change it and
//! downstream parsers break.

/// Maximum output length carried in a comment before tail truncation.
const MAX_OUTPUT_CHARS: usize = 1500;

/// Render the status update comment body.
///
/// The output block (blank line + `Output:` + fenced text) is emitted only
/// when non-empty output is present. Output longer than 1500 characters is
/// cut and suffixed with `...`.
pub fn format_status_comment(
    task_label: &str,
    from_status: Option<&str>,
    to_status: &str,
    event_id: &str,
    output: Option<&str>,
) -> String {
    let mut body = format!(
        "Squads status update\n- Task: {}\n- Transition: {} -> {}\n- Feedback event: {}",
        task_label,
        from_status.unwrap_or("unknown"),
        to_status,
        event_id,
    );

    let trimmed = output.map(str::trim).filter(|s| !s.is_empty());
    if let Some(text) = trimmed {
        let clipped = if text.chars().count() > MAX_OUTPUT_CHARS {
            let head: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
            format!("{}...", head)
        } else {
            text.to_string()
        };
        body.push_str("\n\nOutput:\n```text\n");
        body.push_str(&clipped);
        body.push_str("\n```");
    }

    body
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;

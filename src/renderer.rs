// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Markdown rendering for parsed chat exports.
//!
//! This module transforms a [`ChatDocument`] into a readable Markdown
//! document. Rendering is a pure function of the document and the
//! [`RenderOptions`]: the same input always produces the same bytes.
//!
//! # Output Format
//!
//! The rendered Markdown includes:
//! - A `# Chat Conversation` heading and a participants line
//! - One numbered paragraph per user message
//! - The files referenced by each request
//! - The assistant response, with tool calls expanded by [`crate::tools`]
//! - A `---` rule between consecutive turns
//!
//! # Example
//!
//! ```
//! use chat2md::parser::{ChatDocument, ResponsePart, Turn};
//! use chat2md::renderer::{render_chat, RenderOptions};
//!
//! let chat = ChatDocument {
//!     requester_username: "Alice".into(),
//!     responder_username: "Bot".into(),
//!     turns: vec![Turn {
//!         user_text: "Hi".into(),
//!         response_parts: vec![ResponsePart::PlainText("Hello!".into())],
//!         ..Default::default()
//!     }],
//! };
//!
//! let markdown = render_chat(&chat, &RenderOptions::default());
//!
//! assert!(markdown.contains("**Participants:** Alice ↔ Bot"));
//! assert!(markdown.contains("**1.** Hi"));
//! assert!(markdown.contains("Hello!"));
//! ```

use crate::parser::{ChatDocument, ResponsePart, Turn, UNKNOWN_FILE};
use crate::tools;
use chrono::DateTime;
use std::fmt::Write;

/// Escaping artifact left in exported text around nested code fences.
const FENCE_ARTIFACT: &str = "````\n";

/// Configuration options for Markdown rendering.
///
/// Controls which optional elements are included in the rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Whether to expand tool invocations in responses.
    pub show_tools: bool,

    /// Whether to print the request time under each user message.
    pub show_timestamps: bool,

    /// Whether to list the files referenced by each request.
    pub show_references: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_tools: true,
            show_timestamps: false,
            show_references: true,
        }
    }
}

/// Renders a parsed chat export as Markdown.
///
/// This is the main entry point for rendering. Turns are separated by a
/// `---` rule; no rule precedes the first turn or follows the last.
#[must_use]
pub fn render_chat(chat: &ChatDocument, opts: &RenderOptions) -> String {
    let mut out = String::from("# Chat Conversation\n\n");
    writeln!(
        out,
        "**Participants:** {} ↔ {}\n",
        chat.requester_username, chat.responder_username
    )
    .unwrap();

    for (i, turn) in chat.turns.iter().enumerate() {
        if i > 0 {
            out.push_str("---\n\n");
        }
        out.push_str(&render_turn(turn, i + 1, opts));
    }

    out
}

/// Renders a single turn. `index` is the 1-based position shown in front
/// of the user message.
#[must_use]
pub fn render_turn(turn: &Turn, index: usize, opts: &RenderOptions) -> String {
    let mut out = String::new();

    if !turn.user_text.is_empty() {
        writeln!(out, "**{index}.** {}\n", turn.user_text).unwrap();
    }

    if opts.show_timestamps
        && let Some(ts) = turn.timestamp.and_then(format_timestamp)
    {
        writeln!(out, "*{ts}*\n").unwrap();
    }

    if opts.show_references && !turn.referenced_files.is_empty() {
        out.push_str("**Referenced Files:**\n");
        for file in &turn.referenced_files {
            if file.is_file
                && let Some(path) = &file.filesystem_path
            {
                writeln!(out, "- `{}` - {path}", file.display_name).unwrap();
            }
        }
        out.push('\n');
    }

    let response: String = turn
        .response_parts
        .iter()
        .map(|part| render_part(part, opts))
        .collect();
    let response = collapse_blank_lines(&response);
    let response = response.trim();
    if !response.is_empty() {
        out.push_str(response);
        out.push_str("\n\n");
    }

    out
}

/// Renders one response part.
#[must_use]
pub fn render_part(part: &ResponsePart, opts: &RenderOptions) -> String {
    match part {
        ResponsePart::PlainText(text) => text.replace(FENCE_ARTIFACT, ""),
        ResponsePart::InlineReference { name } => format!("[{name}]"),
        ResponsePart::CodeBlockHeader { file_path } => {
            format!("\n\n**File:** `{}`\n", file_name(file_path))
        }
        ResponsePart::ToolInvocation(invocation) if opts.show_tools => {
            tools::render_tool_invocation(invocation)
        }
        ResponsePart::NestedValue(value) if !value.is_empty() => format!("*{value}*"),
        ResponsePart::ToolInvocation(_) | ResponsePart::NestedValue(_) | ResponsePart::Other => {
            String::new()
        }
    }
}

/// Returns the last segment of a path written with either `/` or `\`
/// separators, or [`UNKNOWN_FILE`] for an empty path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    if path.is_empty() {
        return UNKNOWN_FILE;
    }
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Formats a millisecond Unix timestamp as `YYYY-MM-DD HH:MM:SS UTC`.
fn format_timestamp(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Collapses every run of three or more newlines down to two.
fn collapse_blank_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = 0;
    for c in s.chars() {
        if c == '\n' {
            run += 1;
            if run > 2 {
                continue;
            }
        } else {
            run = 0;
        }
        out.push(c);
    }
    out
}

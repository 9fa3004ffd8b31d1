// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Rendering of serialized tool invocations.
//!
//! Exports rarely record which tool the assistant called. The tool is
//! instead recognised from the shape of its input parameters, using an
//! ordered rule table where the first matching rule wins (see
//! [`classify_parameters`]). The identified tool then selects how the
//! parameters and results are formatted:
//!
//! - terminal commands become a `bash` block
//! - file edits show the target file and a replaced/with excerpt
//! - game-master scripts become a `python` block
//! - everything else shows a filtered `**Parameters:**` JSON block
//!
//! # Example
//!
//! ```
//! use chat2md::parser::ToolInvocation;
//! use chat2md::tools::render_tool_invocation;
//!
//! let mut invocation = ToolInvocation::default();
//! invocation
//!     .raw_parameters
//!     .insert("command".into(), "cargo test".into());
//!
//! let markdown = render_tool_invocation(&invocation);
//! assert!(markdown.contains("**Tool Call:** run_in_terminal"));
//! assert!(markdown.contains("```bash\ncargo test\n```"));
//! ```

use crate::parser::{OutputItem, ToolInvocation, ToolResult, display_value, is_truthy};
use crate::renderer::file_name;
use serde_json::{Map, Value};
use std::fmt::Write;

/// Tool input parameters as recorded in the export.
pub type Parameters = Map<String, Value>;

/// Runs a shell command.
pub const RUN_IN_TERMINAL: &str = "run_in_terminal";
/// Replaces a string within an existing file.
pub const REPLACE_STRING_IN_FILE: &str = "replace_string_in_file";
/// Inserts an edit into an existing file.
pub const INSERT_EDIT_INTO_FILE: &str = "insert_edit_into_file";
/// Creates a new file.
pub const CREATE_FILE: &str = "create_file";

/// Tools that modify files. Their successful output is summarised rather
/// than printed.
const FILE_TOOLS: &[&str] = &[CREATE_FILE, REPLACE_STRING_IN_FILE, INSERT_EDIT_INTO_FILE];

/// Parameter holding a game-master script.
const GM_SCRIPT_KEY: &str = "szGmScript";

/// Parameters always shown for generic tools, whatever their length.
const ALWAYS_SHOWN: &[&str] = &["query", "symbolName", "url", "explanation", "reason"];

/// Generic tools also show string parameters shorter than this.
const SHORT_PARAMETER_LIMIT: usize = 100;

const OLD_STRING_LIMIT: usize = 200;
const NEW_STRING_LIMIT: usize = 500;
const OUTPUT_LIMIT: usize = 1000;

/// Invocation message shown when the tool had nothing to say.
const EMPTY_MESSAGE: &str = "Using \"\"";

/// Explanations that just restate the tool name.
const GENERIC_EXPLANATIONS: &[&str] = &[
    "run in terminal",
    "replace string in file",
    "insert edit into file",
];

type Rule = (fn(&Parameters) -> bool, &'static str);

/// Tool recognition rules, in precedence order.
const RULES: &[Rule] = &[
    (|p: &Parameters| p.contains_key("command"), RUN_IN_TERMINAL),
    (
        |p: &Parameters| p.contains_key("filePath") && p.contains_key("oldString"),
        REPLACE_STRING_IN_FILE,
    ),
    (
        |p: &Parameters| p.contains_key("filePath") && p.contains_key("code"),
        INSERT_EDIT_INTO_FILE,
    ),
    (
        |p: &Parameters| p.contains_key("filePath") && p.contains_key("content"),
        CREATE_FILE,
    ),
    (
        |p: &Parameters| p.contains_key("query") && !p.get("filePaths").is_some_and(is_truthy),
        "semantic_search",
    ),
    (|p: &Parameters| p.contains_key("symbolName"), "list_code_usages"),
    (
        |p: &Parameters| p.contains_key("filePaths") && p.contains_key("startLineNumberBaseZero"),
        "read_file",
    ),
    (|p: &Parameters| p.contains_key("path"), "list_dir"),
    (|p: &Parameters| p.contains_key("urls"), "fetch_webpage"),
    (|p: &Parameters| p.contains_key("repo"), "github_repo"),
    (|p: &Parameters| p.contains_key("projectType"), "get_project_setup_info"),
    (|p: &Parameters| p.contains_key("task"), "create_and_run_task"),
    (|p: &Parameters| p.contains_key("id"), "install_extension"),
    (|p: &Parameters| p.contains_key(GM_SCRIPT_KEY), "SendGmCommandToGame"),
];

/// Recognises a tool from its parameter keys alone.
///
/// Rules are tried in order and the first match wins, so
/// `{"command": ..., "path": ...}` is a terminal command, not a directory
/// listing.
#[must_use]
pub fn classify_parameters(params: &Parameters) -> Option<&'static str> {
    RULES
        .iter()
        .find(|(matches, _)| matches(params))
        .map(|&(_, name)| name)
}

/// Names the tool behind an invocation: first by its parameters, then by
/// the name recorded in its metadata. Returns `None` when neither is
/// available.
#[must_use]
pub fn identify_tool(invocation: &ToolInvocation) -> Option<&str> {
    classify_parameters(&invocation.raw_parameters).or(invocation.declared_name.as_deref())
}

/// Renders a tool invocation as Markdown: a `**Tool Call:**` header, the
/// formatted parameters and the formatted result.
#[must_use]
pub fn render_tool_invocation(invocation: &ToolInvocation) -> String {
    let mut out = String::new();
    let tool = identify_tool(invocation);

    render_header(&mut out, tool, &invocation.invocation_message);

    if !invocation.raw_parameters.is_empty() {
        render_parameters(&mut out, tool, &invocation.raw_parameters);
    }

    if let Some(result) = &invocation.result {
        render_result(&mut out, tool, result);
    }

    out
}

fn render_header(out: &mut String, tool: Option<&str>, message: &str) {
    let has_message = !message.is_empty() && message != EMPTY_MESSAGE;

    match tool {
        Some(name) => {
            write!(out, "\n**Tool Call:** {name}").unwrap();
            if has_message {
                let explanation = extract_explanation(message);
                if !explanation.is_empty() {
                    write!(out, " - {explanation}").unwrap();
                }
            }
            out.push('\n');
        }
        None if has_message => writeln!(out, "\n**Tool Call:** {message}").unwrap(),
        None => {}
    }
}

/// Strips the `Using "..."` wrapper from an invocation message. Returns an
/// empty string when what remains only restates the tool name.
fn extract_explanation(message: &str) -> String {
    let cleaned = message
        .replace("Using \"", "")
        .replace('"', "")
        .replace("Using ", "");

    let lowered = cleaned.to_lowercase();
    if GENERIC_EXPLANATIONS.contains(&lowered.as_str()) {
        String::new()
    } else {
        cleaned
    }
}

fn render_parameters(out: &mut String, tool: Option<&str>, params: &Parameters) {
    if let Some(script) = params.get(GM_SCRIPT_KEY) {
        match script.as_str().filter(|s| s.contains('\n') || s.contains("\\n")) {
            Some(script) => render_gm_script(out, script),
            None => render_json_block(out, params),
        }
        return;
    }

    match tool {
        Some(RUN_IN_TERMINAL) => render_command(out, params),
        Some(name) if FILE_TOOLS.contains(&name) => render_file_edit(out, name, params),
        _ => {
            let shown = filter_parameters(params);
            if !shown.is_empty() {
                render_json_block(out, &shown);
            }
        }
    }
}

fn render_gm_script(out: &mut String, script: &str) {
    let script = unescape_newlines(script);
    let script = script.strip_prefix('!').unwrap_or(&script);
    writeln!(out, "**GM Script:**\n```python\n{script}\n```").unwrap();
}

fn render_command(out: &mut String, params: &Parameters) {
    let command = string_param(params, "command");
    if command.is_empty() {
        return;
    }

    let explanation = string_param(params, "explanation");
    if explanation.is_empty() {
        out.push_str("**Command:**\n");
    } else {
        writeln!(out, "**Command:** {explanation}").unwrap();
    }
    writeln!(out, "```bash\n{command}\n```").unwrap();
}

fn render_file_edit(out: &mut String, tool: &str, params: &Parameters) {
    let path = string_param(params, "filePath");
    if !path.is_empty() {
        writeln!(out, "\n**File:** `{}`", file_name(&path)).unwrap();
    }

    if tool == CREATE_FILE {
        return;
    }

    out.push_str("\n```\n");
    if let Some(old) = params.get("oldString") {
        let old = truncate(&display_value(old), OLD_STRING_LIMIT, "...");
        writeln!(out, "# Replacing:\n{old}\n").unwrap();
    }
    if let Some(new) = params.get("code").or_else(|| params.get("newString")) {
        let new = truncate(&display_value(new), NEW_STRING_LIMIT, "...");
        writeln!(out, "# With:\n{new}").unwrap();
    }
    out.push_str("```\n");
}

/// Keeps the parameters worth showing for a generic tool: the
/// [`ALWAYS_SHOWN`] keys plus any short string.
fn filter_parameters(params: &Parameters) -> Parameters {
    params
        .iter()
        .filter_map(|(key, value)| {
            if ALWAYS_SHOWN.contains(&key.as_str()) {
                return Some((key.clone(), value.clone()));
            }
            value
                .as_str()
                .filter(|s| s.chars().count() < SHORT_PARAMETER_LIMIT)
                .map(|s| (key.clone(), Value::String(unescape_newlines(s))))
        })
        .collect()
}

fn render_json_block(out: &mut String, params: &Parameters) {
    let json = serde_json::to_string_pretty(params).unwrap_or_default();
    writeln!(out, "**Parameters:**\n```json\n{json}\n```").unwrap();
}

fn render_result(out: &mut String, tool: Option<&str>, result: &ToolResult) {
    if result.outputs.is_empty() {
        return;
    }

    if result.is_error {
        out.push_str("**Error:**\n");
    } else if tool.is_some_and(|name| FILE_TOOLS.contains(&name)) {
        out.push_str("**Result:** File operation completed\n");
        return;
    } else {
        out.push_str("**Output:**\n");
    }

    for text in result.outputs.iter().filter_map(OutputItem::display_text) {
        let text = truncate(
            &unescape_newlines(text),
            OUTPUT_LIMIT,
            "\n... (output truncated)",
        );
        writeln!(out, "```\n{text}\n```").unwrap();
    }
}

/// Returns a string parameter in display form, empty when absent.
fn string_param(params: &Parameters, key: &str) -> String {
    params.get(key).map(display_value).unwrap_or_default()
}

/// Replaces literal `\n` escape sequences with real newlines.
fn unescape_newlines(s: &str) -> String {
    s.replace("\\n", "\n")
}

/// Cuts `s` to its first `limit` characters and appends `suffix`, if it is
/// longer than `limit`.
fn truncate(s: &str, limit: usize, suffix: &str) -> String {
    match s.char_indices().nth(limit) {
        Some((end, _)) => format!("{}{suffix}", &s[..end]),
        None => s.to_owned(),
    }
}

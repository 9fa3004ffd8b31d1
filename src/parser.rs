// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Loading and parsing of exported Copilot chat sessions.
//!
//! The export format is loosely structured: almost every field may be
//! missing, and a few fields change shape depending on the element that
//! carries them. This module resolves all of that once, at parse time, into
//! the typed [`ChatDocument`] tree. Missing fields become documented
//! defaults, so the renderer never has to inspect raw JSON except for tool
//! parameters, which are inherently free-form.
//!
//! # Format Overview
//!
//! A chat export contains:
//! - The requester and responder usernames
//! - A list of requests, each with a user message, attached variables
//!   (referenced files) and a list of response parts
//! - Response parts carrying text, inline references, code block headers
//!   and serialized tool invocations
//!
//! # Example
//!
//! ```
//! use chat2md::parser::{parse_chat, ResponsePart};
//!
//! let json = r#"{
//!     "requesterUsername": "Alice",
//!     "requests": [{
//!         "message": { "text": "Hello" },
//!         "response": [{ "value": "Hi there!" }]
//!     }]
//! }"#;
//!
//! let chat = parse_chat(json).unwrap();
//! assert_eq!(chat.requester_username, "Alice");
//! assert_eq!(chat.responder_username, "GitHub Copilot");
//! assert_eq!(chat.turns[0].response_parts[0], ResponsePart::PlainText("Hi there!".into()));
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};
use snafu::prelude::*;
use std::io;
use std::path::{Path, PathBuf};

/// Requester name used when the export does not name one.
pub const DEFAULT_REQUESTER: &str = "Unknown User";

/// Responder name used when the export does not name one.
pub const DEFAULT_RESPONDER: &str = "GitHub Copilot";

/// Display name used for files and paths that carry no name.
pub const UNKNOWN_FILE: &str = "Unknown File";

/// Display name used for inline references that carry no name.
pub const UNKNOWN_REFERENCE: &str = "Unknown Reference";

/// Error type for JSON parsing failures.
#[derive(Debug, Snafu)]
pub enum ParseError {
    /// Failed to parse JSON content.
    #[snafu(display("failed to parse JSON: {source}"))]
    Json {
        /// The underlying JSON parsing error.
        source: serde_json::Error,
    },
}

/// Error type for loading a chat export from disk.
#[derive(Debug, Snafu)]
pub enum LoadError {
    /// The input file does not exist.
    #[snafu(display("file not found: {}", path.display()))]
    NotFound {
        /// The path that was requested.
        path: PathBuf,
    },

    /// The input file exists but is not valid JSON.
    #[snafu(display("invalid JSON in {}: {source}", path.display()))]
    Malformed {
        /// The path that was read.
        path: PathBuf,
        /// The parse failure.
        source: ParseError,
    },

    /// Any other failure while reading the input file.
    #[snafu(display("failed to read {}: {source}", path.display()))]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

/// The root of a chat export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatDocument {
    /// The user's display name, or [`DEFAULT_REQUESTER`].
    pub requester_username: String,

    /// The assistant's display name, or [`DEFAULT_RESPONDER`].
    pub responder_username: String,

    /// The request/response exchanges in document order.
    pub turns: Vec<Turn>,
}

/// One user request together with the assistant's response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Turn {
    /// The user's message, empty when absent.
    pub user_text: String,

    /// Unix timestamp in milliseconds when the request was made.
    pub timestamp: Option<i64>,

    /// Variables attached to the request as context, files or not.
    pub referenced_files: Vec<FileRef>,

    /// The fragments making up the assistant's response.
    pub response_parts: Vec<ResponsePart>,
}

/// A variable attached to a request.
///
/// Only file variables with a path are listed, but any variable at all
/// makes the request show a referenced-files section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// The name shown for the file (e.g. `main.rs`).
    pub display_name: String,

    /// Whether the variable is a file, as opposed to a tool, prompt text
    /// or folder.
    pub is_file: bool,

    /// Absolute path on disk, if the export recorded a non-empty one.
    pub filesystem_path: Option<String>,
}

/// A fragment of an assistant response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    /// Markdown text emitted by the assistant.
    PlainText(String),

    /// A symbol or file mentioned inline.
    InlineReference {
        /// The referenced name, or [`UNKNOWN_REFERENCE`].
        name: String,
    },

    /// Marks the file that the following code block belongs to.
    CodeBlockHeader {
        /// Path of the file, empty when absent.
        file_path: String,
    },

    /// A tool call requested by the assistant.
    ToolInvocation(ToolInvocation),

    /// A part whose `value` is itself an object (e.g. MCP progress
    /// messages). Holds the inner `value` string, empty when absent.
    NestedValue(String),

    /// Anything not recognised above. Renders as nothing.
    Other,
}

/// A serialized tool invocation.
///
/// The export does not reliably say which tool was called; see
/// [`crate::tools::identify_tool`] for how the name is inferred.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolInvocation {
    /// The "Using ..." message shown while the tool ran, empty when absent.
    pub invocation_message: String,

    /// The raw input parameters, in document order.
    pub raw_parameters: Map<String, Value>,

    /// The tool name recorded in the tool metadata, if any.
    pub declared_name: Option<String>,

    /// The result details, present when the export recorded any.
    pub result: Option<ToolResult>,
}

/// The recorded outcome of a tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolResult {
    /// Output items in document order.
    pub outputs: Vec<OutputItem>,

    /// Whether the tool reported failure.
    pub is_error: bool,
}

/// One item of tool output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    /// An object item; holds its `value` string, empty when absent.
    Structured(String),

    /// A bare JSON value, in display form.
    Scalar(String),
}

impl OutputItem {
    /// Returns the text to display, or `None` for a structured item with
    /// no value.
    #[must_use]
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Self::Structured(text) if text.is_empty() => None,
            Self::Structured(text) | Self::Scalar(text) => Some(text),
        }
    }
}

impl ChatDocument {
    fn from_json(value: &Value) -> Self {
        let turns = value
            .get("requests")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(Turn::from_json)
            .collect();

        Self {
            requester_username: get_string(value, &["requesterUsername"])
                .unwrap_or_else(|| DEFAULT_REQUESTER.to_owned()),
            responder_username: get_string(value, &["responderUsername"])
                .unwrap_or_else(|| DEFAULT_RESPONDER.to_owned()),
            turns,
        }
    }
}

impl Turn {
    fn from_json(value: &Value) -> Self {
        let response_parts = value
            .get("response")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .map(ResponsePart::from_json)
            .collect();

        Self {
            user_text: get_string(value, &["message", "text"]).unwrap_or_default(),
            timestamp: value.get("timestamp").and_then(Value::as_i64),
            referenced_files: extract_referenced_files(value),
            response_parts,
        }
    }
}

impl ResponsePart {
    fn from_json(value: &Value) -> Self {
        match get_str(value, &["kind"]) {
            Some("inlineReference") => {
                return Self::InlineReference {
                    name: get_string(value, &["inlineReference", "name"])
                        .or_else(|| get_string(value, &["name"]))
                        .unwrap_or_else(|| UNKNOWN_REFERENCE.to_owned()),
                };
            }
            Some("codeblockUri") => {
                return Self::CodeBlockHeader {
                    file_path: get_string(value, &["uri", "fsPath"])
                        .or_else(|| get_string(value, &["uri", "path"]))
                        .unwrap_or_default(),
                };
            }
            Some("toolInvocationSerialized") => {
                return Self::ToolInvocation(ToolInvocation::from_json(value));
            }
            // Other kinds still render when they carry a usable value.
            _ => {}
        }

        match value.get("value") {
            Some(Value::String(text)) if !text.is_empty() => Self::PlainText(text.clone()),
            Some(Value::Object(map)) if !map.is_empty() => Self::NestedValue(
                map.get("value")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            ),
            _ => Self::Other,
        }
    }
}

impl ToolInvocation {
    fn from_json(value: &Value) -> Self {
        let invocation_message = match value.get("invocationMessage") {
            Some(Value::Object(message)) => message.get("value"),
            other => other,
        }
        .filter(|message| is_truthy(message))
        .map(display_value)
        .unwrap_or_default();

        let raw_parameters = value
            .get("toolSpecificData")
            .and_then(|data| data.get("rawInput"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let declared_name = get_string(value, &["toolSpecificData", "tool", "name"])
            .filter(|name| !name.is_empty());

        let result = value
            .get("resultDetails")
            .and_then(Value::as_object)
            .filter(|details| !details.is_empty())
            .map(|details| ToolResult {
                outputs: details
                    .get("output")
                    .and_then(Value::as_array)
                    .into_iter()
                    .flatten()
                    .map(OutputItem::from_json)
                    .collect(),
                is_error: details
                    .get("isError")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            });

        Self {
            invocation_message,
            raw_parameters,
            declared_name,
            result,
        }
    }
}

impl OutputItem {
    fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(_) => {
                Self::Structured(value.get("value").map(display_value).unwrap_or_default())
            }
            other => Self::Scalar(display_value(other)),
        }
    }
}

impl<'de> Deserialize<'de> for ChatDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

/// Extracts the variables from `variableData.variables`.
fn extract_referenced_files(value: &Value) -> Vec<FileRef> {
    value
        .get("variableData")
        .and_then(|data| data.get("variables"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|var| FileRef {
            display_name: get_string(var, &["name"]).unwrap_or_else(|| UNKNOWN_FILE.to_owned()),
            is_file: get_str(var, &["kind"]) == Some("file"),
            filesystem_path: get_string(var, &["value", "fsPath"])
                .or_else(|| get_string(var, &["value", "uri", "fsPath"]))
                .filter(|path| !path.is_empty()),
        })
        .collect()
}

/// Navigates a JSON path and returns the string value at the end.
///
/// # Arguments
///
/// * `value` - The root JSON value to navigate from
/// * `path` - A sequence of keys to follow through the JSON structure
fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    current.as_str()
}

/// Like [`get_str`] but returns an owned `String`.
fn get_string(value: &Value, path: &[&str]) -> Option<String> {
    get_str(value, path).map(str::to_owned)
}

/// Returns the display form of a JSON value: strings verbatim, `null` as
/// empty, anything else as compact JSON.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Mirrors JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are
/// false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Parses a JSON string into a [`ChatDocument`].
///
/// The schema is not validated: any syntactically valid JSON yields a
/// document, with defaults substituted for whatever is missing.
///
/// # Errors
///
/// Returns an error if the input is not valid JSON.
///
/// # Example
///
/// ```
/// use chat2md::parser::parse_chat;
///
/// let chat = parse_chat(r#"{"responderUsername": "Bot"}"#).unwrap();
/// assert_eq!(chat.responder_username, "Bot");
/// assert!(chat.turns.is_empty());
/// ```
pub fn parse_chat(json_str: &str) -> Result<ChatDocument, ParseError> {
    serde_json::from_str(json_str).context(JsonSnafu)
}

/// Reads and parses the chat export at `path`.
///
/// # Errors
///
/// Returns [`LoadError::NotFound`] if the file does not exist,
/// [`LoadError::Malformed`] if it is not valid JSON, and [`LoadError::Io`]
/// for any other read failure (including non-UTF-8 content).
pub fn load_chat(path: impl AsRef<Path>) -> Result<ChatDocument, LoadError> {
    let path = path.as_ref();
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return NotFoundSnafu { path }.fail();
        }
        Err(err) => return Err(err).context(IoSnafu { path }),
    };
    parse_chat(&json).context(MalformedSnafu { path })
}

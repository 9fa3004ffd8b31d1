// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Integration tests for chat2md loading and rendering.

use chat2md::parser::{self, LoadError};
use chat2md::renderer::{self, RenderOptions};
use std::fs;
use std::path::Path;

fn convert(json: &str) -> String {
    let chat = parser::parse_chat(json).unwrap();
    renderer::render_chat(&chat, &RenderOptions::default())
}

/// Loads and renders every export in the chats directory.
#[test]
fn parses_all_sample_chats() {
    let chats_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("chats");
    let mut rendered = 0;

    for entry in fs::read_dir(&chats_dir).expect("Failed to read chats directory") {
        let entry = entry.expect("Failed to read directory entry");
        let path = entry.path();

        if path.extension().is_some_and(|ext| ext == "json") {
            let chat = parser::load_chat(&path)
                .unwrap_or_else(|e| panic!("Failed to load {}: {e}", path.display()));

            let markdown = renderer::render_chat(&chat, &RenderOptions::default());

            assert!(
                markdown.starts_with("# Chat Conversation\n\n**Participants:** "),
                "Invalid markdown header in {}",
                path.display()
            );
            rendered += 1;
        }
    }

    assert!(rendered > 0, "No sample chats in {}", chats_dir.display());
}

#[test]
fn renders_sample_session() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("chats/sample_session.json");
    let chat = parser::load_chat(&path).unwrap();
    let markdown = renderer::render_chat(&chat, &RenderOptions::default());

    assert!(markdown.contains("**Participants:** octocat ↔ GitHub Copilot\n\n"));
    assert!(markdown.contains(
        "**1.** Why does the build fail?\n\n**Referenced Files:**\n\
         - `main.rs` - /home/octocat/project/src/main.rs\n\n"
    ));
    assert!(markdown.contains(
        "**Tool Call:** run_in_terminal\n**Command:** Build the project\n\
         ```bash\ncargo build\n```\n**Error:**\n```\n\
         error[E0425]: cannot find value `count` in this scope\n --> src/main.rs:4:20\n```"
    ));
    assert!(
        markdown.contains("declared in [main]. Here is the fix:\n\n**File:** `main.rs`\n```rust")
    );
    assert_eq!(markdown.matches("\n---\n").count(), 1);
    assert!(markdown.contains("**2.** Apply it for me\n\n**Tool Call:** replace_string_in_file\n"));
    assert!(markdown.contains("# Replacing:\nprintln!(\"{count}\");\nlet count = 3;\n\n"));
    assert!(markdown.contains("**Result:** File operation completed\n"));
    assert!(!markdown.contains("Edited main.rs"));
    assert!(markdown.ends_with("Done. The build should pass now.\n\n"));
}

#[test]
fn loads_chat_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.json");
    fs::write(&path, r#"{"requesterUsername": "Alice", "requests": []}"#).unwrap();

    let chat = parser::load_chat(&path).unwrap();
    assert_eq!(chat.requester_username, "Alice");
}

#[test]
fn reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.json");

    let err = parser::load_chat(&path).unwrap_err();
    assert!(matches!(err, LoadError::NotFound { .. }), "{err:?}");
    assert!(err.to_string().contains("missing.json"));
}

#[test]
fn reports_malformed_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ \"requests\": [").unwrap();

    let err = parser::load_chat(&path).unwrap_err();
    assert!(matches!(err, LoadError::Malformed { .. }), "{err:?}");
}

#[test]
fn reports_other_read_failures() {
    let dir = tempfile::tempdir().unwrap();

    // Reading a directory as a file fails without being "not found".
    let err = parser::load_chat(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }), "{err:?}");

    let path = dir.path().join("latin1.json");
    fs::write(&path, b"{\"requesterUsername\": \"caf\xe9\"}").unwrap();
    let err = parser::load_chat(&path).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }), "{err:?}");
}

#[test]
fn renders_simple_conversation() {
    let output = convert(
        r#"{
            "requesterUsername": "Alice",
            "responderUsername": "Bot",
            "requests": [{"message": {"text": "Hi"}, "response": [{"value": "Hello!"}]}]
        }"#,
    );

    assert!(output.contains("**Participants:** Alice ↔ Bot"));
    assert!(output.contains("**1.** Hi"));
    assert!(output.contains("Hello!"));
    assert!(!output.contains("---"));
}

#[test]
fn renders_default_participants() {
    let output = convert(r#"{"requests": [{"message": {"text": "Hi"}, "response": []}]}"#);

    assert!(output.contains("**Participants:** Unknown User ↔ GitHub Copilot"));
    assert!(output.ends_with("**1.** Hi\n\n"));
}

#[test]
fn separates_turns() {
    let turn = r#"{"message": {"text": "q"}, "response": [{"value": "a"}]}"#;
    for n in 1..=4 {
        let turns = vec![turn; n].join(",");
        let output = convert(&format!(r#"{{"requests": [{turns}]}}"#));

        assert_eq!(output.matches("\n---\n").count(), n - 1);
        assert!(!output.trim_end().ends_with("---"));
    }
}

#[test]
fn renders_create_file_call() {
    let output = convert(
        r#"{
            "requests": [{
                "message": {"text": "Make a file"},
                "response": [{
                    "kind": "toolInvocationSerialized",
                    "toolSpecificData": {"rawInput": {"filePath": "/a/b.py", "content": "x=1"}}
                }]
            }]
        }"#,
    );

    assert!(output.contains("**Tool Call:** create_file"));
    assert!(output.contains("**File:** `b.py`"));
    assert!(!output.contains("**Parameters:**"));
    assert!(!output.contains("x=1"));
}

#[test]
fn renders_terminal_error_output() {
    let output = convert(
        r#"{
            "requests": [{
                "message": {"text": "Build it"},
                "response": [{
                    "kind": "toolInvocationSerialized",
                    "invocationMessage": {"value": "Using \"Run In Terminal\""},
                    "toolSpecificData": {"rawInput": {"command": "make", "explanation": "Build"}},
                    "resultDetails": {"output": [{"value": "line1\\nline2"}], "isError": true}
                }]
            }]
        }"#,
    );

    assert!(output.contains("**Tool Call:** run_in_terminal\n"));
    assert!(output.contains("**Command:** Build\n```bash\nmake\n```"));
    assert!(output.contains("**Error:**\n```\nline1\nline2\n```"));
}

#[test]
fn renders_mixed_response_parts() {
    let output = convert(
        r#"{
            "requests": [{
                "message": {"text": "Explain"},
                "variableData": {"variables": [
                    {"kind": "file", "name": "lib.rs", "value": {"fsPath": "/src/lib.rs"}}
                ]},
                "response": [
                    {"value": "See "},
                    {"kind": "inlineReference", "inlineReference": {"name": "render_chat"}},
                    {"value": " below.\n"},
                    {"kind": "codeblockUri", "uri": {"fsPath": "C:\\src\\lib.rs"}},
                    {"value": "```rust\npub mod parser;\n```\n\n\n\n"},
                    {"value": {"value": "Done"}},
                    {"kind": "undoStop"}
                ]
            }]
        }"#,
    );

    assert!(output.contains("**Referenced Files:**\n- `lib.rs` - /src/lib.rs\n\n"));
    assert!(output.contains("See [render_chat] below.\n\n**File:** `lib.rs`\n```rust"));
    assert!(output.contains("```\n\n*Done*\n\n"));
}

#[test]
fn renders_referenced_files_header_for_non_file_variables() {
    let output = convert(
        r#"{
            "requests": [{
                "message": {"text": "Hi"},
                "variableData": {"variables": [
                    {"kind": "promptText", "name": "instructions", "value": "Be brief"}
                ]},
                "response": []
            }]
        }"#,
    );

    assert!(output.ends_with("**1.** Hi\n\n**Referenced Files:**\n\n"));
}

#[test]
fn renders_falsy_invocation_message_as_empty() {
    let output = convert(
        r#"{
            "requests": [{
                "message": {"text": "Go"},
                "response": [
                    {"kind": "toolInvocationSerialized", "invocationMessage": false},
                    {"kind": "toolInvocationSerialized", "invocationMessage": {"value": 0}}
                ]
            }]
        }"#,
    );

    assert!(!output.contains("**Tool Call:**"));
    assert!(output.ends_with("**1.** Go\n\n"));
}

#[test]
fn rendering_is_idempotent() {
    let json = r#"{
        "requests": [{
            "message": {"text": "Search"},
            "response": [{
                "kind": "toolInvocationSerialized",
                "toolSpecificData": {"rawInput": {"query": "parser", "maxResults": 5}},
                "resultDetails": {"output": ["one", {"value": "two"}]}
            }]
        }]
    }"#;
    let chat = parser::parse_chat(json).unwrap();
    let opts = RenderOptions::default();

    assert_eq!(
        renderer::render_chat(&chat, &opts),
        renderer::render_chat(&chat, &opts)
    );
}

// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Convert exported Copilot chat sessions to Markdown.
//!
//! This crate turns the JSON transcript that GitHub Copilot Chat exports
//! into a readable Markdown document, expanding the tool calls the
//! assistant made (terminal commands, file edits, searches) into fenced
//! code blocks.
//!
//! # Overview
//!
//! Conversion is a one-way pipeline:
//!
//! 1. [`parser`] loads the JSON into a typed tree, substituting defaults
//!    for anything missing
//! 2. [`renderer`] walks the conversation, its turns and their response
//!    parts
//! 3. [`tools`] recognises each tool invocation and formats its
//!    parameters and output
//!
//! # Example
//!
//! ```no_run
//! use chat2md::{parser, renderer};
//!
//! let chat = parser::load_chat("chat.json").unwrap();
//! let markdown = renderer::render_chat(&chat, &renderer::RenderOptions::default());
//! std::fs::write("chat_conversation.md", markdown).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`parser`]: loading, JSON parsing and the typed document model
//! - [`renderer`]: Markdown generation for conversations and turns
//! - [`tools`]: tool identification and tool-call formatting

#![deny(missing_docs)]

pub mod parser;
pub mod renderer;
pub mod tools;

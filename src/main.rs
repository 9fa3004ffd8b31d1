// SPDX-License-Identifier: GPL-3.0-only
// Copyright (C) 2025 Brian Hetro <whee@smaertness.net>

//! Command-line interface for chat2md.
//!
//! This binary provides the `chat2md` command for converting exported
//! Copilot chat sessions from JSON to Markdown.

use chat2md::parser::{self, LoadError};
use chat2md::renderer;
use lexopt::prelude::*;
use snafu::{OptionExt, ensure, prelude::*};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

const DEFAULT_INPUT: &str = "chat.json";
const DEFAULT_OUTPUT: &str = "chat_conversation.md";

struct Cli {
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    options: renderer::RenderOptions,
    quiet: bool,
    dry_run: bool,
}

#[derive(Debug, Snafu)]
enum Error {
    #[snafu(display("failed to parse arguments: {source}"))]
    ParseArgs { source: lexopt::Error },

    #[snafu(display("failed to load chat data: {source}"))]
    Load { source: LoadError },

    #[snafu(display("cannot write a directory of conversions to stdout"))]
    DirectoryToStdout,

    #[snafu(display("invalid input filename: no file stem"))]
    InvalidFilename,

    #[snafu(display("failed to create output directory {}: {source}", path.display()))]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Error {
    /// Process exit code for this failure.
    const fn exit_code(&self) -> u8 {
        match self {
            Self::ParseArgs { .. } | Self::DirectoryToStdout | Self::InvalidFilename => 1,
            Self::Load {
                source: LoadError::NotFound { .. },
            } => 2,
            Self::Load {
                source: LoadError::Malformed { .. },
            } => 3,
            Self::Load {
                source: LoadError::Io { .. },
            }
            | Self::CreateOutputDir { .. }
            | Self::WriteFile { .. } => 4,
        }
    }
}

fn print_help() {
    println!(
        "\
{name} {version}
Convert exported Copilot chat sessions to Markdown

Usage: {name} [OPTIONS] [INPUT] [OUTPUT]

Arguments:
  [INPUT]   Chat export JSON file, or a directory of exports (default: {DEFAULT_INPUT})
  [OUTPUT]  Markdown file, directory for directory input, or - for stdout
            (default: INPUT with .json replaced by .md, or {DEFAULT_OUTPUT})

Display options (use --show-* or --hide-*):
      --show-tools          Expand tool invocations (default: on)
      --hide-tools          Omit tool invocations
      --show-references     List referenced files (default: on)
      --hide-references     Omit referenced files
      --show-timestamps     Include request timestamps (default: off)
      --hide-timestamps     Hide request timestamps

Other options:
  -q, --quiet               Suppress progress messages
  -n, --dry-run             Convert without writing any output
  -h, --help                Print help
  -V, --version             Print version",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn parse_args() -> Result<Cli, lexopt::Error> {
    let mut input = None;
    let mut output = None;
    let mut options = renderer::RenderOptions::default();
    let mut quiet = false;
    let mut dry_run = false;

    let mut parser = lexopt::Parser::from_env();
    while let Some(arg) = parser.next()? {
        match arg {
            // Show/hide flags - last one wins
            Long("show-tools") => options.show_tools = true,
            Long("hide-tools") => options.show_tools = false,
            Long("show-references") => options.show_references = true,
            Long("hide-references") => options.show_references = false,
            Long("show-timestamps") => options.show_timestamps = true,
            Long("hide-timestamps") => options.show_timestamps = false,
            Short('q') | Long("quiet") => quiet = true,
            Short('n') | Long("dry-run") => dry_run = true,
            Short('h') | Long("help") => {
                print_help();
                std::process::exit(0);
            }
            Short('V') | Long("version") => {
                println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            Value(val) if input.is_none() => input = Some(PathBuf::from(val)),
            Value(val) if output.is_none() => output = Some(PathBuf::from(val)),
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(Cli {
        input,
        output,
        options,
        quiet,
        dry_run,
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            if matches!(err, Error::Load { .. } | Error::ParseArgs { .. }) {
                eprintln!(
                    "Usage: {} [OPTIONS] [INPUT] [OUTPUT]",
                    env!("CARGO_PKG_NAME")
                );
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run() -> Result<(), Error> {
    let cli = parse_args().context(ParseArgsSnafu)?;

    let input = cli
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT));

    if input.is_dir() {
        return convert_directory(&input, cli.output.as_deref(), &cli);
    }

    let output = match (&cli.input, &cli.output) {
        (_, Some(output)) => output.clone(),
        (Some(input), None) => derive_output_path(input),
        (None, None) => PathBuf::from(DEFAULT_OUTPUT),
    };
    convert_file(&input, &output, &cli)
}

/// Derives the Markdown path for an input: a trailing `.json` becomes
/// `.md`, anything else gets `.md` appended.
fn derive_output_path(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|ext| ext == "json") {
        input.with_extension("md")
    } else {
        let mut path = input.as_os_str().to_owned();
        path.push(".md");
        PathBuf::from(path)
    }
}

/// Collects all JSON files below a directory, in a stable order.
fn collect_input_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Converts every export below `dir`, writing each next to its input or
/// into `out_dir` when given.
fn convert_directory(dir: &Path, out_dir: Option<&Path>, cli: &Cli) -> Result<(), Error> {
    ensure!(
        out_dir.is_none_or(|path| path != Path::new("-")),
        DirectoryToStdoutSnafu
    );

    let files = collect_input_files(dir);
    if files.is_empty() {
        if !cli.quiet {
            eprintln!("No JSON files found in {}", dir.display());
        }
        return Ok(());
    }

    if let Some(out_dir) = out_dir
        && !cli.dry_run
    {
        std::fs::create_dir_all(out_dir).context(CreateOutputDirSnafu { path: out_dir })?;
    }

    for file in &files {
        let target = match out_dir {
            Some(out_dir) => {
                let stem = file.file_stem().context(InvalidFilenameSnafu)?;
                out_dir.join(format!("{}.md", stem.to_string_lossy()))
            }
            None => derive_output_path(file),
        };
        convert_file(file, &target, cli)?;
    }

    if !cli.quiet {
        eprintln!("Converted {} files", files.len());
    }
    Ok(())
}

/// Loads, renders and writes a single export. Nothing is written unless
/// rendering completes.
fn convert_file(input: &Path, output: &Path, cli: &Cli) -> Result<(), Error> {
    if !cli.quiet {
        eprintln!("Loading chat data from {}...", input.display());
    }
    let chat = parser::load_chat(input).context(LoadSnafu)?;

    if !cli.quiet {
        eprintln!("Converting to Markdown format...");
    }
    let markdown = renderer::render_chat(&chat, &cli.options);

    if output == Path::new("-") {
        if !cli.dry_run {
            print!("{markdown}");
        }
        return Ok(());
    }

    if cli.dry_run {
        eprintln!("Would write {}", output.display());
        return Ok(());
    }

    if !cli.quiet {
        eprintln!("Saving to {}...", output.display());
    }
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context(CreateOutputDirSnafu { path: parent })?;
    }
    std::fs::write(output, &markdown).context(WriteFileSnafu { path: output })?;

    if !cli.quiet {
        eprintln!(
            "Wrote {} ({} lines of Markdown)",
            output.display(),
            markdown.lines().count()
        );
    }
    Ok(())
}

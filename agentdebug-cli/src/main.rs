// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Agentdebug CLI
//!
//! Inspect multi-agent session histories: summarize sessions, list the
//! messages of a session, render the timeline, run a scripted
//! edit-and-revert demo against the local runtime, and resume a saved run.

mod config;
mod demo;

use agentdebug_core::{
    is_inherited, locate, render_svg, ColorField, FilterState, HistorySnapshot, HoverState,
    Overview, ScoreGlyph, Selection, SessionId, Timestamp,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{load_snapshot, CliConfig};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "agentdebug")]
#[command(about = "Agentdebug - multi-agent session history inspector", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Classification and selection shared by the view commands.
#[derive(clap::Args, Clone)]
struct ViewArgs {
    /// Field used for color and filtering: none, type, sender, recipient
    #[arg(long, default_value = "type")]
    color_by: ColorField,

    /// Only keep messages whose field has this value
    #[arg(long, conflicts_with = "select_missing")]
    select: Option<String>,

    /// Only keep messages where the field is absent
    #[arg(long)]
    select_missing: bool,

    /// Timestamp of the hovered message
    #[arg(long)]
    hover: Option<Timestamp>,
}

impl ViewArgs {
    fn filter(&self) -> FilterState {
        let mut filter = FilterState::new(self.color_by);
        if let Some(value) = &self.select {
            filter.toggle(Selection::Value(value.clone()));
        } else if self.select_missing {
            filter.toggle(Selection::Missing);
        }
        filter
    }

    fn hover(&self) -> HoverState {
        let mut hover = HoverState::new();
        if let Some(ts) = self.hover {
            hover.enter(ts);
        }
        hover
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LayoutFormat {
    Json,
    Svg,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a history snapshot
    Check {
        /// Snapshot file (JSON)
        snapshot: PathBuf,
    },

    /// Summarize every session in a snapshot
    Sessions {
        /// Snapshot file (JSON)
        snapshot: PathBuf,
    },

    /// List the visible messages of a session
    List {
        /// Snapshot file (JSON)
        snapshot: PathBuf,

        /// Session to list (defaults to the current one)
        #[arg(long)]
        session: Option<SessionId>,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Compute the timeline layout
    Layout {
        /// Snapshot file (JSON)
        snapshot: PathBuf,

        #[command(flatten)]
        view: ViewArgs,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: LayoutFormat,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Report the message drawn at a point of the timeline
    Inspect {
        /// Snapshot file (JSON)
        snapshot: PathBuf,

        x: f64,

        y: f64,
    },

    /// Run a scripted edit-and-revert session against the local runtime
    Demo {
        /// First operator request
        #[arg(long, default_value = "write a limerick about rust")]
        request: String,

        /// Request substituted by the edit
        #[arg(long, default_value = "write a haiku about rust")]
        revised: String,

        /// Steps to run before and after the edit
        #[arg(long, default_value = "4")]
        steps: usize,

        /// Write the final snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a saved run into the local runtime and keep going
    Resume {
        /// Snapshot file written by `demo` or `resume` (JSON)
        snapshot: PathBuf,

        /// Edit and replay from this message of the current session
        #[arg(long)]
        revert: Option<Timestamp>,

        /// Replacement request for the reverted message
        #[arg(long, requires = "revert")]
        revised: Option<String>,

        /// Publish a new request after resuming
        #[arg(long)]
        request: Option<String>,

        /// Steps to run after resuming
        #[arg(long, default_value = "4")]
        steps: usize,

        /// Write the final snapshot here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct SessionSummary {
    session_id: SessionId,
    current: bool,
    messages: usize,
    fork_timestamp: Option<Timestamp>,
    reset_index: Option<usize>,
    score: ScoreGlyph,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Check { snapshot } => {
            let history = load_snapshot(&snapshot)?;
            history
                .validate()
                .with_context(|| format!("Invalid snapshot {}", snapshot.display()))?;
            if cli.json {
                println!("{}", serde_json::json!({ "valid": true, "sessions": history.message_history.len() }));
            } else {
                println!(
                    "✓ {} is valid ({} sessions, current {})",
                    snapshot.display(),
                    history.message_history.len(),
                    history.current_session
                );
            }
        }

        Commands::Sessions { snapshot } => {
            let history = load_snapshot(&snapshot)?;
            let summaries = summarize(&history);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                for s in &summaries {
                    let marker = if s.current { "*" } else { " " };
                    let fork = match (s.fork_timestamp, s.reset_index) {
                        (Some(fork), Some(index)) => format!("forked at t={} (new from #{})", fork, index),
                        (Some(fork), None) => format!("forked at t={} (nothing new yet)", fork),
                        (None, _) => "original".to_string(),
                    };
                    println!(
                        "{} Session {:>3}  {:>4} messages  {}  {}",
                        marker,
                        s.session_id,
                        s.messages,
                        s.score.symbol(),
                        fork
                    );
                }
            }
        }

        Commands::List {
            snapshot,
            session,
            view,
        } => {
            let history = load_snapshot(&snapshot)?;
            let session_id = session.unwrap_or(history.current_session);
            let Some(session) = history.message_history.get(session_id) else {
                bail!("Session {} not found in {}", session_id, snapshot.display());
            };
            let filter = view.filter();
            let visible: Vec<_> = filter.filter_session(session).collect();

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&visible)?);
            } else {
                for message in visible {
                    let origin = if is_inherited(session, message) { "↺" } else { " " };
                    println!(
                        "{} [{:>4}] {:<36} {} -> {}: {}",
                        origin,
                        message.timestamp,
                        message.type_label(),
                        message.display_sender().unwrap_or("-"),
                        message.display_recipient().unwrap_or("-"),
                        message.payload.content_text()
                    );
                }
            }
        }

        Commands::Layout {
            snapshot,
            view,
            format,
            output,
        } => {
            let history = load_snapshot(&snapshot)?;
            let overview = Overview::build(&history, &view.filter(), view.hover(), &config.timeline);
            let rendered = match format {
                LayoutFormat::Json => serde_json::to_string_pretty(&overview)?,
                LayoutFormat::Svg => render_svg(&overview.layout),
            };
            emit(&rendered, output.as_deref())?;
            info!(
                nodes = overview.layout.nodes.len(),
                connectors = overview.layout.connectors.len(),
                "Layout written"
            );
        }

        Commands::Inspect { snapshot, x, y } => {
            let history = load_snapshot(&snapshot)?;
            let overview = Overview::build(
                &history,
                &FilterState::default(),
                HoverState::new(),
                &config.timeline,
            );
            let Some(node) = overview.layout.hit_test(x, y) else {
                bail!("No message drawn at ({}, {})", x, y);
            };
            let message = history
                .message_history
                .get(node.session_id)
                .and_then(|s| s.message_at(node.timestamp))
                .context("Layout referenced a message missing from the snapshot")?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(message)?);
            } else {
                println!("Session {} #{} at t={}", node.session_id, node.index, node.timestamp);
                println!("  {}", message.type_label());
                println!(
                    "  {} -> {}",
                    message.display_sender().unwrap_or("-"),
                    message.display_recipient().unwrap_or("-")
                );
                println!("{}", message.payload.to_draft());
            }
        }

        Commands::Demo {
            request,
            revised,
            steps,
            output,
        } => {
            let history = demo::run(
                demo::DemoOptions {
                    first_request: request,
                    revised_request: revised,
                    steps,
                },
                &config.runtime,
                config.poll.clone(),
            )
            .await?;
            emit(&serde_json::to_string_pretty(&history)?, output.as_deref())?;
            if !cli.json {
                log_sessions(&history);
            }
        }

        Commands::Resume {
            snapshot,
            revert,
            revised,
            request,
            steps,
            output,
        } => {
            let saved = load_snapshot(&snapshot)?;
            let history = demo::resume(
                saved,
                demo::ResumeOptions {
                    revert,
                    revised_request: revised,
                    request,
                    steps,
                },
                &config.runtime,
                config.poll.clone(),
            )
            .await?;
            emit(&serde_json::to_string_pretty(&history)?, output.as_deref())?;
            if !cli.json {
                log_sessions(&history);
            }
        }
    }

    Ok(())
}

fn summarize(history: &HistorySnapshot) -> Vec<SessionSummary> {
    history
        .message_history
        .iter()
        .map(|(session_id, session)| SessionSummary {
            session_id,
            current: session_id == history.current_session,
            messages: session.len(),
            fork_timestamp: session.fork_timestamp,
            reset_index: locate(session),
            score: ScoreGlyph::from_score(session.score.as_ref()),
        })
        .collect()
}

fn log_sessions(history: &HistorySnapshot) {
    for s in summarize(history) {
        info!(
            session_id = s.session_id,
            messages = s.messages,
            score = s.score.symbol(),
            "Session"
        );
    }
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Output written");
        }
        None => println!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentdebug_core::{Message, MessageKind, Payload, ScoreResult, Session, SessionHistoryMap};

    #[test]
    fn test_cli_parses_layout_flags() {
        let cli = Cli::try_parse_from([
            "agentdebug",
            "--json",
            "layout",
            "history.json",
            "--color-by",
            "sender",
            "--select",
            "writer",
            "--format",
            "svg",
        ])
        .unwrap();
        let Commands::Layout { view, format, .. } = cli.command else {
            panic!("expected layout command");
        };
        assert!(cli.json);
        assert!(matches!(format, LayoutFormat::Svg));
        let filter = view.filter();
        assert_eq!(filter.field(), ColorField::Sender);
        assert_eq!(filter.selected(), Some(&Selection::Value("writer".into())));
    }

    #[test]
    fn test_select_and_select_missing_conflict() {
        assert!(Cli::try_parse_from([
            "agentdebug",
            "list",
            "h.json",
            "--select",
            "a",
            "--select-missing"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_parses_resume_flags() {
        let cli = Cli::try_parse_from([
            "agentdebug",
            "resume",
            "run.json",
            "--revert",
            "4",
            "--revised",
            "write a haiku",
            "-o",
            "next.json",
        ])
        .unwrap();
        let Commands::Resume {
            revert,
            revised,
            steps,
            output,
            ..
        } = cli.command
        else {
            panic!("expected resume command");
        };
        assert_eq!(revert, Some(4));
        assert_eq!(revised.as_deref(), Some("write a haiku"));
        assert_eq!(steps, 4);
        assert_eq!(output, Some(PathBuf::from("next.json")));

        assert!(Cli::try_parse_from(["agentdebug", "resume", "run.json", "--revised", "x"]).is_err());
    }

    #[test]
    fn test_summarize_sessions() {
        let msg = |ts| {
            Message::new(ts, MessageKind::Publish, None, None, Payload::text_message("user", "x"))
        };
        let mut history = SessionHistoryMap::new();
        history.insert(0, Session::new(vec![msg(0), msg(1)]).with_score(ScoreResult::failed()));
        history.insert(1, Session::forked_from(vec![msg(0), msg(2)], 1));
        let summaries = summarize(&HistorySnapshot::new(1, history));

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].score, ScoreGlyph::Failed);
        assert!(!summaries[0].current);
        assert!(summaries[1].current);
        assert_eq!(summaries[1].reset_index, Some(1));
    }

    #[test]
    fn test_emit_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.svg");
        emit("<svg/>", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<svg/>");
    }
}

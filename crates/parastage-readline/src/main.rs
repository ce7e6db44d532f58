mod commands;
mod logging;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use parastage_application::StagingOrchestrator;
use parastage_core::parameters::format_value;
use parastage_core::{
    CurrentState, Document, NavigationResult, PendingSummary, ProposalResult,
    RegexParameterExtractor,
};
use parastage_infrastructure::{
    AssignmentProposer, ConfigService, OpenScadRenderer, ParastagePaths, TomlVersionRepository,
};

use crate::commands::{COMMANDS, Command};

const DEFAULT_PROJECT: &str = "default";

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<(String, String)>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS
                .iter()
                .map(|(name, args)| (name.to_string(), args.to_string()))
                .collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(line))
                .map(|(cmd, _)| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        self.commands
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, args)| {
                let rest = &cmd[line.len()..];
                if args.is_empty() {
                    rest.to_string()
                } else {
                    format!("{} {}", rest, args)
                }
            })
            .filter(|hint| !hint.is_empty())
    }
}

impl Validator for CliHelper {}

/// Entry point of the Parastage REPL.
///
/// Usage: `parastage [project-id]`. Each project id has its own history
/// under the data directory.
#[tokio::main]
async fn main() -> Result<()> {
    let project_id = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PROJECT.to_string());

    // ===== Configuration & logging =====
    let config_service = ConfigService::new(ParastagePaths::new(None)?);
    let config = config_service.get_config()?;
    let paths = config_service.effective_paths()?;
    let _log_guard = logging::init(&paths.logs_dir())?;
    tracing::info!("[Main] Starting parastage for project '{}'", project_id);

    // ===== Backend Initialization =====
    let repository = Arc::new(TomlVersionRepository::for_project(&paths, &project_id)?);
    let orchestrator = StagingOrchestrator::open(
        repository,
        Arc::new(AssignmentProposer::new()),
        Arc::new(OpenScadRenderer::new(&config.renderer)),
        Arc::new(RegexParameterExtractor),
        config,
    )
    .await
    .context("Failed to open project history")?;

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Parastage ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "Project '{}'. Type a change to propose it, '/help' for commands.",
            project_id
        )
        .bright_black()
    );
    print_status(&orchestrator.current_state().await);
    println!();

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let command = match commands::parse(trimmed) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message.yellow());
                        continue;
                    }
                };
                if command == Command::Quit {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                if let Err(e) = execute(&orchestrator, command).await {
                    println!("{}", format!("Error: {:#}", e).red());
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

async fn execute(orchestrator: &StagingOrchestrator, command: Command) -> Result<()> {
    match command {
        Command::Open { path, name } => {
            let source = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = name.or_else(|| project_name_from(&path));
            let committed = orchestrator
                .open_project(name, Document::new(source))
                .await?;
            println!(
                "{}",
                format!("Opened {} as version #{}", path.display(), committed.entry.sequence_number)
                    .green()
            );
            print_status(&orchestrator.current_state().await);
        }
        Command::Propose(instruction) => {
            println!("{}", "Working...".bright_black());
            match orchestrator.propose(&instruction).await? {
                ProposalResult::Staged(summary) => print_pending(&summary),
                ProposalResult::ClarificationNeeded {
                    question,
                    understood,
                } => {
                    if let Some(understood) = understood {
                        println!("{}", format!("Understood: {}", understood).bright_blue());
                    }
                    println!("{}", question.bright_yellow());
                }
                ProposalResult::NoChange => println!("{}", "No change needed.".bright_black()),
            }
        }
        Command::Approve(description) => {
            let committed = match description {
                Some(text) => orchestrator.approve_with_description(&text).await?,
                None => orchestrator.approve().await?,
            };
            println!(
                "{}",
                format!(
                    "Committed #{}: {}",
                    committed.entry.sequence_number, committed.entry.description
                )
                .green()
            );
            if let Some(evicted) = committed.evicted {
                println!("{}", format!("Version #{} dropped from history.", evicted).bright_black());
            }
        }
        Command::Reject => {
            orchestrator.reject().await;
            println!("{}", "Pending change discarded.".yellow());
        }
        Command::Undo => print_navigation(orchestrator.undo().await?),
        Command::Redo => print_navigation(orchestrator.redo().await?),
        Command::Restore(sequence_number) => {
            let restored = orchestrator.restore(sequence_number).await?;
            println!("{}", format!("Restored version #{}", restored.sequence_number).green());
            if restored.discarded_pending {
                println!("{}", "The pending change was discarded.".yellow());
            }
        }
        Command::History => {
            let head = orchestrator.current_state().await.head_sequence_number;
            let history = orchestrator.history().await;
            if history.is_empty() {
                println!("{}", "No history yet. Use /open to start.".bright_black());
            }
            for item in history {
                let marker = if Some(item.sequence_number) == head { "*" } else { " " };
                let line = format!(
                    "{} #{:<4} {}  {}",
                    marker,
                    item.sequence_number,
                    item.timestamp.format("%Y-%m-%d %H:%M"),
                    item.description
                );
                if marker == "*" {
                    println!("{}", line.bright_green());
                } else {
                    println!("{}", line);
                }
            }
        }
        Command::Describe(sequence_number, text) => {
            orchestrator.update_description(sequence_number, &text).await?;
            println!("{}", format!("Updated description of #{}", sequence_number).green());
        }
        Command::Status => print_status(&orchestrator.current_state().await),
        Command::Preview(path) => {
            let artifact = orchestrator
                .pending_artifact()
                .await
                .context("No rendered preview is pending")?;
            tokio::fs::write(&path, artifact.as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{}",
                format!("Wrote {} bytes to {}", artifact.len(), path.display()).green()
            );
        }
        Command::Rename(name) => {
            orchestrator.set_project_name(&name).await?;
            println!("{}", format!("Project renamed to '{}'", name).green());
        }
        Command::Clear => {
            orchestrator.clear_project().await?;
            println!("{}", "Project cleared.".yellow());
        }
        Command::Help => {
            for (name, args) in COMMANDS {
                println!("  {} {}", name.bright_cyan(), args.bright_black());
            }
            println!("  {}", "Any other text is proposed as a change.".bright_black());
        }
        Command::Quit => {}
    }
    Ok(())
}

fn project_name_from(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn print_navigation(result: NavigationResult) {
    match (result.moved, result.sequence_number) {
        (true, Some(n)) => println!("{}", format!("Now at version #{}", n).green()),
        _ => println!("{}", "Nothing to move to.".bright_black()),
    }
}

fn print_status(state: &CurrentState) {
    let Some(head) = state.head_sequence_number else {
        println!("{}", "No design loaded. Use /open <file.scad>.".bright_black());
        return;
    };

    let name = state.project_name.as_deref().unwrap_or("(unnamed)");
    println!("{}", format!("{} at version #{}", name, head).bright_magenta());
    if !state.head_parameters.is_empty() {
        let params: Vec<String> = state
            .head_parameters
            .iter()
            .map(|(n, v)| format!("{}={}", n, format_value(v)))
            .collect();
        println!("  {}", params.join("  "));
    }
    let mut moves = Vec::new();
    if state.can_undo {
        moves.push("/undo");
    }
    if state.can_redo {
        moves.push("/redo");
    }
    if !moves.is_empty() {
        println!("  {}", moves.join(" ").bright_black());
    }
    if let Some(pending) = &state.pending {
        print_pending(pending);
    }
}

fn print_pending(summary: &PendingSummary) {
    println!("{}", format!("Pending: {}", summary.description).bright_yellow());
    if summary.changes.is_empty() {
        println!("  {}", "(no parameter changes)".bright_black());
    }
    for change in &summary.changes {
        let old = change
            .old
            .map(format_value)
            .unwrap_or_else(|| "new".to_string());
        println!(
            "  {}: {} -> {}",
            change.name,
            old,
            format_value(change.new).bright_white()
        );
    }
    if let Some(size) = summary.artifact_size {
        println!("  {}", format!("preview rendered ({} bytes)", size).bright_black());
    }
    println!("{}", "/approve or /reject".bright_black());
}

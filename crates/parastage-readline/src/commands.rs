//! REPL command parsing.

use std::path::PathBuf;

/// Slash commands offered for completion, with their usage hints.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/open", "<file.scad> [name]"),
    ("/propose", "<instruction>"),
    ("/approve", "[description]"),
    ("/reject", ""),
    ("/undo", ""),
    ("/redo", ""),
    ("/restore", "<version>"),
    ("/history", ""),
    ("/describe", "<version> <text>"),
    ("/status", ""),
    ("/preview", "<file.stl>"),
    ("/rename", "<name>"),
    ("/clear", ""),
    ("/help", ""),
    ("/quit", ""),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Open { path: PathBuf, name: Option<String> },
    Propose(String),
    Approve(Option<String>),
    Reject,
    Undo,
    Redo,
    Restore(u64),
    History,
    Describe(u64, String),
    Status,
    Preview(PathBuf),
    Rename(String),
    Clear,
    Help,
    Quit,
}

/// Parses one input line. Text without a leading `/` is a proposal.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if !line.starts_with('/') {
        return Ok(Command::Propose(line.to_string()));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    match name {
        "/open" => {
            let (path, project_name) = match rest.split_once(char::is_whitespace) {
                Some((path, project_name)) => (path, Some(project_name.trim().to_string())),
                None => (rest, None),
            };
            if path.is_empty() {
                return Err(usage("/open"));
            }
            Ok(Command::Open {
                path: PathBuf::from(path),
                name: project_name,
            })
        }
        "/propose" => non_empty(rest, "/propose").map(Command::Propose),
        "/approve" => Ok(Command::Approve((!rest.is_empty()).then(|| rest.to_string()))),
        "/reject" => Ok(Command::Reject),
        "/undo" => Ok(Command::Undo),
        "/redo" => Ok(Command::Redo),
        "/restore" => version_number(rest, "/restore").map(Command::Restore),
        "/history" => Ok(Command::History),
        "/describe" => {
            let (number, text) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| usage("/describe"))?;
            let number = version_number(number, "/describe")?;
            Ok(Command::Describe(number, non_empty(text.trim(), "/describe")?))
        }
        "/status" => Ok(Command::Status),
        "/preview" => non_empty(rest, "/preview").map(|p| Command::Preview(PathBuf::from(p))),
        "/rename" => non_empty(rest, "/rename").map(Command::Rename),
        "/clear" => Ok(Command::Clear),
        "/help" => Ok(Command::Help),
        "/quit" | "/exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command {}. Type /help for a list.", other)),
    }
}

fn non_empty(text: &str, command: &str) -> Result<String, String> {
    if text.is_empty() {
        Err(usage(command))
    } else {
        Ok(text.to_string())
    }
}

fn version_number(text: &str, command: &str) -> Result<u64, String> {
    text.trim_start_matches('#')
        .parse()
        .map_err(|_| usage(command))
}

fn usage(command: &str) -> String {
    let args = COMMANDS
        .iter()
        .find(|(name, _)| *name == command)
        .map(|(_, args)| *args)
        .unwrap_or("");
    format!("Usage: {} {}", command, args)
}

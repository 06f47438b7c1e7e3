//! Line-oriented front end for `mrwatch watch`.

use anyhow::Result;
use console::Term;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::monitor::scheduler::{Command, SchedulerHandle};
use crate::monitor::MrId;
use crate::output::{dim, print_dashboard, DashboardView};

pub struct WatchOptions {
    pub show_drafts: bool,
    pub query: String,
    pub audit_lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Refresh,
    ToggleScope,
    ToggleDrafts,
    /// Replaces the search query; empty clears it
    Search(String),
    ToggleAutoRetry(MrId),
    ToggleExpanded(MrId),
    Open(MrId),
    Quit,
}

/// Parses one input line. A blank line parses to `None` and only redraws.
pub fn parse_line(line: &str) -> Result<Option<LineCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(query) = line.strip_prefix('/') {
        return Ok(Some(LineCommand::Search(query.trim().to_string())));
    }

    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let argument = parts.next();
    if parts.next().is_some() {
        return Err(format!("Too many arguments: {line}"));
    }

    let command = match (verb, argument) {
        ("f", None) => LineCommand::Refresh,
        ("a", None) => LineCommand::ToggleScope,
        ("d", None) => LineCommand::ToggleDrafts,
        ("q", None) => LineCommand::Quit,
        ("r", Some(iid)) => LineCommand::ToggleAutoRetry(parse_iid(iid)?),
        ("e", Some(iid)) => LineCommand::ToggleExpanded(parse_iid(iid)?),
        ("o", Some(iid)) => LineCommand::Open(parse_iid(iid)?),
        ("r" | "e" | "o", None) => return Err(format!("'{verb}' needs a merge request number")),
        _ => return Err(format!("Unknown command: {line}")),
    };
    Ok(Some(command))
}

/// Accepts `42` and `!42`.
fn parse_iid(text: &str) -> Result<MrId, String> {
    let digits = text.strip_prefix('!').unwrap_or(text);
    digits
        .parse()
        .map_err(|_| format!("Not a merge request number: {text}"))
}

/// Redraws on every published change and forwards commands typed on stdin
/// until `q` or end of input.
pub async fn run(handle: SchedulerHandle, options: WatchOptions) -> Result<()> {
    let WatchOptions {
        mut show_drafts,
        mut query,
        audit_lines,
    } = options;
    let mut snapshots = handle.snapshots();
    let mut status = handle.status();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let term = Term::stdout();
    let mut notice: Option<String> = None;

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let current_status = *status.borrow_and_update();
        term.clear_screen()?;
        print_dashboard(
            &snapshot,
            &DashboardView {
                show_drafts,
                query: &query,
                status: Some(current_status),
                audit_lines,
            },
        );
        if let Some(message) = &notice {
            println!("{}", dim(message));
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    handle.send(Command::Shutdown);
                    break;
                };
                notice = None;
                let command = match parse_line(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(message) => {
                        notice = Some(message);
                        continue;
                    }
                };
                debug!("Input command {command:?}");
                let forwarded = match command {
                    LineCommand::Quit => {
                        handle.send(Command::Shutdown);
                        break;
                    }
                    LineCommand::ToggleDrafts => {
                        show_drafts = !show_drafts;
                        true
                    }
                    LineCommand::Search(text) => {
                        query = text;
                        true
                    }
                    LineCommand::Refresh => handle.send(Command::ForceRefresh),
                    LineCommand::ToggleScope => handle.send(Command::ToggleScope),
                    LineCommand::ToggleAutoRetry(iid) => handle.send(Command::ToggleAutoRetry(iid)),
                    LineCommand::ToggleExpanded(iid) => handle.send(Command::ToggleExpanded(iid)),
                    LineCommand::Open(iid) => handle.send(Command::OpenInBrowser(iid)),
                };
                if !forwarded {
                    break;
                }
            }
        }
    }

    Ok(())
}

use std::fmt::Write;

use crate::monitor::scheduler::SchedulerStatus;
use crate::monitor::Snapshot;

use super::styling::{bright, bright_red, bright_yellow, cyan, dim};
use super::tables::{job_detail, merge_request_table};

const KEY_HELP: &str =
    "f refresh · a mine/all · d drafts · /text search · r <iid> auto-retry · e <iid> jobs · o <iid> open · q quit";

/// Presentation-only state layered over a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DashboardView<'a> {
    pub show_drafts: bool,
    pub query: &'a str,
    /// `None` for one-shot listings
    pub status: Option<SchedulerStatus>,
    pub audit_lines: usize,
}

/// Prints the merge request table, expanded job details and the retry log to stdout.
pub fn print_dashboard(snapshot: &Snapshot, view: &DashboardView<'_>) {
    println!("{}", render_dashboard(snapshot, view));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn header_line(snapshot: &Snapshot, view: &DashboardView<'_>) -> String {
    let drafts = if view.show_drafts { "ON" } else { "OFF" };
    let mut line = format!("MRs: {} | Drafts: {drafts}", snapshot.scope.label());
    if !view.query.is_empty() {
        let _ = write!(line, " | Search: {}", view.query);
    }
    if let Some(status) = view.status {
        let _ = write!(
            line,
            " | Next refresh: {}:{:02}",
            status.countdown_secs / 60,
            status.countdown_secs % 60
        );
        if status.in_flight {
            let _ = write!(line, " | {}", bright_yellow("refreshing..."));
        }
    }
    line
}

fn render_dashboard(snapshot: &Snapshot, view: &DashboardView<'_>) -> String {
    let mut output = String::new();
    let visible = snapshot.visible(view.show_drafts, view.query);

    let _ = writeln!(output, "{}\n", header_line(snapshot, view));

    add_section_header(
        &mut output,
        "🔀",
        &format!("Merge Requests ({} of {})", visible.len(), snapshot.rows.len()),
    );
    if visible.is_empty() {
        let _ = writeln!(output, "  {}", dim("No merge requests to show"));
    } else {
        let _ = writeln!(output, "{}", merge_request_table(&visible, view.query));
    }

    for row in visible.iter().filter(|row| row.intent.expanded) {
        let mr = &row.merge_request;
        let _ = writeln!(output);
        add_section_header(&mut output, "📋", &format!("Jobs for !{} {}", mr.iid, mr.title));
        if let Some(pipeline) = &mr.pipeline {
            if !pipeline.web_url.is_empty() {
                let _ = writeln!(output, "  {}", cyan(&pipeline.web_url));
            }
        }
        output.push_str(&job_detail(mr.pipeline.as_ref()));
    }

    if view.audit_lines > 0 && !snapshot.audit.is_empty() {
        let _ = writeln!(output);
        add_section_header(&mut output, "📜", "Retry Log");
        let skip = snapshot.audit.len().saturating_sub(view.audit_lines);
        for entry in snapshot.audit.iter().skip(skip) {
            if entry.event.is_failure() {
                let _ = writeln!(output, "  {}", bright_red(entry));
            } else {
                let _ = writeln!(output, "  {entry}");
            }
        }
    }

    if view.status.is_some() {
        let _ = writeln!(output, "\n{}", dim(KEY_HELP));
    }

    output
}

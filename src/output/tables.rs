use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};
use std::collections::HashSet;

use super::styling::{cyan, dim, highlight};
use crate::monitor::{fuzzy_match, MrRow, Pipeline, Status};

const BRANCH_WIDTH: usize = 30;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn status_icon(status: Status) -> (&'static str, TableColor) {
    match status {
        Status::Success => ("✓", TableColor::Green),
        Status::Failed => ("✗", TableColor::Red),
        Status::Running => ("●", TableColor::Blue),
        Status::Pending | Status::Manual | Status::Created | Status::WaitingForResource => {
            ("○", TableColor::DarkGrey)
        }
        Status::Canceled | Status::Skipped => ("⊘", TableColor::DarkGrey),
        Status::Unknown => ("?", TableColor::DarkGrey),
    }
}

pub fn status_cell(status: Status) -> Cell {
    let (icon, color) = status_icon(status);
    Cell::new(format!("{icon} {status}")).fg(color)
}

fn pipeline_cell(pipeline: Option<&Pipeline>) -> Cell {
    match pipeline {
        Some(pipeline) => status_cell(pipeline.status),
        None => Cell::new("no pipeline").fg(TableColor::DarkGrey),
    }
}

fn approval_cell(approved: Option<bool>) -> Cell {
    match approved {
        Some(true) => Cell::new("✅"),
        Some(false) => Cell::new(""),
        None => Cell::new("?").fg(TableColor::DarkGrey),
    }
}

fn threads_cell(count: u32) -> Cell {
    let cell = Cell::new(count);
    if count > 0 {
        cell.fg(TableColor::Yellow)
    } else {
        cell
    }
}

/// Cuts `text` to `max` characters, marking the cut with "...".
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// `Xm Ys` from one minute on, `Ys` below; empty when unknown.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return String::new();
    };
    let seconds = seconds.max(0.0) as u64;
    if seconds >= 60 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{seconds}s")
    }
}

/// Title with the characters matched by `query` highlighted.
pub fn highlight_title(title: &str, query: &str) -> String {
    if query.is_empty() {
        return title.to_string();
    }
    let Some(found) = fuzzy_match(title, query) else {
        return title.to_string();
    };
    let positions: HashSet<usize> = found.positions.into_iter().collect();
    title
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if positions.contains(&i) {
                highlight(c).to_string()
            } else {
                c.to_string()
            }
        })
        .collect()
}

pub fn merge_request_table(rows: &[&MrRow], query: &str) -> Table {
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "MR", "Title", "Branch", "Pipeline", "Appr.", "Retry", "Threads",
    ]));

    for row in rows {
        let mr = &row.merge_request;
        table.add_row(vec![
            Cell::new(format!("!{}", mr.iid)),
            Cell::new(highlight_title(&mr.title, query)),
            Cell::new(dim(truncate(&mr.source_branch, BRANCH_WIDTH))),
            pipeline_cell(mr.pipeline.as_ref()),
            approval_cell(mr.approved),
            Cell::new(if row.intent.auto_retry { "🔄" } else { "" }),
            threads_cell(mr.unresolved_threads),
        ]);
    }

    table
}

/// Jobs grouped by stage, each with icon, duration and allow-failure tag.
pub fn job_detail(pipeline: Option<&Pipeline>) -> String {
    let Some(pipeline) = pipeline else {
        return "  No pipeline data\n".to_string();
    };
    if pipeline.jobs.is_empty() {
        return "  No jobs loaded\n".to_string();
    }

    let finished = pipeline.jobs.iter().filter(|job| job.is_terminal()).count();
    let mut output = format!(
        "  {}\n",
        dim(format!("{finished}/{} jobs finished", pipeline.jobs.len()))
    );
    for stage in pipeline.stages() {
        output.push_str(&format!("  {}\n", cyan(format!("{stage}:"))));
        for job in pipeline.jobs_in_stage(&stage) {
            let (icon, color) = status_icon(job.status);
            let icon = console::style(icon).fg(console_color(color));
            let duration = format_duration(job.duration);
            let duration = if duration.is_empty() {
                String::new()
            } else {
                format!(" ({duration})")
            };
            let allow_tag = if job.allow_failure {
                format!(" {}", dim("(allowed to fail)").italic())
            } else {
                String::new()
            };
            output.push_str(&format!("    {icon} {}{duration}{allow_tag}\n", job.name));
        }
    }
    output
}

fn console_color(color: TableColor) -> console::Color {
    match color {
        TableColor::Green => console::Color::Green,
        TableColor::Red => console::Color::Red,
        TableColor::Blue => console::Color::Blue,
        TableColor::Yellow => console::Color::Yellow,
        _ => console::Color::White,
    }
}

use super::fuzzy::is_fuzzy_match;
use super::types::{MrRow, Scope};

/// Everything that decides which rows are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewFilter<'a> {
    pub scope: Scope,
    /// Username for the `Mine` scope; `None` lets every row through
    pub current_user: Option<&'a str>,
    pub show_drafts: bool,
    pub query: &'a str,
}

/// Visible rows in server order: scope, then drafts, then title search.
pub fn visible_rows<'r>(rows: &'r [MrRow], filter: &ViewFilter<'_>) -> Vec<&'r MrRow> {
    rows.iter()
        .filter(|row| in_scope(row, filter))
        .filter(|row| filter.show_drafts || !row.merge_request.is_draft())
        .filter(|row| filter.query.is_empty() || is_fuzzy_match(&row.merge_request.title, filter.query))
        .collect()
}

fn in_scope(row: &MrRow, filter: &ViewFilter<'_>) -> bool {
    match (filter.scope, filter.current_user) {
        (Scope::All, _) | (Scope::Mine, None) => true,
        (Scope::Mine, Some(username)) => row.merge_request.is_assigned_to(username),
    }
}

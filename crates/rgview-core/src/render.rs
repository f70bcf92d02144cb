//! Rendered view of classified search results.
//!
//! Consumes result records in arrival order, grouping lines under one heading
//! per file and tracking the match count and a navigable filename index. The
//! model is toolkit-agnostic; spans and visibility travel as plain data.

use rgview_types::{MatchSpan, ResultLine};
use std::collections::HashSet;

/// Width of the line-number gutter in rendered rows: a right-aligned
/// five-digit number plus one space.
pub const GUTTER_WIDTH: usize = 6;

/// One renderable row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    /// Heading emitted once when results move to a new file.
    Heading { filename: String },
    /// A match or context line under the current heading.
    Line {
        filename: String,
        line_number: u64,
        content: String,
        spans: Vec<MatchSpan>,
        is_match: bool,
        truncated: bool,
    },
    /// Divider between discontiguous context blocks.
    Divider,
    /// Non-result output surfaced verbatim.
    Diagnostic(String),
}

#[derive(Debug, Default)]
pub struct RenderModel {
    rows: Vec<Row>,
    /// Filename of the most recently emitted heading. Cleared by diagnostics
    /// so the next result line re-emits its heading.
    cursor: Option<String>,
    /// Counts Match records only, never spans or context lines.
    match_count: u64,
    /// First heading row index per filename, in first-seen order.
    file_index: Vec<(String, usize)>,
    hidden: HashSet<String>,
}

impl RenderModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one classified record.
    pub fn push(&mut self, record: ResultLine) {
        match record {
            ResultLine::Match {
                filename,
                line_number,
                content,
                spans,
                truncated,
            } => {
                self.enter_file(&filename);
                self.match_count += 1;
                self.rows.push(Row::Line {
                    filename,
                    line_number,
                    content,
                    spans,
                    is_match: true,
                    truncated,
                });
            }
            ResultLine::Context {
                filename,
                line_number,
                content,
                truncated,
            } => {
                self.enter_file(&filename);
                self.rows.push(Row::Line {
                    filename,
                    line_number,
                    content,
                    spans: Vec::new(),
                    is_match: false,
                    truncated,
                });
            }
            // A separator never changes which file we are in.
            ResultLine::Separator => self.rows.push(Row::Divider),
            ResultLine::Diagnostic(text) => {
                self.cursor = None;
                self.rows.push(Row::Diagnostic(text));
            }
        }
    }

    fn enter_file(&mut self, filename: &str) {
        if self.cursor.as_deref() == Some(filename) {
            return;
        }
        if !self.file_index.iter().any(|(name, _)| name == filename) {
            self.file_index
                .push((filename.to_string(), self.rows.len()));
        }
        self.rows.push(Row::Heading {
            filename: filename.to_string(),
        });
        self.cursor = Some(filename.to_string());
    }

    /// Discard all rows and counters (restart).
    pub fn clear(&mut self) {
        self.rows.clear();
        self.cursor = None;
        self.match_count = 0;
        self.file_index.clear();
        self.hidden.clear();
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    /// Filenames in first-seen order with their heading row indices.
    pub fn file_index(&self) -> &[(String, usize)] {
        &self.file_index
    }

    /// Heading row index for a filename, if it has appeared.
    pub fn heading_row(&self, filename: &str) -> Option<usize> {
        self.file_index
            .iter()
            .find(|(name, _)| name == filename)
            .map(|&(_, row)| row)
    }

    /// Filename and 1-based line number behind a row, for edit propagation.
    /// Headings, dividers, and diagnostics have no source line.
    pub fn line_ref(&self, row: usize) -> Option<(&str, u64)> {
        match self.rows.get(row)? {
            Row::Line {
                filename,
                line_number,
                ..
            } => Some((filename.as_str(), *line_number)),
            _ => None,
        }
    }

    pub fn is_hidden(&self, filename: &str) -> bool {
        self.hidden.contains(filename)
    }

    /// Toggle one file's lines hidden or shown as a block.
    pub fn toggle_file(&mut self, filename: &str) {
        if !self.hidden.remove(filename) {
            self.hidden.insert(filename.to_string());
        }
    }

    /// If any file is currently hidden, show all; otherwise hide all.
    pub fn toggle_all(&mut self) {
        if self.hidden.is_empty() {
            self.hidden
                .extend(self.file_index.iter().map(|(name, _)| name.clone()));
        } else {
            self.hidden.clear();
        }
    }

    /// Rows with hidden files' lines filtered out. Headings stay visible so
    /// hidden files can be toggled back.
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &Row)> {
        self.rows.iter().enumerate().filter(|(_, row)| match row {
            Row::Line { filename, .. } => !self.hidden.contains(filename),
            _ => true,
        })
    }

    /// Standalone divider text approximating the line-number gutter width.
    pub fn divider_text() -> String {
        "-".repeat(GUTTER_WIDTH)
    }

    /// Gutter text for a line row: right-aligned number padded to the fixed
    /// gutter width.
    pub fn gutter_text(line_number: u64) -> String {
        format!("{line_number:>width$} ", width = GUTTER_WIDTH - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(file: &str, number: u64) -> ResultLine {
        ResultLine::Match {
            filename: file.into(),
            line_number: number,
            content: format!("line {number}"),
            spans: vec![MatchSpan::new(0, 4)],
            truncated: false,
        }
    }

    fn ctx(file: &str, number: u64) -> ResultLine {
        ResultLine::Context {
            filename: file.into(),
            line_number: number,
            content: format!("line {number}"),
            truncated: false,
        }
    }

    #[test]
    fn heading_emitted_once_per_file_run() {
        let mut model = RenderModel::new();
        model.push(m("a.rs", 1));
        model.push(m("a.rs", 2));
        model.push(m("b.rs", 1));
        let headings: Vec<_> = model
            .rows()
            .iter()
            .filter(|r| matches!(r, Row::Heading { .. }))
            .collect();
        assert_eq!(headings.len(), 2);
    }

    #[test]
    fn match_counter_ignores_context_lines() {
        let mut model = RenderModel::new();
        model.push(ctx("a.rs", 1));
        model.push(m("a.rs", 2));
        model.push(ctx("a.rs", 3));
        assert_eq!(model.match_count(), 1);
    }

    #[test]
    fn separator_keeps_current_file() {
        let mut model = RenderModel::new();
        model.push(m("a.rs", 1));
        model.push(ResultLine::Separator);
        model.push(m("a.rs", 9));
        let headings = model
            .rows()
            .iter()
            .filter(|r| matches!(r, Row::Heading { .. }))
            .count();
        assert_eq!(headings, 1);
    }

    #[test]
    fn diagnostic_forces_heading_reemission() {
        let mut model = RenderModel::new();
        model.push(m("a.rs", 1));
        model.push(ResultLine::Diagnostic("WARNING: skipped".into()));
        model.push(m("a.rs", 2));
        let headings = model
            .rows()
            .iter()
            .filter(|r| matches!(r, Row::Heading { .. }))
            .count();
        assert_eq!(headings, 2);
    }

    #[test]
    fn file_index_records_first_heading_only() {
        let mut model = RenderModel::new();
        model.push(m("a.rs", 1));
        model.push(m("b.rs", 1));
        model.push(m("a.rs", 5));
        assert_eq!(model.heading_row("a.rs"), Some(0));
        assert_eq!(model.file_index().len(), 2);
    }

    #[test]
    fn toggle_all_inverts_based_on_any_hidden() {
        let mut model = RenderModel::new();
        model.push(m("a.rs", 1));
        model.push(m("b.rs", 1));
        model.toggle_file("a.rs");
        assert!(model.is_hidden("a.rs"));
        // One file hidden: toggle-all shows everything.
        model.toggle_all();
        assert!(!model.is_hidden("a.rs"));
        assert!(!model.is_hidden("b.rs"));
        // Nothing hidden: toggle-all hides everything.
        model.toggle_all();
        assert!(model.is_hidden("a.rs"));
        assert!(model.is_hidden("b.rs"));
    }

    #[test]
    fn visible_rows_keep_headings_of_hidden_files() {
        let mut model = RenderModel::new();
        model.push(m("a.rs", 1));
        model.toggle_file("a.rs");
        let visible: Vec<_> = model.visible_rows().collect();
        assert_eq!(visible.len(), 1);
        assert!(matches!(visible[0].1, Row::Heading { .. }));
    }

    #[test]
    fn divider_width_matches_gutter() {
        assert_eq!(RenderModel::divider_text().len(), GUTTER_WIDTH);
        assert_eq!(RenderModel::gutter_text(7).len(), GUTTER_WIDTH);
    }
}

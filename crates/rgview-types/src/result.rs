//! Classified search output records.

/// Half-open character-offset range of one highlighted run within a line's
/// content. Spans on a line are ordered and non-overlapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

impl MatchSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// One classified line of search output. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultLine {
    /// A matching line with its highlighted spans.
    Match {
        filename: String,
        line_number: u64,
        content: String,
        spans: Vec<MatchSpan>,
        /// Content was cut at the maximum surfaced length.
        truncated: bool,
    },
    /// A context line around a match. Carries no spans.
    Context {
        filename: String,
        line_number: u64,
        content: String,
        truncated: bool,
    },
    /// The tool's two-character divider between discontiguous context blocks.
    Separator,
    /// Non-result output (warnings, permission errors) surfaced verbatim.
    Diagnostic(String),
}

impl ResultLine {
    /// Filename for match and context records.
    pub fn filename(&self) -> Option<&str> {
        match self {
            ResultLine::Match { filename, .. } | ResultLine::Context { filename, .. } => {
                Some(filename)
            }
            _ => None,
        }
    }
}

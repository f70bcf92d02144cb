//! Per-session search settings.

use serde::{Deserialize, Serialize};

/// How the search term is interpreted by the search tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    /// Fixed-string match.
    Literal,
    /// Fixed-string match constrained to word boundaries.
    Word,
    /// Regular expression (the tool's default).
    #[default]
    Regex,
}

/// Case sensitivity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    /// Case-insensitive unless the term contains an uppercase character.
    #[default]
    Smart,
    Sensitive,
    Ignore,
}

/// Which files the search may visit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileFilter {
    #[default]
    All,
    /// One of the tool's named file types.
    Type(String),
    /// A glob over file paths.
    Glob(String),
}

/// Lines of leading and trailing context requested around each match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDepth {
    pub before: u32,
    pub after: u32,
}

/// Complete settings for one search session.
///
/// Settings are read at invocation-build time; changing them takes effect on
/// the next start or restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSettings {
    pub kind: SearchKind,
    pub case: CaseMode,
    pub filter: FileFilter,
    pub context: Option<ContextDepth>,
    /// Skip dotfiles entirely instead of asking the tool to search them.
    pub skip_hidden: bool,
    /// Bypass VCS ignore files instead of honoring them.
    pub skip_vcs_ignores: bool,
    /// User-configured extra arguments. Placed first in the argument list so
    /// the fixed flags that follow take precedence on conflict.
    pub extra_args: Vec<String>,
}

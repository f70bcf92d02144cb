//! Glob matching and file-type relevance.
//!
//! The search tool's type catalog maps type names to glob sets. Given a
//! filename, relevance keeps the types with a matching glob and tie-breaks
//! deterministically, so auto-detection always picks the same type.

use crate::{Result, RgviewError};
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const CATALOG_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Compile a restricted glob to a regex anchored over the whole filename.
///
/// Dialect: `?` matches one character, `*` matches any run, `[...]` is a
/// character class copied through (ranges and literal `?`/`*` inside work,
/// an unterminated bracket runs to the end of the pattern, an empty group
/// is literal brackets), everything else is literal.
pub fn compile_glob(glob: &str) -> Result<Regex> {
    let mut pattern = String::from("^");
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '?' => pattern.push('.'),
            '*' => pattern.push_str(".*"),
            '[' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|p| i + 1 + p);
                let content_end = close.unwrap_or(chars.len());
                let class: String = chars[i + 1..content_end].iter().collect();
                if class.is_empty() {
                    // An empty group has nothing to class-match; the
                    // brackets are literals.
                    pattern.push_str(r"\[");
                    if close.is_some() {
                        pattern.push_str(r"\]");
                    }
                } else {
                    pattern.push('[');
                    pattern.push_str(&class);
                    pattern.push(']');
                }
                i = close.unwrap_or(chars.len() - 1);
            }
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
    pattern.push('$');
    Regex::new(&pattern)
        .map_err(|e| RgviewError::InvalidConfiguration(format!("glob '{glob}': {e}")))
}

/// Whether a glob matches a filename in full. Invalid globs never match.
pub fn glob_matches(glob: &str, filename: &str) -> bool {
    compile_glob(glob)
        .map(|re| re.is_match(filename))
        .unwrap_or(false)
}

/// One entry of the tool's type catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTypeDef {
    pub name: String,
    pub globs: Vec<String>,
}

/// The tool's type catalog, read-only for the duration of a relevance query.
#[derive(Debug, Clone, Default)]
pub struct FileTypeCatalog {
    types: Vec<FileTypeDef>,
}

impl FileTypeCatalog {
    pub fn new(types: Vec<FileTypeDef>) -> Self {
        Self { types }
    }

    /// Parse `type: glob, glob, ...` records, one per line.
    pub fn parse(text: &str) -> Self {
        let mut types = Vec::new();
        for line in text.lines() {
            let Some((name, globs)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let globs: Vec<String> = globs
                .split(',')
                .map(|g| g.trim().to_string())
                .filter(|g| !g.is_empty())
                .collect();
            types.push(FileTypeDef {
                name: name.to_string(),
                globs,
            });
        }
        Self { types }
    }

    /// Query the search tool for its type catalog.
    pub async fn query(program: &Path) -> Result<Self> {
        let output = tokio::time::timeout(
            CATALOG_QUERY_TIMEOUT,
            Command::new(program).arg("--type-list").output(),
        )
        .await
        .map_err(|_| RgviewError::TypeCatalog("type list query timed out".into()))?
        .map_err(|e| RgviewError::TypeCatalog(e.to_string()))?;

        if !output.status.success() {
            return Err(RgviewError::TypeCatalog(format!(
                "type list query exited with {:?}",
                output.status.code()
            )));
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let catalog = Self::parse(&text);
        debug!(target: "rgview::cache", "type catalog loaded: {} types", catalog.types.len());
        Ok(catalog)
    }

    pub fn types(&self) -> &[FileTypeDef] {
        &self.types
    }

    /// The most relevant type for a filename, or `None` when no glob in the
    /// catalog matches.
    ///
    /// Ties among matching types go to the longest type name (descriptive
    /// names outrank terse aliases), then to the larger glob set, with one
    /// fixed override: a residual {lisp, elisp} tie resolves to elisp.
    pub fn relevant_type(&self, filename: &str) -> Option<&str> {
        let mut candidates: Vec<&FileTypeDef> = self
            .types
            .iter()
            .filter(|def| def.globs.iter().any(|g| glob_matches(g, filename)))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let longest = candidates.iter().map(|d| d.name.len()).max()?;
        candidates.retain(|d| d.name.len() == longest);

        let most_globs = candidates.iter().map(|d| d.globs.len()).max()?;
        candidates.retain(|d| d.globs.len() == most_globs);

        if candidates.len() == 2 {
            let mut names: Vec<&str> = candidates.iter().map(|d| d.name.as_str()).collect();
            names.sort_unstable();
            if names == ["elisp", "lisp"] {
                return Some("elisp");
            }
        }
        candidates.first().map(|d| d.name.as_str())
    }
}

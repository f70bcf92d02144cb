//! Deterministic argument-list construction for the search tool.
//!
//! Order matters: the tool lets later flags override earlier identical ones,
//! so user-configured extras go first and the engine's fixed flags win.

use crate::{Result, RgviewError};
use rgview_types::{CaseMode, FileFilter, SearchKind, SearchSettings};
use std::path::{Path, PathBuf};

/// The ordered argument list for one process launch. Rebuilt from current
/// settings on every start or restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl InvocationSpec {
    /// Build the argument list from a session's settings.
    ///
    /// Configuration problems are rejected here, before any process is
    /// launched.
    pub fn build(
        program: &Path,
        settings: &SearchSettings,
        term: &str,
        directory: &Path,
    ) -> Result<Self> {
        if term.is_empty() {
            return Err(RgviewError::InvalidConfiguration(
                "search term is empty".into(),
            ));
        }

        let mut args: Vec<String> = settings.extra_args.clone();

        // Fixed flags: ANSI color with pinned marker values, line numbers,
        // no heading grouping, no column numbers, filename on every line.
        args.extend(
            [
                "--color=always",
                "--colors=path:none",
                "--colors=path:fg:magenta",
                "--colors=line:none",
                "--colors=line:fg:green",
                "--colors=match:none",
                "--colors=match:fg:red",
                "--colors=match:style:bold",
                "--line-number",
                "--no-heading",
                "--no-column",
                "--with-filename",
            ]
            .map(String::from),
        );

        match settings.kind {
            SearchKind::Literal => args.push("--fixed-strings".into()),
            SearchKind::Word => {
                args.push("--fixed-strings".into());
                args.push("--word-regexp".into());
            }
            // Regex is the tool's default; no flag.
            SearchKind::Regex => {}
        }

        args.push(
            match settings.case {
                CaseMode::Smart => "--smart-case",
                CaseMode::Sensitive => "--case-sensitive",
                CaseMode::Ignore => "--ignore-case",
            }
            .into(),
        );

        match &settings.filter {
            FileFilter::All => {}
            FileFilter::Type(name) => {
                if name.is_empty() {
                    return Err(RgviewError::InvalidConfiguration(
                        "file type name is empty".into(),
                    ));
                }
                args.push(format!("--type={name}"));
            }
            FileFilter::Glob(pattern) => {
                if pattern.is_empty() {
                    return Err(RgviewError::InvalidConfiguration(
                        "file glob pattern is empty".into(),
                    ));
                }
                args.push(format!("--glob={pattern}"));
            }
        }

        if let Some(context) = settings.context {
            args.push(format!("--before-context={}", context.before));
            args.push(format!("--after-context={}", context.after));
        }

        if !settings.skip_hidden {
            args.push("--hidden".into());
        }

        // When honoring ignore files the VCS metadata directory still has to
        // be excluded by hand, since --hidden would otherwise descend into it.
        if settings.skip_vcs_ignores {
            args.push("--no-ignore".into());
        } else {
            args.push("--glob=!.git".into());
        }

        args.push("--".into());
        args.push(term.to_string());
        args.push(directory.to_string_lossy().into_owned());

        Ok(Self {
            program: program.to_path_buf(),
            args,
        })
    }

    /// Shell-style rendering for previews and diagnostics.
    pub fn display(&self) -> String {
        let mut out = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            out.push(' ');
            if arg.contains(' ') || arg.is_empty() {
                out.push('\'');
                out.push_str(arg);
                out.push('\'');
            } else {
                out.push_str(arg);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgview_types::ContextDepth;

    fn build(settings: &SearchSettings) -> InvocationSpec {
        InvocationSpec::build(Path::new("rg"), settings, "needle", Path::new("/tmp/proj"))
            .expect("valid settings")
    }

    #[test]
    fn extra_args_come_first() {
        let settings = SearchSettings {
            extra_args: vec!["--max-columns=0".into()],
            ..Default::default()
        };
        let spec = build(&settings);
        assert_eq!(spec.args[0], "--max-columns=0");
        assert!(spec.args.contains(&"--color=always".to_string()));
    }

    #[test]
    fn word_search_is_fixed_string_plus_word_boundary() {
        let settings = SearchSettings {
            kind: SearchKind::Word,
            ..Default::default()
        };
        let args = build(&settings).args;
        let fs = args.iter().position(|a| a == "--fixed-strings").unwrap();
        let wr = args.iter().position(|a| a == "--word-regexp").unwrap();
        assert!(fs < wr);
    }

    #[test]
    fn regex_search_adds_no_type_flag() {
        let args = build(&SearchSettings::default()).args;
        assert!(!args.iter().any(|a| a == "--fixed-strings"));
        assert!(args.contains(&"--smart-case".to_string()));
    }

    #[test]
    fn term_follows_literal_separator() {
        let args = build(&SearchSettings::default()).args;
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[sep + 1], "needle");
        assert_eq!(args[sep + 2], "/tmp/proj");
        assert_eq!(sep + 3, args.len());
    }

    #[test]
    fn context_depth_emits_both_flags() {
        let settings = SearchSettings {
            context: Some(ContextDepth {
                before: 2,
                after: 3,
            }),
            ..Default::default()
        };
        let args = build(&settings).args;
        assert!(args.contains(&"--before-context=2".to_string()));
        assert!(args.contains(&"--after-context=3".to_string()));
    }

    #[test]
    fn hidden_flag_omitted_when_skipping_hidden() {
        let settings = SearchSettings {
            skip_hidden: true,
            ..Default::default()
        };
        assert!(!build(&settings).args.contains(&"--hidden".to_string()));
        assert!(build(&SearchSettings::default())
            .args
            .contains(&"--hidden".to_string()));
    }

    #[test]
    fn vcs_flag_depends_on_ignore_mode() {
        let bypass = SearchSettings {
            skip_vcs_ignores: true,
            ..Default::default()
        };
        assert!(build(&bypass).args.contains(&"--no-ignore".to_string()));
        let honor = build(&SearchSettings::default());
        assert!(honor.args.contains(&"--glob=!.git".to_string()));
        assert!(!honor.args.contains(&"--no-ignore".to_string()));
    }

    #[test]
    fn empty_term_and_empty_filter_values_fail_fast() {
        let err = InvocationSpec::build(
            Path::new("rg"),
            &SearchSettings::default(),
            "",
            Path::new("."),
        )
        .unwrap_err();
        assert!(matches!(err, RgviewError::InvalidConfiguration(_)));

        let settings = SearchSettings {
            filter: FileFilter::Type(String::new()),
            ..Default::default()
        };
        assert!(
            InvocationSpec::build(Path::new("rg"), &settings, "x", Path::new(".")).is_err()
        );
    }
}

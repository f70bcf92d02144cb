//! Session identity and lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identity of one search session: the term searched and where.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub term: String,
    pub directory: PathBuf,
}

impl SessionKey {
    pub fn new(term: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            term: term.into(),
            directory: directory.into(),
        }
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No process; results (if any) are from the last completed run.
    Idle,
    /// Session exists but the first start was explicitly deferred.
    Configuring,
    /// Search process is running and may deliver output.
    Running,
    /// Interrupt issued; awaiting confirmed termination.
    Settling,
}

/// How a search process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exit code 0.
    Normal,
    /// Exit code 1 with no diagnostic output: success with empty results.
    ZeroMatches,
    /// Termination following an interrupt we requested.
    Interrupted,
    /// Any other exit. The only outcome surfaced to the user.
    Abnormal {
        code: Option<i32>,
        detail: String,
    },
}

impl ExitOutcome {
    /// Whether this outcome carries a user-visible message.
    pub fn is_abnormal(&self) -> bool {
        matches!(self, ExitOutcome::Abnormal { .. })
    }
}

/// Summary row for a session picker, most-recently-used first.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub state: SessionState,
    pub match_count: u64,
    pub last_used_at: DateTime<Utc>,
}

//! Incremental classification of chunked search output.
//!
//! Output arrives at arbitrary byte boundaries; the classifier carries the
//! unterminated tail of each chunk over to the next call so callers never
//! have to align chunks on line boundaries themselves.

use crate::decode;
use rgview_types::ResultLine;
use tracing::trace;

/// The tool's two-character context-block separator line.
pub const SEPARATOR_TOKEN: &str = "--";

/// Prefix the tool uses for non-fatal warnings mixed into its output.
const WARNING_PREFIX: &str = "WARNING:";

/// Splits a chunked text stream into complete lines and classifies each one.
///
/// The pending fragment is exclusive to one session's running process. It
/// must not be fed chunks between an interrupt request and confirmed
/// termination; the session state machine enforces that ordering.
#[derive(Debug, Default)]
pub struct LineClassifier {
    /// Unterminated tail of the most recent chunk.
    pending: String,
}

impl LineClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, classifying every complete line it closes.
    ///
    /// With `eof` set the trailing fragment is classified even if
    /// unterminated and the carried-over state is cleared.
    pub fn feed(&mut self, chunk: &str, eof: bool) -> Vec<ResultLine> {
        let mut data = std::mem::take(&mut self.pending);
        data.push_str(chunk);

        let mut lines: Vec<&str> = data.split('\n').collect();
        if !eof {
            // Hold back the final piece: it may be a prefix of a longer line.
            if let Some(tail) = lines.pop() {
                self.pending = tail.to_string();
            }
        }

        let mut records = Vec::new();
        for line in lines {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if let Some(record) = classify_line(line) {
                records.push(record);
            }
        }
        trace!(target: "rgview::classify", "chunk of {} bytes -> {} records", chunk.len(), records.len());
        records
    }

    /// Discard carried-over state. Called on restart and at end of stream.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> &str {
        &self.pending
    }
}

fn classify_line(line: &str) -> Option<ResultLine> {
    if line.is_empty() {
        return None;
    }
    if line == SEPARATOR_TOKEN {
        return Some(ResultLine::Separator);
    }
    // Lines without any color escape cannot be coded result lines. The tool
    // emits warnings and permission errors inline with results.
    if line.starts_with(WARNING_PREFIX) || !line.contains('\x1b') {
        return Some(ResultLine::Diagnostic(line.to_string()));
    }
    Some(decode::decode_line(line))
}

//! Decoding of one color-coded result line.
//!
//! Filenames and matched text may themselves contain colons, so splitting on
//! `:` is wrong. The tool's own SGR color markers are the only unambiguous
//! field delimiters; the invocation builder pins their values with explicit
//! `--colors=` overrides so decoding never depends on user configuration.

use rgview_types::{MatchSpan, ResultLine};
use tracing::trace;

/// Maximum characters of content surfaced per line. Longer lines are cut and
/// flagged so a rendering layer can append a truncation marker.
pub const MAX_CONTENT_LEN: usize = 512;

const RESET: &str = "\x1b[0m";
/// Marks the start of the filename field (magenta).
const FILENAME_MARKER: &str = "\x1b[35m";
/// Marks the start of the line-number field (green).
const LINENO_MARKER: &str = "\x1b[32m";
/// The two markers that, following a reset, open a highlighted match run.
const MATCH_BOLD: &str = "\x1b[1m";
const MATCH_COLOR: &str = "\x1b[31m";

/// Decode one coded line into a match or context record.
///
/// Structural failures never error: the tool emits warnings and permission
/// messages that can superficially resemble coded lines, so anything that
/// does not parse degrades to a diagnostic record.
pub fn decode_line(line: &str) -> ResultLine {
    match try_decode(line) {
        Some(record) => record,
        None => {
            trace!(target: "rgview::classify", "line lacks structural markers, degrading to diagnostic");
            ResultLine::Diagnostic(strip_escapes(line))
        }
    }
}

fn try_decode(line: &str) -> Option<ResultLine> {
    // Filename: text between the filename marker and the next escape.
    let fname_start = line.find(FILENAME_MARKER)? + FILENAME_MARKER.len();
    let fname_len = line[fname_start..].find('\x1b')?;
    let filename = &line[fname_start..fname_start + fname_len];
    let filename = filename.strip_prefix("./").unwrap_or(filename).to_string();
    if filename.is_empty() {
        return None;
    }

    // Line number: digits following the line-number marker.
    let rest = &line[fname_start + fname_len..];
    let num_start = rest.find(LINENO_MARKER)? + LINENO_MARKER.len();
    let digits: String = rest[num_start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return None;
    }
    let line_number: u64 = digits.parse().ok()?;

    // The delimiter closing the line-number field decides the record kind:
    // ":" for a match line, "-" for a context line. Escapes in between (the
    // field's closing reset) are skipped.
    let mut after = &rest[num_start + digits.len()..];
    while let Some(stripped) = strip_leading_escape(after) {
        after = stripped;
    }
    let delimiter = after.chars().next()?;
    let raw_content = &after[delimiter.len_utf8()..];

    let (content, spans, truncated) = scan_content(raw_content);
    match delimiter {
        ':' => Some(ResultLine::Match {
            filename,
            line_number,
            content,
            spans,
            truncated,
        }),
        '-' => Some(ResultLine::Context {
            filename,
            line_number,
            content,
            truncated,
        }),
        _ => None,
    }
}

/// Highlight-run scanner state within content.
enum RunState {
    Plain,
    /// Saw a reset; a run opens if both match markers follow.
    SawReset,
    /// Saw reset plus one of the two match markers.
    SawOne,
    /// Inside a highlighted run; holds the span start offset.
    Open(usize),
}

/// Strip color codes from content, recording each {reset, marker, marker,
/// text, reset} run as one span over the cleaned text's character offsets.
/// A closing reset doubles as the opening reset of an adjacent run, so two
/// back-to-back matches yield two contiguous spans rather than one.
fn scan_content(raw: &str) -> (String, Vec<MatchSpan>, bool) {
    let mut content = String::new();
    let mut char_len = 0usize;
    let mut spans = Vec::new();
    let mut state = RunState::Plain;

    let mut rest = raw;
    while !rest.is_empty() {
        if rest.starts_with('\x1b') {
            let (code, len) = take_escape(rest);
            state = match (state, code) {
                (RunState::Open(start), RESET) => {
                    spans.push(MatchSpan::new(start, char_len));
                    RunState::SawReset
                }
                (RunState::Open(start), _) => RunState::Open(start),
                (_, RESET) => RunState::SawReset,
                (RunState::SawReset, MATCH_BOLD | MATCH_COLOR) => RunState::SawOne,
                (RunState::SawOne, MATCH_BOLD | MATCH_COLOR) => RunState::Open(char_len),
                _ => RunState::Plain,
            };
            rest = &rest[len..];
        } else {
            let c = rest.chars().next().unwrap();
            content.push(c);
            char_len += 1;
            if !matches!(state, RunState::Open(_)) {
                state = RunState::Plain;
            }
            rest = &rest[c.len_utf8()..];
        }
    }
    if let RunState::Open(start) = state {
        spans.push(MatchSpan::new(start, char_len));
    }

    if char_len <= MAX_CONTENT_LEN {
        return (content, spans, false);
    }
    let cut: String = content.chars().take(MAX_CONTENT_LEN).collect();
    spans.retain(|s| s.end <= MAX_CONTENT_LEN);
    (cut, spans, true)
}

/// Consume one escape sequence at the head of `s`, returning it and its
/// byte length. Sequences run from ESC through the first ASCII letter.
fn take_escape(s: &str) -> (&str, usize) {
    debug_assert!(s.starts_with('\x1b'));
    for (i, c) in s.char_indices().skip(1) {
        if c.is_ascii_alphabetic() {
            let end = i + c.len_utf8();
            return (&s[..end], end);
        }
    }
    (s, s.len())
}

fn strip_leading_escape(s: &str) -> Option<&str> {
    if s.starts_with('\x1b') {
        let (_, len) = take_escape(s);
        Some(&s[len..])
    } else {
        None
    }
}

fn strip_escapes(s: &str) -> String {
    let mut out = String::new();
    let mut rest = s;
    while !rest.is_empty() {
        if rest.starts_with('\x1b') {
            let (_, len) = take_escape(rest);
            rest = &rest[len..];
        } else {
            let c = rest.chars().next().unwrap();
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

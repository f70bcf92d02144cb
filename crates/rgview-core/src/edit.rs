//! Propagation of in-place result edits back to source files.
//!
//! The host UI lets users edit rendered result lines directly; each edit is
//! translated into a delete+insert on the file the line came from. Runs
//! synchronously on the caller's context and is refused while the owning
//! session's search is still running (the UI disables editing then, and the
//! precondition is checked explicitly here as well).

use crate::render::GUTTER_WIDTH;
use crate::session::Session;
use crate::{Result, RgviewError};
use rgview_types::SessionState;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One edit made against the rendered view.
#[derive(Debug, Clone)]
pub struct EditEvent {
    /// Row index in the render model.
    pub row: usize,
    /// Column measured from the row start, including the line-number gutter.
    /// Every character counts as width 1, tabs included.
    pub column: usize,
    /// Characters deleted at the position.
    pub deleted: usize,
    /// Text inserted at the position.
    pub inserted: String,
}

/// File store the host environment provides for reading and writing source
/// files. Offsets are character offsets, matching the render model's
/// every-character-is-width-1 column arithmetic.
pub trait FileStore {
    /// Whether the path is already held open.
    fn is_open(&self, path: &Path) -> bool;
    /// Open the file, reading its content. No-op when already open.
    fn open(&mut self, path: &Path) -> Result<()>;
    /// Current content of an open file.
    fn content(&self, path: &Path) -> Result<&str>;
    /// Delete `delete_len` characters at `offset`, then insert `text` there.
    fn splice(&mut self, path: &Path, offset: usize, delete_len: usize, text: &str) -> Result<()>;
    /// Persist an open file.
    fn save(&mut self, path: &Path) -> Result<()>;
    /// Release an open file without persisting further changes.
    fn close(&mut self, path: &Path) -> Result<()>;
}

/// Apply one edit from the rendered view to the file behind it.
///
/// The row must carry a source line; headings, dividers, and diagnostics
/// reject the edit. Files opened here solely for the edit are saved and
/// closed afterwards; files the host already had open are saved but left
/// open.
pub fn propagate_edit(
    session: &Session,
    store: &mut dyn FileStore,
    edit: &EditEvent,
) -> Result<()> {
    if session.state() == SessionState::Running {
        return Err(RgviewError::SessionBusy);
    }

    let (filename, line_number) = session
        .render()
        .line_ref(edit.row)
        .ok_or(RgviewError::RowNotEditable(edit.row))?;
    let column = edit
        .column
        .checked_sub(GUTTER_WIDTH)
        .ok_or(RgviewError::ColumnInGutter(edit.column))?;

    let path = session.key().directory.join(filename);
    let was_open = store.is_open(&path);
    if !was_open {
        store.open(&path)?;
    }

    let offset = locate(store.content(&path)?, filename, line_number, column)?;
    debug!(
        target: "rgview::edit",
        "splicing {}:{line_number} col {column} (offset {offset}, -{} +{:?})",
        path.display(),
        edit.deleted,
        edit.inserted
    );
    store.splice(&path, offset, edit.deleted, &edit.inserted)?;
    store.save(&path)?;
    if !was_open {
        store.close(&path)?;
    }
    info!(target: "rgview::edit", "edit propagated to {}", path.display());
    Ok(())
}

/// Character offset of (1-based line, 0-based column) in `content`.
fn locate(content: &str, filename: &str, line_number: u64, column: usize) -> Result<usize> {
    let out_of_range = || RgviewError::TargetOutOfRange {
        file: filename.to_string(),
        line: line_number,
    };
    if line_number == 0 {
        return Err(out_of_range());
    }

    let mut offset = 0usize;
    let mut current = 1u64;
    let mut lines = content.split_inclusive('\n');
    let line = loop {
        let Some(line) = lines.next() else {
            return Err(out_of_range());
        };
        if current == line_number {
            break line;
        }
        offset += line.chars().count();
        current += 1;
    };

    let line_len = line.trim_end_matches(['\n', '\r']).chars().count();
    if column > line_len {
        return Err(out_of_range());
    }
    Ok(offset + column)
}

/// Filesystem-backed [`FileStore`] holding open documents in memory.
#[derive(Debug, Default)]
pub struct FsFileStore {
    open: HashMap<PathBuf, String>,
}

impl FsFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileStore for FsFileStore {
    fn is_open(&self, path: &Path) -> bool {
        self.open.contains_key(path)
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        if !self.open.contains_key(path) {
            let content = std::fs::read_to_string(path)?;
            self.open.insert(path.to_path_buf(), content);
        }
        Ok(())
    }

    fn content(&self, path: &Path) -> Result<&str> {
        self.open
            .get(path)
            .map(String::as_str)
            .ok_or_else(|| RgviewError::FileNotOpen(path.display().to_string()))
    }

    fn splice(&mut self, path: &Path, offset: usize, delete_len: usize, text: &str) -> Result<()> {
        let content = self
            .open
            .get_mut(path)
            .ok_or_else(|| RgviewError::FileNotOpen(path.display().to_string()))?;

        let start = char_to_byte(content, offset);
        let end = char_to_byte(content, offset + delete_len);
        content.replace_range(start..end, text);
        Ok(())
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        let content = self
            .open
            .get(path)
            .ok_or_else(|| RgviewError::FileNotOpen(path.display().to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn close(&mut self, path: &Path) -> Result<()> {
        self.open.remove(path);
        Ok(())
    }
}

fn char_to_byte(s: &str, char_offset: usize) -> usize {
    s.char_indices()
        .nth(char_offset)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InvocationSpec;
    use rgview_types::{SearchSettings, SessionKey};

    fn coded_match_line(path: &str, number: u64, before: &str, hit: &str) -> String {
        format!(
            "\x1b[0m\x1b[35m{path}\x1b[0m:\x1b[0m\x1b[32m{number}\x1b[0m:{before}\x1b[0m\x1b[1m\x1b[31m{hit}\x1b[0m"
        )
    }

    fn scripted_session(dir: &Path, script: &str) -> Session {
        let mut session = Session::create(
            SessionKey::new("beta", dir),
            SearchSettings::default(),
            PathBuf::from("rg"),
            true,
        )
        .unwrap();
        session
            .start_with(InvocationSpec {
                program: PathBuf::from("sh"),
                args: vec!["-c".into(), script.into()],
            })
            .unwrap();
        session
    }

    #[tokio::test]
    async fn edit_round_trips_through_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "alpha beta\ngamma\n").unwrap();

        let line = coded_match_line("./notes.txt", 1, "alpha ", "beta");
        let mut session = scripted_session(
            dir.path(),
            &format!("printf '{}\\n'", line.replace('\x1b', "\\033")),
        );
        session.run_to_completion().await;
        assert_eq!(session.match_count(), 1);

        // Row 0 is the heading; row 1 is the match line. Replace "beta".
        let mut store = FsFileStore::new();
        propagate_edit(
            &session,
            &mut store,
            &EditEvent {
                row: 1,
                column: GUTTER_WIDTH + 6,
                deleted: 4,
                inserted: "delta".into(),
            },
        )
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "alpha delta\ngamma\n"
        );
        // Opened solely for the edit, so saved and closed.
        assert!(!store.is_open(&path));
    }

    #[tokio::test]
    async fn already_open_file_stays_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "alpha beta\n").unwrap();

        let line = coded_match_line("./notes.txt", 1, "alpha ", "beta");
        let mut session = scripted_session(
            dir.path(),
            &format!("printf '{}\\n'", line.replace('\x1b', "\\033")),
        );
        session.run_to_completion().await;

        let mut store = FsFileStore::new();
        store.open(&path).unwrap();
        propagate_edit(
            &session,
            &mut store,
            &EditEvent {
                row: 1,
                column: GUTTER_WIDTH,
                deleted: 5,
                inserted: "omega".into(),
            },
        )
        .unwrap();
        assert!(store.is_open(&path));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "omega beta\n"
        );
    }

    #[tokio::test]
    async fn rows_without_source_lines_reject_edits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "alpha\n").unwrap();
        let line = coded_match_line("./notes.txt", 1, "", "alpha");
        let mut session = scripted_session(
            dir.path(),
            &format!("printf '{}\\n'", line.replace('\x1b', "\\033")),
        );
        session.run_to_completion().await;

        let mut store = FsFileStore::new();
        // Row 0 is the heading.
        let err = propagate_edit(
            &session,
            &mut store,
            &EditEvent {
                row: 0,
                column: GUTTER_WIDTH,
                deleted: 0,
                inserted: "x".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, RgviewError::RowNotEditable(0)));

        // Columns inside the gutter are rejected too.
        let err = propagate_edit(
            &session,
            &mut store,
            &EditEvent {
                row: 1,
                column: GUTTER_WIDTH - 1,
                deleted: 0,
                inserted: "x".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, RgviewError::ColumnInGutter(_)));
    }

    #[tokio::test]
    async fn running_session_refuses_edits() {
        let dir = tempfile::tempdir().unwrap();
        let session = scripted_session(dir.path(), "sleep 5");
        let mut store = FsFileStore::new();
        let err = propagate_edit(
            &session,
            &mut store,
            &EditEvent {
                row: 0,
                column: GUTTER_WIDTH,
                deleted: 0,
                inserted: "x".into(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, RgviewError::SessionBusy));
    }

    #[test]
    fn locate_resolves_line_and_column() {
        let content = "first\nsecond\nthird\n";
        assert_eq!(locate(content, "f", 1, 0).unwrap(), 0);
        assert_eq!(locate(content, "f", 2, 3).unwrap(), 9);
        assert_eq!(locate(content, "f", 3, 0).unwrap(), 13);
    }

    #[test]
    fn locate_rejects_missing_line_and_overlong_column() {
        let content = "one\ntwo\n";
        assert!(locate(content, "f", 9, 0).is_err());
        assert!(locate(content, "f", 1, 4).is_err());
        assert!(locate(content, "f", 0, 0).is_err());
    }

    #[test]
    fn locate_counts_characters_not_bytes() {
        let content = "héllo\nwörld\n";
        // Line 2 starts after 6 characters.
        assert_eq!(locate(content, "f", 2, 1).unwrap(), 7);
    }

    #[test]
    fn splice_replaces_by_char_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "héllo world\n").unwrap();

        let mut store = FsFileStore::new();
        store.open(&path).unwrap();
        store.splice(&path, 6, 5, "there").unwrap();
        store.save(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "héllo there\n");
    }

    #[test]
    fn open_is_idempotent_and_close_releases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("b.txt");
        std::fs::write(&path, "data").unwrap();

        let mut store = FsFileStore::new();
        store.open(&path).unwrap();
        store.splice(&path, 0, 4, "kept").unwrap();
        // A second open must not clobber unsaved content.
        store.open(&path).unwrap();
        assert_eq!(store.content(&path).unwrap(), "kept");
        store.close(&path).unwrap();
        assert!(!store.is_open(&path));
    }
}

//! Engine for live, editable search results over an external line-oriented
//! search process.
//!
//! The engine owns incremental parsing of the tool's color-coded output,
//! session lifecycle (start/restart/interrupt), a bounded cache of concurrent
//! sessions, file-type relevance scoring, and propagation of in-place edits
//! back to the files results came from. Rendering and key bindings belong to
//! the host UI, which drives the operations exposed here.

mod cache;
mod classify;
mod decode;
mod edit;
mod error;
mod filetypes;
mod invocation;
mod process;
mod render;
mod session;

pub use cache::{SessionCache, SessionCacheConfig};
pub use classify::{LineClassifier, SEPARATOR_TOKEN};
pub use decode::MAX_CONTENT_LEN;
pub use edit::{EditEvent, FileStore, FsFileStore, propagate_edit};
pub use error::RgviewError;
pub use filetypes::{FileTypeCatalog, FileTypeDef, compile_glob, glob_matches};
pub use invocation::InvocationSpec;
pub use process::{ProcessEvent, SearchProcess};
pub use render::{GUTTER_WIDTH, RenderModel, Row};
pub use session::Session;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, RgviewError>;

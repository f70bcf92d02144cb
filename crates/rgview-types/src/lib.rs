//! Shared types for the rgview search engine.

mod result;
mod session;
mod settings;

pub use result::*;
pub use session::*;
pub use settings::*;

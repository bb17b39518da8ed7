//! Core definitions (error types, result helpers and the cursor contract),
//! relied upon by all dirdex-* crates.

pub mod cursor;
pub mod error;
pub mod result;

pub use cursor::{Cursor, CursorIter};
pub use result::Result;

//! Duplicate-aware attribute indices.
//!
//! An [`IndexTable`] maps attribute values to the ids of the entries holding
//! them, and ids back to values. Each direction is a [`DuplicateTable`]: a
//! key with few duplicates keeps them inline in its table slot, a key with
//! more than `duplicate_limit` keeps them in an overflow record referenced
//! by a 16-byte [`Redirect`] marker.

pub mod config;
pub mod duplicates;
pub mod marshaller;
pub mod redirect;
pub mod table;
#[cfg(test)]
mod tests;

pub use config::IndexConfig;
pub use duplicates::DuplicateTable;
pub use marshaller::{
    AvlTreeMarshaller, BytesMarshaller, Marshaller, StringMarshaller, U64Marshaller,
};
pub use redirect::{Redirect, RedirectMarshaller, is_not_redirect};
pub use table::{IdCursor, IndexEntry, IndexTable, IndexTables};

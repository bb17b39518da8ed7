//! In-memory ordered container (AVL tree) and its bidirectional cursor.
//!
//! [`AvlTree`] is a self-balancing binary search tree ordered by an explicit
//! [`Comparator`]. It holds no duplicate elements: inserting an element that
//! compares equal to a stored one is a no-op.
//!
//! [`AvlTreeCursor`] navigates a tree through any handle that dereferences to
//! it (`&AvlTree`, `Box<AvlTree>`, `Arc<AvlTree>`). The cursor carries the
//! root-to-node path as a stack of left/right steps, so stepping to an
//! adjacent element costs `O(log n)` without parent pointers in the nodes.
//!
//! Mutating a tree while a cursor is positioned on it is not supported. With a
//! borrowed handle the borrow checker rules it out; with an `Arc` handle,
//! writers are expected to go through `Arc::make_mut`, which leaves open
//! cursors on their own snapshot.

pub mod comparator;
pub mod cursor;
pub mod path;
pub mod tree;
#[cfg(test)]
mod tests;

pub use comparator::{Comparator, NaturalOrder};
pub use cursor::AvlTreeCursor;
pub use path::{NodePath, Step};
pub use tree::{AvlTree, Node};

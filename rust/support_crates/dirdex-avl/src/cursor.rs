use std::ops::Deref;

use dirdex_common::{Cursor, Result, error::Error};

use crate::{comparator::Comparator, path::NodePath, tree::AvlTree};

const CURSOR: &str = "avl tree cursor";

#[derive(Debug, Clone)]
enum Position {
    BeforeFirst,
    AfterLast,
    OnElement(NodePath),
    /// Pending position anchored just before the addressed node, or after
    /// the last element when `None`.
    Gap(Option<NodePath>),
    Closed,
}

/// Bidirectional cursor over an [`AvlTree`].
///
/// `T` is any handle to the tree: a shared reference, a `Box`, or an `Arc`
/// snapshot. The current position is kept as a root-to-node [`NodePath`] and
/// re-resolved on each step.
#[derive(Debug)]
pub struct AvlTreeCursor<T> {
    tree: T,
    position: Position,
}

impl<T> AvlTreeCursor<T> {
    /// Creates a cursor positioned before the first element.
    pub fn new(tree: T) -> AvlTreeCursor<T> {
        AvlTreeCursor {
            tree,
            position: Position::BeforeFirst,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if matches!(self.position, Position::Closed) {
            return Err(Error::closed(CURSOR));
        }
        Ok(())
    }
}

impl<T, K, C> Cursor for AvlTreeCursor<T>
where
    T: Deref<Target = AvlTree<K, C>>,
    C: Comparator<K> + 'static,
{
    type Element = K;

    fn available(&self) -> bool {
        matches!(self.position, Position::OnElement(_))
    }

    fn before(&mut self, element: &K) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::Gap(self.tree.path_to_ceiling(element));
        Ok(())
    }

    fn after(&mut self, element: &K) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::Gap(self.tree.path_above(element));
        Ok(())
    }

    fn before_first(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::BeforeFirst;
        Ok(())
    }

    fn after_last(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.position = Position::AfterLast;
        Ok(())
    }

    fn first(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.position = match self.tree.first_path() {
            Some(path) => Position::OnElement(path),
            None => Position::BeforeFirst,
        };
        Ok(self.available())
    }

    fn last(&mut self) -> Result<bool> {
        self.ensure_open()?;
        self.position = match self.tree.last_path() {
            Some(path) => Position::OnElement(path),
            None => Position::AfterLast,
        };
        Ok(self.available())
    }

    fn previous(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let tree = &*self.tree;
        let position = std::mem::replace(&mut self.position, Position::BeforeFirst);
        self.position = match position {
            Position::BeforeFirst | Position::Closed => Position::BeforeFirst,
            Position::AfterLast | Position::Gap(None) => match tree.last_path() {
                Some(path) => Position::OnElement(path),
                None => Position::BeforeFirst,
            },
            Position::OnElement(mut path) | Position::Gap(Some(mut path)) => {
                if tree.predecessor_path(&mut path) {
                    Position::OnElement(path)
                } else {
                    Position::BeforeFirst
                }
            }
        };
        Ok(self.available())
    }

    fn next(&mut self) -> Result<bool> {
        self.ensure_open()?;
        let tree = &*self.tree;
        let position = std::mem::replace(&mut self.position, Position::AfterLast);
        self.position = match position {
            Position::AfterLast | Position::Gap(None) | Position::Closed => Position::AfterLast,
            Position::BeforeFirst => match tree.first_path() {
                Some(path) => Position::OnElement(path),
                None => Position::AfterLast,
            },
            Position::Gap(Some(path)) => Position::OnElement(path),
            Position::OnElement(mut path) => {
                if tree.successor_path(&mut path) {
                    Position::OnElement(path)
                } else {
                    Position::AfterLast
                }
            }
        };
        Ok(self.available())
    }

    fn get(&self) -> Result<&K> {
        match &self.position {
            Position::OnElement(path) => self
                .tree
                .node_at(path)
                .map(|node| node.key())
                .ok_or_else(|| Error::invalid_position(CURSOR)),
            Position::Closed => Err(Error::closed(CURSOR)),
            _ => Err(Error::invalid_position(CURSOR)),
        }
    }

    fn is_element_reused(&self) -> bool {
        true
    }

    fn close(&mut self) -> Result<()> {
        self.position = Position::Closed;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        matches!(self.position, Position::Closed)
    }
}

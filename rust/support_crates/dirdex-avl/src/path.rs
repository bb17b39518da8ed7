//! Root-to-node paths and the tree traversal primitives built on them.

use std::cmp::Ordering;

use tinyvec::TinyVec;

use crate::{
    comparator::Comparator,
    tree::{AvlTree, Node},
};

/// One step down from a node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    #[default]
    Left,
    Right,
}

/// Sequence of steps from the root to a node. The empty path addresses the
/// root itself.
///
/// AVL height is below `1.45 * log2(n + 2)`, so 32 inline steps cover trees
/// of several million elements before the path spills to the heap.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NodePath(TinyVec<[Step; 32]>);

impl NodePath {
    pub fn new() -> NodePath {
        NodePath::default()
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    fn push(&mut self, step: Step) {
        self.0.push(step);
    }

    fn truncate(&mut self, depth: usize) {
        self.0.truncate(depth);
    }

    fn last_turn(&self, step: Step) -> Option<usize> {
        self.0.iter().rposition(|&s| s == step)
    }
}

impl<K, C> AvlTree<K, C> {
    /// Resolves `path` to a node, or `None` if the path leads off the tree.
    pub fn node_at(&self, path: &NodePath) -> Option<&Node<K>> {
        let mut node = self.root()?;
        for step in path.steps() {
            node = match step {
                Step::Left => node.left()?,
                Step::Right => node.right()?,
            };
        }
        Some(node)
    }

    /// Path to the root, or `None` for an empty tree.
    pub fn root_path(&self) -> Option<NodePath> {
        self.root().map(|_| NodePath::new())
    }

    /// Path to the smallest element.
    pub fn first_path(&self) -> Option<NodePath> {
        let mut node = self.root()?;
        let mut path = NodePath::new();
        while let Some(left) = node.left() {
            path.push(Step::Left);
            node = left;
        }
        Some(path)
    }

    /// Path to the largest element.
    pub fn last_path(&self) -> Option<NodePath> {
        let mut node = self.root()?;
        let mut path = NodePath::new();
        while let Some(right) = node.right() {
            path.push(Step::Right);
            node = right;
        }
        Some(path)
    }

    /// Moves `path` to the in-order successor of the node it addresses.
    /// Returns `false`, leaving `path` unchanged, if there is none.
    pub fn successor_path(&self, path: &mut NodePath) -> bool {
        let Some(node) = self.node_at(path) else {
            return false;
        };
        if let Some(mut next) = node.right() {
            path.push(Step::Right);
            while let Some(left) = next.left() {
                path.push(Step::Left);
                next = left;
            }
            return true;
        }
        // The successor is the deepest ancestor whose left subtree holds us.
        match path.last_turn(Step::Left) {
            Some(depth) => {
                path.truncate(depth);
                true
            }
            None => false,
        }
    }

    /// Moves `path` to the in-order predecessor of the node it addresses.
    /// Returns `false`, leaving `path` unchanged, if there is none.
    pub fn predecessor_path(&self, path: &mut NodePath) -> bool {
        let Some(node) = self.node_at(path) else {
            return false;
        };
        if let Some(mut prev) = node.left() {
            path.push(Step::Left);
            while let Some(right) = prev.right() {
                path.push(Step::Right);
                prev = right;
            }
            return true;
        }
        match path.last_turn(Step::Right) {
            Some(depth) => {
                path.truncate(depth);
                true
            }
            None => false,
        }
    }
}

impl<K, C: Comparator<K>> AvlTree<K, C> {
    /// Path to the smallest element greater than or equal to `target`.
    pub fn path_to_ceiling(&self, target: &K) -> Option<NodePath> {
        self.bound_path(target, |ord| ord != Ordering::Greater, Step::Left)
    }

    /// Path to the smallest element strictly greater than `target`.
    pub fn path_above(&self, target: &K) -> Option<NodePath> {
        self.bound_path(target, |ord| ord == Ordering::Less, Step::Left)
    }

    /// Path to the largest element less than or equal to `target`.
    pub fn path_to_floor(&self, target: &K) -> Option<NodePath> {
        self.bound_path(target, |ord| ord != Ordering::Less, Step::Right)
    }

    /// Path to the largest element strictly less than `target`.
    pub fn path_below(&self, target: &K) -> Option<NodePath> {
        self.bound_path(target, |ord| ord == Ordering::Greater, Step::Right)
    }

    /// Descends from the root comparing `target` against each node. A node is a
    /// candidate when `accept(compare(target, key))` holds; the search then
    /// continues towards `toward` for a tighter candidate, and otherwise
    /// away from it. Returns the path to the last candidate seen.
    fn bound_path(
        &self,
        target: &K,
        accept: impl Fn(Ordering) -> bool,
        toward: Step,
    ) -> Option<NodePath> {
        let mut path = NodePath::new();
        let mut best = None;
        let mut cur = self.root();
        while let Some(node) = cur {
            let step = if accept(self.comparator().compare(target, node.key())) {
                best = Some(path.depth());
                toward
            } else {
                match toward {
                    Step::Left => Step::Right,
                    Step::Right => Step::Left,
                }
            };
            cur = match step {
                Step::Left => node.left(),
                Step::Right => node.right(),
            };
            path.push(step);
        }
        let depth = best?;
        path.truncate(depth);
        Some(path)
    }
}

//! AVL tree with comparator-driven ordering and exclusive (child-link)
//! ownership of nodes.

use std::cmp::Ordering;

use dirdex_common::{Result, error::Error};

use crate::comparator::{Comparator, NaturalOrder};

pub(crate) type Link<K> = Option<Box<Node<K>>>;

/// A single tree node.
///
/// `balance` is `height(right) - height(left)` and stays within `-1..=1`
/// between public operations.
#[derive(Debug, Clone)]
pub struct Node<K> {
    pub(crate) key: K,
    pub(crate) left: Link<K>,
    pub(crate) right: Link<K>,
    pub(crate) balance: i8,
}

impl<K> Node<K> {
    fn new(key: K) -> Node<K> {
        Node {
            key,
            left: None,
            right: None,
            balance: 0,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn left(&self) -> Option<&Node<K>> {
        self.left.as_deref()
    }

    pub fn right(&self) -> Option<&Node<K>> {
        self.right.as_deref()
    }

    pub fn balance(&self) -> i8 {
        self.balance
    }
}

/// Self-balancing ordered container without duplicate elements.
#[derive(Debug, Clone)]
pub struct AvlTree<K, C = NaturalOrder> {
    pub(crate) root: Link<K>,
    size: usize,
    comparator: C,
}

impl<K: Ord> AvlTree<K> {
    /// Creates an empty tree ordered by `K`'s `Ord` implementation.
    pub fn new() -> AvlTree<K> {
        AvlTree::with_comparator(NaturalOrder)
    }
}

impl<K: Ord> Default for AvlTree<K> {
    fn default() -> Self {
        AvlTree::new()
    }
}

impl<K, C> AvlTree<K, C> {
    /// Returns the number of elements, in `O(1)`.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    pub fn root(&self) -> Option<&Node<K>> {
        self.root.as_deref()
    }

    /// Returns the smallest element.
    pub fn first(&self) -> Option<&K> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.key)
    }

    /// Returns the largest element.
    pub fn last(&self) -> Option<&K> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(&node.key)
    }

    pub fn clear(&mut self) {
        self.root = None;
        self.size = 0;
    }

    /// In-order iterator over the elements.
    pub fn iter(&self) -> Iter<'_, K> {
        let mut iter = Iter {
            stack: Vec::new(),
            remaining: self.size,
        };
        iter.push_left_spine(self.root.as_deref());
        iter
    }
}

impl<K, C: Comparator<K>> AvlTree<K, C> {
    /// Creates an empty tree ordered by `comparator`.
    pub fn with_comparator(comparator: C) -> AvlTree<K, C> {
        AvlTree {
            root: None,
            size: 0,
            comparator,
        }
    }

    /// Builds a perfectly balanced tree from elements that are already in
    /// strictly ascending comparator order.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error if two adjacent elements are not
    /// strictly ascending.
    pub fn from_sorted(comparator: C, items: Vec<K>) -> Result<AvlTree<K, C>> {
        for (i, pair) in items.windows(2).enumerate() {
            if comparator.compare(&pair[0], &pair[1]) != Ordering::Less {
                return Err(Error::invalid_arg(
                    "items",
                    format!("elements {i} and {} are not strictly ascending", i + 1),
                ));
            }
        }
        let size = items.len();
        let mut items = items.into_iter();
        let (root, _) = build_balanced(size, &mut items);
        Ok(AvlTree {
            root,
            size,
            comparator,
        })
    }

    /// Inserts `key` unless an equal element is already present.
    ///
    /// Returns `true` if the element was inserted.
    pub fn insert(&mut self, key: K) -> bool {
        let (inserted, _) = insert_at(&mut self.root, key, &self.comparator);
        if inserted {
            self.size += 1;
        }
        inserted
    }

    /// Removes the element equal to `key`.
    ///
    /// Returns `true` if an element was removed.
    pub fn remove(&mut self, key: &K) -> bool {
        let (removed, _) = remove_at(&mut self.root, key, &self.comparator);
        if removed {
            self.size -= 1;
        }
        removed
    }

    /// Returns the stored element equal to `key`.
    pub fn find(&self, key: &K) -> Option<&K> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            cur = match self.comparator.compare(key, &node.key) {
                Ordering::Equal => return Some(&node.key),
                Ordering::Less => node.left.as_deref(),
                Ordering::Greater => node.right.as_deref(),
            };
        }
        None
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }
}

impl<K: Ord> FromIterator<K> for AvlTree<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = AvlTree::new();
        for key in iter {
            tree.insert(key);
        }
        tree
    }
}

impl<'a, K, C> IntoIterator for &'a AvlTree<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// In-order iterator over the elements of an [`AvlTree`].
pub struct Iter<'a, K> {
    stack: Vec<&'a Node<K>>,
    remaining: usize,
}

impl<'a, K> Iter<'a, K> {
    fn push_left_spine(&mut self, mut node: Option<&'a Node<K>>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        self.remaining -= 1;
        Some(&node.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

/// Returns `(inserted, grew)`, where `grew` reports whether the height of
/// the subtree rooted at `slot` increased.
fn insert_at<K, C: Comparator<K>>(slot: &mut Link<K>, key: K, comparator: &C) -> (bool, bool) {
    if slot.is_none() {
        *slot = Some(Box::new(Node::new(key)));
        return (true, true);
    }
    let Some(node) = slot.as_mut() else {
        return (false, false);
    };
    let (inserted, grew, delta) = match comparator.compare(&key, &node.key) {
        Ordering::Equal => return (false, false),
        Ordering::Less => {
            let (inserted, grew) = insert_at(&mut node.left, key, comparator);
            (inserted, grew, -1)
        }
        Ordering::Greater => {
            let (inserted, grew) = insert_at(&mut node.right, key, comparator);
            (inserted, grew, 1)
        }
    };
    if !grew {
        return (inserted, false);
    }
    node.balance += delta;
    let balance = node.balance;
    match balance {
        0 => (inserted, false),
        -1 | 1 => (inserted, true),
        _ => {
            // A rotation after insertion restores the pre-insert height.
            rebalance(slot);
            (inserted, false)
        }
    }
}

/// Returns `(removed, shrunk)`, where `shrunk` reports whether the height of
/// the subtree rooted at `slot` decreased.
fn remove_at<K, C: Comparator<K>>(slot: &mut Link<K>, key: &K, comparator: &C) -> (bool, bool) {
    let Some(node) = slot.as_mut() else {
        return (false, false);
    };
    let (removed, shrunk, delta) = match comparator.compare(key, &node.key) {
        Ordering::Less => {
            let (removed, shrunk) = remove_at(&mut node.left, key, comparator);
            (removed, shrunk, 1)
        }
        Ordering::Greater => {
            let (removed, shrunk) = remove_at(&mut node.right, key, comparator);
            (removed, shrunk, -1)
        }
        Ordering::Equal => {
            if node.left.is_some() && node.right.is_some() {
                // Promote the in-order successor; the physically removed node
                // is the minimum of the right subtree.
                match take_min(&mut node.right) {
                    Some((successor, shrunk)) => {
                        node.key = successor;
                        (true, shrunk, -1)
                    }
                    None => return (false, false),
                }
            } else {
                let Some(mut removed) = slot.take() else {
                    return (false, false);
                };
                *slot = removed.left.take().or_else(|| removed.right.take());
                return (true, true);
            }
        }
    };
    if !shrunk {
        return (removed, false);
    }
    if let Some(node) = slot.as_mut() {
        node.balance += delta;
    }
    (removed, settle_after_shrink(slot))
}

/// Detaches the minimum node of the subtree at `slot`, returning its key and
/// whether the subtree height decreased.
fn take_min<K>(slot: &mut Link<K>) -> Option<(K, bool)> {
    let node = slot.as_mut()?;
    if node.left.is_some() {
        let (key, shrunk) = take_min(&mut node.left)?;
        if !shrunk {
            return Some((key, false));
        }
        node.balance += 1;
        return Some((key, settle_after_shrink(slot)));
    }
    let mut node = slot.take()?;
    *slot = node.right.take();
    Some((node.key, true))
}

/// Called after one child subtree of `slot` lost one level of height and the
/// balance factor has been adjusted. Rebalances if needed and reports
/// whether the height of `slot` itself decreased.
fn settle_after_shrink<K>(slot: &mut Link<K>) -> bool {
    let Some(balance) = slot.as_ref().map(|n| n.balance) else {
        return true;
    };
    match balance {
        0 => true,
        -1 | 1 => false,
        _ => {
            rebalance(slot);
            slot.as_ref().is_none_or(|n| n.balance == 0)
        }
    }
}

/// Restores the AVL invariant at `slot`, whose balance factor is `-2` or `2`.
fn rebalance<K>(slot: &mut Link<K>) {
    let Some(node) = slot.as_mut() else {
        return;
    };
    if node.balance < -1 {
        if node.left.as_ref().is_some_and(|l| l.balance > 0) {
            rotate_left(&mut node.left);
        }
        rotate_right(slot);
    } else if node.balance > 1 {
        if node.right.as_ref().is_some_and(|r| r.balance < 0) {
            rotate_right(&mut node.right);
        }
        rotate_left(slot);
    }
}

fn rotate_left<K>(slot: &mut Link<K>) {
    let Some(mut root) = slot.take() else {
        return;
    };
    let Some(mut pivot) = root.right.take() else {
        *slot = Some(root);
        return;
    };
    root.right = pivot.left.take();
    root.balance = root.balance - 1 - pivot.balance.max(0);
    pivot.balance = pivot.balance - 1 + root.balance.min(0);
    pivot.left = Some(root);
    *slot = Some(pivot);
}

fn rotate_right<K>(slot: &mut Link<K>) {
    let Some(mut root) = slot.take() else {
        return;
    };
    let Some(mut pivot) = root.left.take() else {
        *slot = Some(root);
        return;
    };
    root.left = pivot.right.take();
    root.balance = root.balance + 1 - pivot.balance.min(0);
    pivot.balance = pivot.balance + 1 + root.balance.max(0);
    pivot.right = Some(root);
    *slot = Some(pivot);
}

/// Builds a balanced subtree from the next `len` items, returning it with
/// its height.
fn build_balanced<K>(len: usize, items: &mut std::vec::IntoIter<K>) -> (Link<K>, i32) {
    if len == 0 {
        return (None, 0);
    }
    let left_len = len / 2;
    let (left, left_height) = build_balanced(left_len, items);
    let Some(key) = items.next() else {
        return (left, left_height);
    };
    let (right, right_height) = build_balanced(len - left_len - 1, items);
    let node = Node {
        key,
        left,
        right,
        balance: (right_height - left_height) as i8,
    };
    (Some(Box::new(node)), 1 + left_height.max(right_height))
}

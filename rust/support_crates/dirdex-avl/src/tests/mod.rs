mod path_tests;

use crate::{
    comparator::Comparator,
    tree::{AvlTree, Node},
};

/// Walks the whole tree checking stored balance factors against actual
/// subtree heights, the AVL bound, and strict ordering. Returns the height.
pub(crate) fn check_invariants<K, C: Comparator<K>>(tree: &AvlTree<K, C>) -> usize {
    fn walk<K, C: Comparator<K>>(node: Option<&Node<K>>, cmp: &C, count: &mut usize) -> usize {
        let Some(node) = node else {
            return 0;
        };
        *count += 1;
        if let Some(left) = node.left() {
            assert_eq!(cmp.compare(left.key(), node.key()), std::cmp::Ordering::Less);
        }
        if let Some(right) = node.right() {
            assert_eq!(cmp.compare(right.key(), node.key()), std::cmp::Ordering::Greater);
        }
        let lh = walk(node.left(), cmp, count);
        let rh = walk(node.right(), cmp, count);
        assert_eq!(node.balance() as isize, rh as isize - lh as isize);
        assert!((-1..=1).contains(&node.balance()));
        1 + lh.max(rh)
    }

    let mut count = 0;
    let height = walk(tree.root(), tree.comparator(), &mut count);
    assert_eq!(count, tree.len());
    let keys = tree.iter().collect::<Vec<_>>();
    for pair in keys.windows(2) {
        assert_eq!(
            tree.comparator().compare(pair[0], pair[1]),
            std::cmp::Ordering::Less
        );
    }
    height
}

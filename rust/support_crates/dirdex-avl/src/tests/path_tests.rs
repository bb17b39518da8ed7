use crate::{AvlTree, NodePath, Step};

fn key_at(tree: &AvlTree<u64>, path: Option<NodePath>) -> Option<u64> {
    path.and_then(|p| tree.node_at(&p).map(|n| *n.key()))
}

fn sample() -> AvlTree<u64> {
    [3u64, 7, 10, 11].into_iter().collect()
}

#[test]
fn test_bounds() {
    let tree = sample();
    assert_eq!(key_at(&tree, tree.path_to_ceiling(&7)), Some(7));
    assert_eq!(key_at(&tree, tree.path_to_ceiling(&8)), Some(10));
    assert_eq!(key_at(&tree, tree.path_to_ceiling(&12)), None);
    assert_eq!(key_at(&tree, tree.path_above(&7)), Some(10));
    assert_eq!(key_at(&tree, tree.path_above(&0)), Some(3));
    assert_eq!(key_at(&tree, tree.path_above(&11)), None);
    assert_eq!(key_at(&tree, tree.path_to_floor(&9)), Some(7));
    assert_eq!(key_at(&tree, tree.path_to_floor(&11)), Some(11));
    assert_eq!(key_at(&tree, tree.path_to_floor(&2)), None);
    assert_eq!(key_at(&tree, tree.path_below(&10)), Some(7));
    assert_eq!(key_at(&tree, tree.path_below(&3)), None);
}

#[test]
fn test_bounds_match_btree_set() {
    fastrand::seed(91734123);
    let keys = (0..300).map(|_| fastrand::u64(0..1000)).collect::<Vec<_>>();
    let tree = keys.iter().copied().collect::<AvlTree<_>>();
    let model = keys.into_iter().collect::<std::collections::BTreeSet<_>>();
    for target in 0..1001u64 {
        assert_eq!(
            key_at(&tree, tree.path_to_ceiling(&target)),
            model.range(target..).next().copied()
        );
        assert_eq!(
            key_at(&tree, tree.path_above(&target)),
            model.range(target + 1..).next().copied()
        );
        assert_eq!(
            key_at(&tree, tree.path_to_floor(&target)),
            model.range(..=target).next_back().copied()
        );
        assert_eq!(
            key_at(&tree, tree.path_below(&target)),
            model.range(..target).next_back().copied()
        );
    }
}

#[test]
fn test_successor_and_predecessor_walks() {
    let tree = (0..50u64).map(|i| i * 2).collect::<AvlTree<_>>();

    let mut path = tree.first_path().unwrap();
    let mut forward = vec![*tree.node_at(&path).unwrap().key()];
    while tree.successor_path(&mut path) {
        forward.push(*tree.node_at(&path).unwrap().key());
    }
    assert_eq!(forward, tree.iter().copied().collect::<Vec<_>>());
    // Exhausted walk leaves the path on the last element.
    assert_eq!(tree.node_at(&path).map(|n| *n.key()), Some(98));

    let mut path = tree.last_path().unwrap();
    let mut backward = vec![*tree.node_at(&path).unwrap().key()];
    while tree.predecessor_path(&mut path) {
        backward.push(*tree.node_at(&path).unwrap().key());
    }
    forward.reverse();
    assert_eq!(backward, forward);
}

#[test]
fn test_root_path() {
    let tree = sample();
    let root = tree.root_path().unwrap();
    assert_eq!(root, NodePath::new());
    assert_eq!(root.depth(), 0);
    assert_eq!(tree.node_at(&root).map(|n| *n.key()), tree.root().map(|n| *n.key()));

    let empty = AvlTree::<u64>::new();
    assert!(empty.root_path().is_none());
    assert!(empty.node_at(&root).is_none());
    assert!(empty.first_path().is_none());
    assert!(empty.last_path().is_none());
}

#[test]
fn test_first_path_goes_left() {
    let tree = (0..31u64).collect::<AvlTree<_>>();
    let path = tree.first_path().unwrap();
    assert!(path.steps().iter().all(|&s| s == Step::Left));
    assert_eq!(tree.node_at(&path).map(|n| *n.key()), Some(0));
}

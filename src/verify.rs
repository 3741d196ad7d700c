//! Structural checks for a B-tree.
//!
//! `verify_node` walks the whole tree breadth-first and checks, per node, that keys are
//! strictly increasing, that key and child counts respect the bounds for the minimum
//! degree, and that every child subtree lies inside the interval its separators define.
//! A second pass confirms every leaf sits at the same depth. The height contracts used
//! after `insert` and `delete` live here as well.

use std::collections::VecDeque;
use std::fmt::Debug;

use crate::config::max_keys_for;
use crate::error::{BTreeError, Invariant, Result};
use crate::node::Node;

/// Shape of the tree captured before a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub height: usize,
    pub root_keys: usize,
    pub root_is_leaf: bool,
}

/// Runs every structural check on the tree rooted at `root`.
pub(crate) fn verify_node<K: Ord + Clone + Debug>(root: &Node<K>, t: usize) -> Result<()> {
    let mut queue = VecDeque::from([(root, true)]);
    while let Some((node, is_root)) = queue.pop_front() {
        check_keys_sorted(node)?;
        check_key_count(node, t, is_root)?;
        check_child_count(node, t, is_root)?;
        check_partition(node)?;
        queue.extend(node.children.iter().map(|c| (c.as_ref(), false)));
    }
    check_leaf_depths(root)
}

fn check_keys_sorted<K: Ord + Debug>(node: &Node<K>) -> Result<()> {
    if let Some(pair) = node.keys.windows(2).find(|w| w[0] >= w[1]) {
        return Err(BTreeError::violation(
            Invariant::KeysSorted,
            format!("keys {:?} out of order in node {:?}", pair, node.keys),
        ));
    }
    Ok(())
}

fn check_key_count<K: Debug>(node: &Node<K>, t: usize, is_root: bool) -> Result<()> {
    let len = node.keys.len();
    if is_root && node.leaf && len == 0 {
        return Ok(());
    }

    let min_keys = if is_root { 1 } else { t - 1 };
    let max_keys = max_keys_for(t);
    if len < min_keys || len > max_keys {
        return Err(BTreeError::violation(
            Invariant::KeyCount,
            format!(
                "{} node {:?} has {} keys, expected {}..={}",
                if is_root { "root" } else { "non-root" },
                node.keys,
                len,
                min_keys,
                max_keys
            ),
        ));
    }
    Ok(())
}

fn check_child_count<K: Debug>(node: &Node<K>, t: usize, is_root: bool) -> Result<()> {
    let len = node.children.len();
    if node.leaf {
        if len != 0 {
            return Err(BTreeError::violation(
                Invariant::ChildCount,
                format!("leaf {:?} has {} children", node.keys, len),
            ));
        }
        return Ok(());
    }

    if len != node.keys.len() + 1 {
        return Err(BTreeError::violation(
            Invariant::ChildCount,
            format!("internal node {:?} has {} children for {} keys", node.keys, len, node.keys.len()),
        ));
    }

    let min_children = if is_root { 2 } else { t };
    let max_children = max_keys_for(t) + 1;
    if len < min_children || len > max_children {
        return Err(BTreeError::violation(
            Invariant::ChildCount,
            format!(
                "internal node {:?} has {} children, expected {}..={}",
                node.keys, len, min_children, max_children
            ),
        ));
    }
    Ok(())
}

/// children[i] holds only keys strictly between keys[i-1] and keys[i]
fn check_partition<K: Ord + Clone + Debug>(node: &Node<K>) -> Result<()> {
    if node.leaf {
        return Ok(());
    }

    for (i, separator) in node.keys.iter().enumerate() {
        if let Some(bad) = node.children[i].all_keys().into_iter().find(|k| *k >= separator) {
            return Err(BTreeError::violation(
                Invariant::Partition,
                format!("key {:?} left of separator {:?}", bad, separator),
            ));
        }
        if let Some(bad) = node.children[i + 1].all_keys().into_iter().find(|k| *k <= separator) {
            return Err(BTreeError::violation(
                Invariant::Partition,
                format!("key {:?} right of separator {:?}", bad, separator),
            ));
        }
    }
    Ok(())
}

fn check_leaf_depths<K>(root: &Node<K>) -> Result<()> {
    let mut depths = leaf_depths(root);
    depths.dedup();
    if depths.len() > 1 {
        return Err(BTreeError::violation(
            Invariant::LeafDepth,
            format!("leaves found at depths {:?}", depths),
        ));
    }
    Ok(())
}

/// Depth of every leaf, breadth-first (so non-decreasing)
fn leaf_depths<K>(root: &Node<K>) -> Vec<usize> {
    let mut depths = vec![];
    let mut queue = VecDeque::from([(root, 0usize)]);
    while let Some((node, depth)) = queue.pop_front() {
        if node.leaf {
            depths.push(depth);
        }
        queue.extend(node.children.iter().map(|c| (c.as_ref(), depth + 1)));
    }
    depths
}

/// Height grows by exactly one iff the root was full, otherwise it is unchanged.
pub(crate) fn check_insert_contract(before: &Snapshot, height: usize, t: usize) -> Result<()> {
    let root_was_full = before.root_keys == max_keys_for(t);
    let expected = if root_was_full { before.height + 1 } else { before.height };
    if height != expected {
        return Err(BTreeError::violation(
            Invariant::HeightChange,
            format!(
                "insert changed height {} -> {} (root full before: {})",
                before.height, height, root_was_full
            ),
        ));
    }
    Ok(())
}

/// Height is unchanged or shrinks by one, and shrinks iff the root was internal with one key.
pub(crate) fn check_delete_contract(before: &Snapshot, height: usize) -> Result<()> {
    let may_shrink = before.root_keys == 1 && !before.root_is_leaf;
    let unchanged = height == before.height;
    let shrunk = height + 1 == before.height;

    if !(unchanged || shrunk) || (shrunk && !may_shrink) {
        return Err(BTreeError::violation(
            Invariant::HeightChange,
            format!(
                "delete changed height {} -> {} (root keys before: {}, root leaf before: {})",
                before.height, height, before.root_keys, before.root_is_leaf
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(keys: Vec<i64>) -> Box<Node<i64>> {
        Box::new(Node { keys, children: vec![], leaf: true })
    }

    fn internal(keys: Vec<i64>, children: Vec<Box<Node<i64>>>) -> Box<Node<i64>> {
        Box::new(Node { keys, children, leaf: false })
    }

    fn rule(result: Result<()>) -> Option<Invariant> {
        result.err().and_then(|e| e.invariant())
    }

    fn check(root: &Node<i64>, t: usize) -> Option<Invariant> {
        rule(verify_node(root, t))
    }

    #[test]
    fn test_empty_root_is_valid() {
        let root: Node<i64> = Node::new_leaf();
        assert!(verify_node(&root, 2).is_ok());
    }

    #[test]
    fn test_valid_two_level_tree() {
        let root = internal(vec![20], vec![leaf(vec![10]), leaf(vec![30, 40])]);
        assert_eq!(check(&root, 2), None);
    }

    #[test]
    fn test_unsorted_keys() {
        let root = leaf(vec![20, 10]);
        assert_eq!(check(&root, 3), Some(Invariant::KeysSorted));
    }

    #[test]
    fn test_duplicate_keys() {
        let root = leaf(vec![10, 10]);
        assert_eq!(check(&root, 3), Some(Invariant::KeysSorted));
    }

    #[test]
    fn test_overfull_node() {
        let root = leaf(vec![1, 2, 3, 4]);
        assert_eq!(check(&root, 2), Some(Invariant::KeyCount));
    }

    #[test]
    fn test_underfull_non_root() {
        // t = 3 requires at least two keys outside the root
        let root = internal(vec![20], vec![leaf(vec![10]), leaf(vec![30, 40])]);
        assert_eq!(check(&root, 3), Some(Invariant::KeyCount));
    }

    #[test]
    fn test_empty_internal_root() {
        let root = internal(vec![], vec![leaf(vec![10])]);
        assert_eq!(check(&root, 2), Some(Invariant::KeyCount));
    }

    #[test]
    fn test_missing_child() {
        let root = internal(vec![20, 40], vec![leaf(vec![10]), leaf(vec![30])]);
        assert_eq!(check(&root, 2), Some(Invariant::ChildCount));
    }

    #[test]
    fn test_leaf_with_children() {
        let root = Node { keys: vec![20], children: vec![leaf(vec![10]), leaf(vec![30])], leaf: true };
        assert_eq!(check(&root, 2), Some(Invariant::ChildCount));
    }

    #[test]
    fn test_partition_violation() {
        let root = internal(vec![20], vec![leaf(vec![10]), leaf(vec![15, 30])]);
        assert_eq!(check(&root, 2), Some(Invariant::Partition));

        let root = internal(vec![20], vec![leaf(vec![10, 20]), leaf(vec![30])]);
        assert_eq!(check(&root, 2), Some(Invariant::Partition));
    }

    #[test]
    fn test_deep_partition_violation() {
        // 5 sits two levels below the root but right of separator 20
        let right = internal(vec![30], vec![leaf(vec![5]), leaf(vec![40])]);
        let left = internal(vec![5], vec![leaf(vec![1]), leaf(vec![10])]);
        let root = internal(vec![20], vec![left, right]);
        assert_eq!(check(&root, 2), Some(Invariant::Partition));
    }

    #[test]
    fn test_uneven_leaf_depths() {
        let right = internal(vec![30], vec![leaf(vec![25]), leaf(vec![35])]);
        let root = internal(vec![20], vec![leaf(vec![10]), right]);
        assert_eq!(check(&root, 2), Some(Invariant::LeafDepth));
    }

    #[test]
    fn test_insert_contract() {
        let before = Snapshot { height: 0, root_keys: 3, root_is_leaf: true };
        assert!(check_insert_contract(&before, 1, 2).is_ok());
        assert!(check_insert_contract(&before, 0, 2).is_err());

        let before = Snapshot { height: 1, root_keys: 2, root_is_leaf: false };
        assert!(check_insert_contract(&before, 1, 2).is_ok());
        assert_eq!(
            rule(check_insert_contract(&before, 2, 2)),
            Some(Invariant::HeightChange)
        );
    }

    #[test]
    fn test_delete_contract() {
        let before = Snapshot { height: 1, root_keys: 1, root_is_leaf: false };
        assert!(check_delete_contract(&before, 0).is_ok());
        assert!(check_delete_contract(&before, 1).is_ok());

        let before = Snapshot { height: 2, root_keys: 2, root_is_leaf: false };
        assert_eq!(rule(check_delete_contract(&before, 1)), Some(Invariant::HeightChange));
        assert_eq!(rule(check_delete_contract(&before, 3)), Some(Invariant::HeightChange));
        assert_eq!(rule(check_delete_contract(&before, 0)), Some(Invariant::HeightChange));
    }
}

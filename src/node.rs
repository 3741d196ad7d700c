use std::collections::VecDeque;
use std::fmt::Debug;

use crate::config::max_keys_for;
use crate::error::{BTreeError, Invariant, Result};

// A B-tree of minimum degree t (CLRS definition, t >= 2):
// Root node when it is a leaf: min 0 max 2t-1 keys, no children
// Root node when it is internal: min 1 max 2t-1 keys, min 2 max 2t children
// Any other node: min t-1 max 2t-1 keys, internal ones min t max 2t children
// An internal node always has exactly one more child than it has keys.

/// A single B-tree node.
///
/// Children are owned exclusively through `Box`, so the structure is always a
/// tree without back references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<K> {
    pub(crate) keys: Vec<K>,
    pub(crate) children: Vec<Box<Node<K>>>,
    pub(crate) leaf: bool,
}

impl<K> Node<K> {
    pub(crate) fn new_leaf() -> Self {
        Node { keys: vec![], children: vec![], leaf: true }
    }

    pub(crate) fn new_internal() -> Self {
        Node { keys: vec![], children: vec![], leaf: false }
    }

    /// Keys stored in this node, ascending.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Child nodes; empty for a leaf.
    pub fn children(&self) -> &[Box<Node<K>>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }
}

impl<K: Ord + Clone + Debug> Node<K> {
    /// Searches for a key within this node's keys
    ///
    /// Returns (true, idx) if the key is stored at idx, otherwise (false, idx) where
    /// idx is the position of the first key greater than the search key, which is also
    /// the index of the child the key belongs in
    pub(crate) fn search(&self, key: &K) -> (bool, usize) {
        match self.keys.binary_search(key) {
            Ok(idx) => (true, idx),
            Err(idx) => (false, idx),
        }
    }

    /// Inserts a key into the subtree rooted at this node
    ///
    /// This node must not be full. Full children are split before descending into them
    /// so the median promoted by a split always has room in its parent.
    pub(crate) fn insert_non_full(&mut self, key: K, t: usize) {
        let (_, mut idx) = self.search(&key);

        if self.leaf {
            self.keys.insert(idx, key);
            return;
        }

        if self.children[idx].keys.len() == max_keys_for(t) {
            self.split_child(idx, t);
            // The promoted median now sits at idx; pick the half the key belongs in
            if key > self.keys[idx] {
                idx += 1;
            }
        }
        self.children[idx].insert_non_full(key, t);
    }

    /// Splits the full child at child_idx (2t-1 keys) around its median
    ///
    /// The median (index t-1) moves up into this node at child_idx, keys t..2t-2 and
    /// children t..2t-1 move into a new sibling placed at child_idx + 1.
    pub(crate) fn split_child(&mut self, child_idx: usize, t: usize) {
        let child = &mut self.children[child_idx];

        let right_keys = child.keys.split_off(t);
        let median = child.keys.remove(t - 1);
        let right_children = if child.leaf {
            vec![]
        } else {
            child.children.split_off(t)
        };

        let sibling = Node { keys: right_keys, children: right_children, leaf: child.leaf };

        tracing::trace!(
            target: "b_tree::split",
            index = child_idx,
            median = ?median,
            min_degree = t,
            "split full child"
        );

        self.keys.insert(child_idx, median);
        self.children.insert(child_idx + 1, Box::new(sibling));
    }

    /// Deletes a key from the subtree rooted at this node in a single downward pass
    ///
    /// Every child descended into is first topped up to at least t keys, so removing a
    /// key from it can never leave it below t-1.
    pub(crate) fn delete(&mut self, key: &K, t: usize) -> Result<()> {
        // Find index of the key, or of the child the key belongs in
        let (found, idx) = self.search(key);

        if found {
            if self.leaf {
                // Case 1: key sits in a leaf that already has a spare key
                self.keys.remove(idx);
                return Ok(());
            }
            // Case 2: key sits in an internal node
            return self.delete_from_internal(idx, t);
        }

        if self.leaf {
            // Case 4: routed to a leaf that does not hold the key
            return Err(BTreeError::violation(
                Invariant::MissingKey,
                format!("key {:?} not present in the leaf it routes to", key),
            ));
        }

        // Case 3: key lives below this node; make sure the child has a key to spare first
        let was_last_child = idx == self.keys.len();
        if self.children[idx].keys.len() < t {
            self.fill_child(idx, t)?;
        }

        // Filling the last child merges it into its left sibling, so descend there instead
        if was_last_child && idx > self.keys.len() {
            self.children[idx - 1].delete(key, t)
        } else {
            self.children[idx].delete(key, t)
        }
    }

    /// Removes keys[idx] from an internal node
    fn delete_from_internal(&mut self, idx: usize, t: usize) -> Result<()> {
        if self.children[idx].keys.len() >= t {
            // Case 2a: left subtree can lose a key, so pull up the predecessor
            let pred = self.children[idx].rightmost()?.clone();
            // Delete predecessor below, then overwrite the key with it
            self.children[idx].delete(&pred, t)?;
            self.keys[idx] = pred;
        } else if self.children[idx + 1].keys.len() >= t {
            // Case 2b: right subtree can lose a key, so pull up the successor
            let succ = self.children[idx + 1].leftmost()?.clone();
            self.children[idx + 1].delete(&succ, t)?;
            self.keys[idx] = succ;
        } else {
            // Case 2c: both neighbours are minimal, fold the key down into a merged child
            let key = self.keys[idx].clone();
            self.merge(idx)?;
            self.children[idx].delete(&key, t)?;
        }
        Ok(())
    }

    /// Brings children[idx] up to at least t keys before descending into it
    fn fill_child(&mut self, idx: usize, t: usize) -> Result<()> {
        if idx != 0 && self.children[idx - 1].keys.len() >= t {
            // Case 3a: left sibling has a spare key -> rotate right
            self.borrow_from_prev(idx)
        } else if idx != self.keys.len() && self.children[idx + 1].keys.len() >= t {
            // Case 3b: right sibling has a spare key -> rotate left
            self.borrow_from_next(idx)
        } else if idx != self.keys.len() {
            // Case 3c: no spare keys, merge with the right sibling
            self.merge(idx)
        } else {
            // Case 3c: last child has no right sibling, merge with the left one
            self.merge(idx - 1)
        }
    }

    /// Rotates the left sibling's last key up into this node and the separator down into
    /// children[idx]; the sibling's last child moves along with it
    fn borrow_from_prev(&mut self, idx: usize) -> Result<()> {
        let (left, right) = self.children.split_at_mut(idx);
        let sibling = &mut left[idx - 1];
        let child = &mut right[0];

        // Sibling's last key replaces the separator, separator becomes child's first key
        let sibling_key = sibling.keys.pop().ok_or_else(|| {
            BTreeError::violation(Invariant::KeyCount, "left sibling has no key to lend")
        })?;
        let separator = std::mem::replace(&mut self.keys[idx - 1], sibling_key);
        child.keys.insert(0, separator);

        // Move sibling's last child over as child's first child
        if !child.leaf {
            let moved = sibling.children.pop().ok_or_else(|| {
                BTreeError::violation(Invariant::ChildCount, "left sibling has no child to lend")
            })?;
            child.children.insert(0, moved);
        }

        tracing::trace!(target: "b_tree::borrow", index = idx, side = "left", "borrowed key from sibling");
        Ok(())
    }

    /// Rotates the right sibling's first key up into this node and the separator down into
    /// children[idx]; the sibling's first child moves along with it
    fn borrow_from_next(&mut self, idx: usize) -> Result<()> {
        let (left, right) = self.children.split_at_mut(idx + 1);
        let child = &mut left[idx];
        let sibling = &mut right[0];

        if sibling.keys.is_empty() {
            return Err(BTreeError::violation(Invariant::KeyCount, "right sibling has no key to lend"));
        }
        let sibling_key = sibling.keys.remove(0);
        let separator = std::mem::replace(&mut self.keys[idx], sibling_key);
        child.keys.push(separator);

        if !child.leaf {
            if sibling.children.is_empty() {
                return Err(BTreeError::violation(
                    Invariant::ChildCount,
                    "right sibling has no child to lend",
                ));
            }
            child.children.push(sibling.children.remove(0));
        }

        tracing::trace!(target: "b_tree::borrow", index = idx, side = "right", "borrowed key from sibling");
        Ok(())
    }

    /// Merges children[idx + 1] and the separator keys[idx] into children[idx]
    pub(crate) fn merge(&mut self, idx: usize) -> Result<()> {
        if idx + 1 >= self.children.len() {
            return Err(BTreeError::violation(
                Invariant::ChildCount,
                format!("cannot merge child {} of a node with {} children", idx, self.children.len()),
            ));
        }

        // Remove the separator and take ownership of the right child
        let separator = self.keys.remove(idx);
        let right = self.children.remove(idx + 1);
        let Node { keys, children, .. } = *right;

        tracing::trace!(target: "b_tree::merge", index = idx, separator = ?separator, "merged siblings");

        let left = &mut self.children[idx];
        left.keys.push(separator);
        left.keys.extend(keys);
        left.children.extend(children);
        Ok(())
    }

    /// Largest key of the subtree (in-order predecessor source)
    fn rightmost(&self) -> Result<&K> {
        let mut node = self;
        while !node.leaf {
            node = node.children.last().ok_or_else(|| {
                BTreeError::violation(Invariant::ChildCount, "internal node without children")
            })?;
        }
        node.keys.last().ok_or_else(|| {
            BTreeError::violation(Invariant::KeyCount, "empty leaf below an internal node")
        })
    }

    /// Smallest key of the subtree (in-order successor source)
    fn leftmost(&self) -> Result<&K> {
        let mut node = self;
        while !node.leaf {
            node = node.children.first().ok_or_else(|| {
                BTreeError::violation(Invariant::ChildCount, "internal node without children")
            })?;
        }
        node.keys.first().ok_or_else(|| {
            BTreeError::violation(Invariant::KeyCount, "empty leaf below an internal node")
        })
    }

    /// Every key in the subtree, breadth-first (unordered across nodes)
    pub(crate) fn all_keys(&self) -> Vec<&K> {
        let mut keys = Vec::new();
        let mut queue = VecDeque::from([self]);
        while let Some(node) = queue.pop_front() {
            keys.extend(node.keys.iter());
            queue.extend(node.children.iter().map(|c| c.as_ref()));
        }
        keys
    }

    /// Appends the subtree's keys in ascending order
    pub(crate) fn traverse(&self, out: &mut Vec<K>) {
        for (i, key) in self.keys.iter().enumerate() {
            if !self.leaf {
                self.children[i].traverse(out);
            }
            out.push(key.clone());
        }
        if let Some(last) = self.children.get(self.keys.len()) {
            last.traverse(out);
        }
    }

    /// Appends this subtree's key lists to `levels`, one entry per depth
    pub(crate) fn collect_levels(&self, depth: usize, levels: &mut Vec<Vec<Vec<K>>>) {
        if levels.len() <= depth {
            levels.push(vec![]);
        }
        levels[depth].push(self.keys.clone());
        for child in &self.children {
            child.collect_levels(depth + 1, levels);
        }
    }
}

use std::fmt::{self, Debug};

use crate::config::BTreeConfig;
use crate::error::{BTreeError, Result};
use crate::node::Node;
use crate::verify::{self, Snapshot};

// https://en.wikipedia.org/wiki/B-tree
// Minimum degree t (CLRS): every node holds at most 2t-1 keys, every non-root node at
// least t-1. Insertion splits full nodes on the way down, deletion tops up minimal nodes
// on the way down, so both finish in a single pass from the root.

/// In-memory B-tree of minimum degree t over unique keys
pub struct BTree<K = i64> {
    root: Box<Node<K>>,
    config: BTreeConfig,
    len: usize,
}

impl<K: Ord + Clone + Debug> BTree<K> {
    /// Constructor method for BTree
    ///
    /// Takes the minimum degree t; fails with `InvalidOrder` when t < 2
    pub fn new(t: usize) -> Result<Self> {
        Self::with_config(BTreeConfig::default().with_min_degree(t))
    }

    pub fn with_config(config: BTreeConfig) -> Result<Self> {
        config.validate()?;
        Ok(BTree { root: Box::new(Node::new_leaf()), config, len: 0 })
    }

    pub fn min_degree(&self) -> usize {
        self.config.min_degree
    }

    pub fn config(&self) -> &BTreeConfig {
        &self.config
    }

    /// Number of keys stored
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn root(&self) -> &Node<K> {
        &self.root
    }

    /// Search method for BTree
    ///
    /// Returns the node holding the key and the key's index in it, or None
    pub fn search(&self, key: &K) -> Option<(&Node<K>, usize)> {
        let mut node: &Node<K> = &self.root;
        loop {
            let (found, idx) = node.search(key);
            if found {
                return Some((node, idx));
            }
            if node.leaf {
                return None;
            }
            node = &node.children[idx];
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.search(key).is_some()
    }

    /// Inserts a key into the b-tree
    ///
    /// Fails with `DuplicateKey`, leaving the tree untouched, if the key is already present
    pub fn insert(&mut self, key: K) -> Result<()> {
        if self.contains(&key) {
            tracing::debug!(key = ?key, "rejected duplicate insert");
            return Err(BTreeError::DuplicateKey { key: format!("{:?}", key) });
        }

        let before = self.snapshot();
        let t = self.config.min_degree;

        if self.root.keys.len() == self.config.max_keys() {
            // Root is full: grow a new root above it and split the old one
            let old_root = std::mem::replace(&mut self.root, Box::new(Node::new_internal()));
            self.root.children.push(old_root);
            self.root.split_child(0, t);
            tracing::trace!(target: "b_tree::root", height = before.height + 1, "root split, tree grew");
        }
        self.root.insert_non_full(key, t);
        self.len += 1;

        if self.config.verify.is_active() {
            self.verify()
                .and_then(|_| verify::check_insert_contract(&before, self.height(), t))
                .inspect_err(|e| tracing::error!(error = %e, "insert broke the tree"))?;
        }
        Ok(())
    }

    /// Deletes a key from the b-tree
    ///
    /// Fails with `KeyNotFound`, leaving the tree untouched, if the key is absent
    pub fn delete(&mut self, key: &K) -> Result<()> {
        if !self.contains(key) {
            tracing::debug!(key = ?key, "rejected delete of missing key");
            return Err(BTreeError::KeyNotFound { key: format!("{:?}", key) });
        }

        let before = self.snapshot();
        let t = self.config.min_degree;

        self.root.delete(key, t)?;
        self.len -= 1;

        // Shrink tree if the root was emptied by a merge but still has a child
        if self.root.keys.is_empty() && !self.root.leaf {
            let child = self.root.children.remove(0);
            self.root = child;
            tracing::trace!(target: "b_tree::root", height = before.height - 1, "root emptied, tree shrank");
        }

        if self.config.verify.is_active() {
            self.verify()
                .and_then(|_| verify::check_delete_contract(&before, self.height()))
                .inspect_err(|e| tracing::error!(error = %e, "delete broke the tree"))?;
        }
        Ok(())
    }

    /// Number of edges from the root to any leaf (0 for a single node, empty or not)
    pub fn height(&self) -> usize {
        let mut node: &Node<K> = &self.root;
        let mut height = 0;
        while let Some(child) = node.children.first() {
            node = child;
            height += 1;
        }
        height
    }

    /// Checks every structural and ordering invariant of the tree
    pub fn verify(&self) -> Result<()> {
        verify::verify_node(&self.root, self.config.min_degree)
    }

    /// All keys in ascending order
    pub fn traverse(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len);
        self.root.traverse(&mut keys);
        keys
    }

    /// Key lists of every node grouped by depth, left to right within a level
    pub fn levels(&self) -> Vec<Vec<Vec<K>>> {
        let mut levels = vec![];
        self.root.collect_levels(0, &mut levels);
        levels
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            height: self.height(),
            root_keys: self.root.keys.len(),
            root_is_leaf: self.root.leaf,
        }
    }
}

impl<K: Debug> fmt::Display for BTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.root.keys.is_empty() && self.root.leaf {
            return writeln!(f, "(empty tree, t={})", self.config.min_degree);
        }
        writeln!(f, "{:?}", self.root.keys)?;
        write_children(f, &self.root, "")
    }
}

fn write_children<K: Debug>(f: &mut fmt::Formatter<'_>, node: &Node<K>, prefix: &str) -> fmt::Result {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let is_last = i + 1 == count;
        let branch = if is_last { "└── " } else { "├── " };
        writeln!(f, "{}{}{:?}", prefix, branch, child.keys)?;

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        write_children(f, child, &child_prefix)?;
    }
    Ok(())
}

impl<K: Debug> Debug for BTree<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BTree")
            .field("min_degree", &self.config.min_degree)
            .field("len", &self.len)
            .field("root", &self.root)
            .finish()
    }
}

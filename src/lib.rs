//! In-memory B-tree index of minimum degree t.
//!
//! Keys are unique and ordered. Insertion splits full nodes on the way down, deletion
//! borrows from or merges with siblings on the way down, and the tree can check its own
//! shape and ordering invariants through [`BTree::verify`].

pub mod b_tree;
pub mod config;
pub mod error;
pub mod node;
mod verify;

pub use b_tree::BTree;
pub use config::{BTreeConfig, VerifyPolicy};
pub use error::{BTreeError, Invariant, Result};
pub use node::Node;

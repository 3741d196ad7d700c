use std::fmt;

/// Result type alias for b-tree operations.
pub type Result<T> = std::result::Result<T, BTreeError>;

/// Structural rule checked by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invariant {
    /// Keys inside a node are strictly increasing.
    KeysSorted,
    /// Key count lies in [t-1, 2t-1] (root: [1, 2t-1], or 0 for an empty leaf root).
    KeyCount,
    /// Internal nodes have keys + 1 children, within [t, 2t] (root: [2, 2t]); leaves have none.
    ChildCount,
    /// Every key of children[i] lies strictly between keys[i-1] and keys[i].
    Partition,
    /// All leaves sit at the same depth.
    LeafDepth,
    /// Height moved in a way the operation does not allow.
    HeightChange,
    /// A delete reached a leaf without finding a key that search had located.
    MissingKey,
}

impl fmt::Display for Invariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Invariant::KeysSorted => "keys sorted",
            Invariant::KeyCount => "key count",
            Invariant::ChildCount => "child count",
            Invariant::Partition => "partition",
            Invariant::LeafDepth => "leaf depth",
            Invariant::HeightChange => "height change",
            Invariant::MissingKey => "missing key",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by tree construction and mutation.
///
/// `DuplicateKey` and `KeyNotFound` are rejected before any mutation, so the
/// tree is unchanged when they are returned. `InvariantViolation` always
/// means an implementation defect and must not be ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BTreeError {
    /// Minimum degree below 2.
    InvalidOrder { min_degree: usize },
    /// Insert of a key that is already present.
    DuplicateKey { key: String },
    /// Delete of a key that is not present.
    KeyNotFound { key: String },
    /// The verifier found a broken rule.
    InvariantViolation { rule: Invariant, detail: String },
}

impl BTreeError {
    pub(crate) fn violation(rule: Invariant, detail: impl Into<String>) -> Self {
        BTreeError::InvariantViolation {
            rule,
            detail: detail.into(),
        }
    }

    /// Returns the broken rule if this is an invariant violation.
    pub fn invariant(&self) -> Option<Invariant> {
        match self {
            BTreeError::InvariantViolation { rule, .. } => Some(*rule),
            _ => None,
        }
    }
}

impl fmt::Display for BTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BTreeError::InvalidOrder { min_degree } => {
                write!(f, "b-tree minimum degree must be at least 2, got {}", min_degree)
            }
            BTreeError::DuplicateKey { key } => {
                write!(f, "duplicate key insertion attempted: {}", key)
            }
            BTreeError::KeyNotFound { key } => {
                write!(f, "deletion of non-existent key attempted: {}", key)
            }
            BTreeError::InvariantViolation { rule, detail } => {
                write!(f, "invariant violation ({}): {}", rule, detail)
            }
        }
    }
}

impl std::error::Error for BTreeError {}

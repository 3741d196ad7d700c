use crate::error::{BTreeError, Result};

/// Smallest minimum degree a B-tree can have (a 2-3-4 tree).
pub const MIN_DEGREE_FLOOR: usize = 2;

/// When `insert` and `delete` re-check the whole tree after mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyPolicy {
    /// Never verify automatically. `BTree::verify` can still be called.
    Never,
    /// Verify only when debug assertions are enabled.
    #[default]
    DebugOnly,
    /// Verify after every mutation, release builds included.
    Always,
}

impl VerifyPolicy {
    pub(crate) fn is_active(self) -> bool {
        match self {
            VerifyPolicy::Never => false,
            VerifyPolicy::DebugOnly => cfg!(debug_assertions),
            VerifyPolicy::Always => true,
        }
    }
}

/// B-tree configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BTreeConfig {
    /// Minimum degree t. Non-root nodes hold between t-1 and 2t-1 keys.
    pub min_degree: usize,
    /// Post-mutation verification policy.
    pub verify: VerifyPolicy,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            min_degree: MIN_DEGREE_FLOOR,
            verify: VerifyPolicy::default(),
        }
    }
}

impl BTreeConfig {
    pub fn with_min_degree(mut self, min_degree: usize) -> Self {
        self.min_degree = min_degree;
        self
    }

    pub fn with_verify(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }

    /// Rejects a minimum degree below 2, or one whose 2t node capacity overflows usize.
    pub fn validate(&self) -> Result<()> {
        if self.min_degree < MIN_DEGREE_FLOOR || self.min_degree.checked_mul(2).is_none() {
            return Err(BTreeError::InvalidOrder {
                min_degree: self.min_degree,
            });
        }
        Ok(())
    }

    /// Largest key count a node may hold (2t-1).
    pub fn max_keys(&self) -> usize {
        max_keys_for(self.min_degree)
    }
}

/// 2t-1; saturates for a minimum degree that would not pass `BTreeConfig::validate`
pub(crate) fn max_keys_for(t: usize) -> usize {
    t.saturating_mul(2).saturating_sub(1)
}

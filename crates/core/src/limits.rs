//! Engine limits
//!
//! Defaults mirror the emulated service: 5000 records per page when a query
//! does not declare a page size, and a bounded walk for hierarchy operators
//! so cyclic parent chains terminate.

use serde::{Deserialize, Serialize};

/// Page size used when a query does not declare one
pub const DEFAULT_PAGE_SIZE: usize = 5000;

/// Maximum parent-chain depth followed by hierarchy operators
pub const MAX_HIERARCHY_DEPTH: usize = 100;

/// Limits applied by the query engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    /// Page size when the query declares none (default: 5000)
    pub default_page_size: usize,

    /// Parent-chain depth bound for above/under operators (default: 100)
    pub max_hierarchy_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_hierarchy_depth: MAX_HIERARCHY_DEPTH,
        }
    }
}

impl Limits {
    /// Page size for a query that may or may not declare one.
    ///
    /// A declared size of zero falls back to the default.
    pub fn page_size(&self, declared: Option<usize>) -> usize {
        match declared {
            Some(n) if n > 0 => n,
            _ => self.default_page_size,
        }
    }
}

//! Common types used throughout the storage engine.

mod key;
mod page_id;

pub use key::{Comparator, FixedSizeKey, FixedSizeValue, NaturalOrder};
pub use page_id::PageId;

use serde::{Deserialize, Serialize};

/// Page size in bytes, fixed at compile time. Pages are the unit of I/O
/// exchanged with the buffer manager.
pub const PAGE_SIZE: usize = 4096;

/// `level` + `count`, the only bytes the node header claims.
pub const NODE_HEADER_SIZE: usize = 4;

/// Encoded width of a [`PageId`] as stored inline in an inner node.
pub const PAGE_ID_SIZE: usize = 8;

/// B-tree configuration: currently just the page size a tree was built
/// with, kept around for diagnostics and for `Db`'s serializable config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BTreeConfig {
    /// Page size in bytes this tree's buffer manager serves.
    pub page_size: usize,
}

impl Default for BTreeConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

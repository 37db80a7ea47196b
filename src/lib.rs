//! # btree-core
//!
//! A generic, disk-backed B+Tree index over a pluggable buffer manager.
//!
//! ## Architecture
//!
//! - **`types`** — fixed-size key/value encoding, the key comparator, and
//!   the overall page id (segment id + page-in-segment number).
//! - **`node`** — the byte-level layout of leaf and inner pages: sorted
//!   `K -> V` pairs in a leaf, sorted separator keys plus child page ids
//!   in an inner node.
//! - **`storage`** — disk I/O for one segment's backing file: the file
//!   header, page reads/writes, and a free list for reclaimed pages.
//! - **`buffer`** — the `BufferManager` trait the tree pins and unpins
//!   pages through, plus an in-memory implementation and an LRU-evicting
//!   disk-backed one.
//! - **`btree`** — the tree itself: descent, cascading splits on insert,
//!   cascading borrow/merge on erase, and an in-order cursor.
//!
//! Namespacing page ids under a segment, and persisting a tree's `root`
//! and `next_page_id` across restarts, is the job of whatever container
//! embeds this crate — not this crate itself. [`BTree::attach`] and
//! [`BTree::root_page`]/[`BTree::next_page_id`] are the seam: a caller
//! that owns that persistence recovers a tree with `attach` and saves
//! its state with the accessors after every mutation (or on a schedule).
//!
//! ## Example
//!
//! ```
//! use btree_core::{BTree, InMemoryBufferManager, NaturalOrder};
//!
//! let mut tree = BTree::<u64, u64, _, _>::new(0, InMemoryBufferManager::new(), NaturalOrder);
//! tree.insert(1, 100).unwrap();
//! tree.insert(2, 200).unwrap();
//! assert_eq!(tree.lookup(&1).unwrap(), Some(100));
//! assert!(tree.erase(&1).unwrap());
//! assert_eq!(tree.lookup(&1).unwrap(), None);
//! ```

pub mod btree;
pub mod buffer;
pub mod error;
pub mod node;
pub mod storage;
pub mod types;

pub use btree::{BTree, Cursor};
pub use buffer::{BufferManager, InMemoryBufferManager, PagedBufferManager};
pub use error::{Result, StorageError};
pub use storage::{DiskManager, DiskManagerImpl};
pub use types::{BTreeConfig, Comparator, FixedSizeKey, FixedSizeValue, NaturalOrder, PageId, PAGE_SIZE};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    /// Exercises the full stack together: a tree built over a disk-backed,
    /// LRU-evicting buffer manager with a cache much smaller than the
    /// working set, surviving eviction and a later reattachment.
    #[test]
    fn test_disk_backed_tree_survives_eviction_and_reattachment() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment0.db");

        let (root, next_page_id) = {
            let disk: Arc<dyn DiskManager> = Arc::new(DiskManagerImpl::open(&path, true).unwrap());
            let buffer = PagedBufferManager::new(disk, 4);
            let mut tree = BTree::<u64, u64, NaturalOrder, _>::new(0, buffer, NaturalOrder);

            for k in 0..300u64 {
                tree.insert(k, k * 2).unwrap();
            }
            for k in 0..150u64 {
                tree.erase(&k).unwrap();
            }

            for k in 150..300u64 {
                assert_eq!(tree.lookup(&k).unwrap(), Some(k * 2));
            }
            for k in 0..150u64 {
                assert_eq!(tree.lookup(&k).unwrap(), None);
            }

            (tree.root_page(), tree.next_page_id())
        };

        let disk: Arc<dyn DiskManager> = Arc::new(DiskManagerImpl::open(&path, true).unwrap());
        let buffer = PagedBufferManager::new(disk, 64);
        let mut tree: BTree<u64, u64, NaturalOrder, _> = BTree::attach(0, buffer, NaturalOrder, root, next_page_id);

        for k in 150..300u64 {
            assert_eq!(tree.lookup(&k).unwrap(), Some(k * 2));
        }
        tree.insert(1000, 1).unwrap();
        assert_eq!(tree.lookup(&1000).unwrap(), Some(1));
    }

    #[test]
    fn test_in_memory_tree_cursor_round_trip() {
        let mut tree = BTree::<u64, u64, NaturalOrder, _>::new(0, InMemoryBufferManager::new(), NaturalOrder);
        for k in (0..100u64).rev() {
            tree.insert(k, k + 1).unwrap();
        }

        let mut cursor = Cursor::first(&tree).unwrap();
        let mut count = 0u64;
        while cursor.is_valid() {
            let (k, v) = cursor.current().unwrap().unwrap();
            assert_eq!(k, count);
            assert_eq!(v, count + 1);
            count += 1;
            cursor.advance().unwrap();
        }
        assert_eq!(count, 100);
    }
}

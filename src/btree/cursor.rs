//! In-order cursor for range and full-table scans.
//!
//! The cursor holds no sibling pointers; it walks back up through the
//! recorded descent path and down the next child whenever a leaf is
//! exhausted, the same stack-based approach the tree itself uses for
//! insert and erase.

use crate::buffer::BufferManager;
use crate::error::Result;
use crate::node::{InnerNode, LeafNode, NodeHeader};
use crate::types::{Comparator, FixedSizeKey, FixedSizeValue, PageId};

use super::tree::BTree;

/// A cursor positioned somewhere in a tree's key order. `stack` always
/// has the current leaf at its top (with the index of the entry the
/// cursor is on); any entries below it are inner nodes paired with the
/// index of the child already descended into.
pub struct Cursor<'t, K, V, C, BM>
where
    K: FixedSizeKey,
    V: FixedSizeValue,
    C: Comparator<K>,
    BM: BufferManager,
{
    tree: &'t BTree<K, V, C, BM>,
    stack: Vec<(PageId, usize)>,
    valid: bool,
}

impl<'t, K, V, C, BM> Cursor<'t, K, V, C, BM>
where
    K: FixedSizeKey,
    V: FixedSizeValue,
    C: Comparator<K>,
    BM: BufferManager,
{
    /// Position at the first entry in key order.
    pub fn first(tree: &'t BTree<K, V, C, BM>) -> Result<Self> {
        let mut cursor = Self {
            tree,
            stack: Vec::new(),
            valid: false,
        };
        if let Some(root) = tree.root_page() {
            cursor.descend_leftmost(root)?;
            cursor.valid = cursor.current_leaf_has_entry()?;
        }
        Ok(cursor)
    }

    /// Position at the first entry with key `>= key`.
    pub fn seek(tree: &'t BTree<K, V, C, BM>, key: &K) -> Result<Self> {
        let mut cursor = Self {
            tree,
            stack: Vec::new(),
            valid: false,
        };
        let Some(root) = tree.root_page() else {
            return Ok(cursor);
        };

        let mut current = root;
        loop {
            let frame = cursor.tree.buffer().fix_page(current, false)?;
            let level = NodeHeader::level_of(&*frame.read());
            if level == 0 {
                let idx = LeafNode::<K, V>::lower_bound(&*frame.read(), key, cursor.tree_cmp());
                let count = LeafNode::<K, V>::count(&*frame.read());
                cursor.tree.buffer().unfix_page(frame, false)?;
                if idx < count {
                    cursor.stack.push((current, idx));
                    cursor.valid = true;
                } else {
                    cursor.valid = cursor.advance_up_and_over()?;
                }
                return Ok(cursor);
            }
            let (idx, child) = InnerNode::<K>::child_for(&*frame.read(), key, cursor.tree_cmp());
            cursor.tree.buffer().unfix_page(frame, false)?;
            cursor.stack.push((current, idx));
            current = child;
        }
    }

    fn tree_cmp(&self) -> &C {
        self.tree.cmp_ref()
    }

    fn descend_leftmost(&mut self, mut id: PageId) -> Result<()> {
        loop {
            let frame = self.tree.buffer().fix_page(id, false)?;
            let level = NodeHeader::level_of(&*frame.read());
            if level == 0 {
                self.tree.buffer().unfix_page(frame, false)?;
                self.stack.push((id, 0));
                return Ok(());
            }
            let child = InnerNode::<K>::child_at(&*frame.read(), 0);
            self.tree.buffer().unfix_page(frame, false)?;
            self.stack.push((id, 0));
            id = child;
        }
    }

    fn current_leaf_has_entry(&self) -> Result<bool> {
        let Some(&(leaf_id, idx)) = self.stack.last() else {
            return Ok(false);
        };
        let frame = self.tree.buffer().fix_page(leaf_id, false)?;
        let count = LeafNode::<K, V>::count(&*frame.read());
        self.tree.buffer().unfix_page(frame, false)?;
        Ok(idx < count)
    }

    /// Pop exhausted ancestors until one has an undescended child to the
    /// right, then descend leftmost from there. Returns whether a next
    /// entry was found.
    fn advance_up_and_over(&mut self) -> Result<bool> {
        while let Some((node_id, child_idx)) = self.stack.pop() {
            let frame = self.tree.buffer().fix_page(node_id, false)?;
            let count = InnerNode::<K>::count(&*frame.read());
            self.tree.buffer().unfix_page(frame, false)?;

            let next_idx = child_idx + 1;
            if next_idx <= count {
                let frame = self.tree.buffer().fix_page(node_id, false)?;
                let child = InnerNode::<K>::child_at(&*frame.read(), next_idx);
                self.tree.buffer().unfix_page(frame, false)?;
                self.stack.push((node_id, next_idx));
                self.descend_leftmost(child)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The entry the cursor is positioned at, or `None` if exhausted.
    pub fn current(&self) -> Result<Option<(K, V)>> {
        if !self.valid {
            return Ok(None);
        }
        let &(leaf_id, idx) = self.stack.last().expect("valid cursor has a leaf on the stack");
        let frame = self.tree.buffer().fix_page(leaf_id, false)?;
        let entry = {
            let buf = frame.read();
            (LeafNode::<K, V>::key_at(&buf, idx), LeafNode::<K, V>::value_at(&buf, idx))
        };
        self.tree.buffer().unfix_page(frame, false)?;
        Ok(Some(entry))
    }

    /// Advance to the next entry in key order. Returns `false` once the
    /// cursor runs off the end.
    pub fn advance(&mut self) -> Result<bool> {
        if !self.valid {
            return Ok(false);
        }
        let &(leaf_id, idx) = self.stack.last().expect("valid cursor has a leaf on the stack");
        let frame = self.tree.buffer().fix_page(leaf_id, false)?;
        let count = LeafNode::<K, V>::count(&*frame.read());
        self.tree.buffer().unfix_page(frame, false)?;

        let next_idx = idx + 1;
        if next_idx < count {
            self.stack.last_mut().unwrap().1 = next_idx;
            return Ok(true);
        }

        self.stack.pop();
        self.valid = self.advance_up_and_over()?;
        Ok(self.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::InMemoryBufferManager;
    use crate::types::NaturalOrder;

    fn new_tree() -> BTree<u64, u64, NaturalOrder, InMemoryBufferManager> {
        BTree::new(0, InMemoryBufferManager::new(), NaturalOrder)
    }

    #[test]
    fn test_cursor_over_empty_tree() {
        let tree = new_tree();
        let cursor = Cursor::first(&tree).unwrap();
        assert!(!cursor.is_valid());
    }

    #[test]
    fn test_cursor_full_scan_is_sorted() {
        let mut tree = new_tree();
        for k in [30u64, 10, 50, 20, 40] {
            tree.insert(k, k * 10).unwrap();
        }

        let mut cursor = Cursor::first(&tree).unwrap();
        let mut seen = Vec::new();
        while cursor.is_valid() {
            let (k, v) = cursor.current().unwrap().unwrap();
            seen.push((k, v));
            cursor.advance().unwrap();
        }
        assert_eq!(seen, vec![(10, 100), (20, 200), (30, 300), (40, 400), (50, 500)]);
    }

    #[test]
    fn test_cursor_full_scan_across_splits() {
        let mut tree = new_tree();
        for k in 0..500u64 {
            tree.insert(k, k).unwrap();
        }

        let mut cursor = Cursor::first(&tree).unwrap();
        let mut count = 0u64;
        let mut expected = 0u64;
        while cursor.is_valid() {
            let (k, v) = cursor.current().unwrap().unwrap();
            assert_eq!(k, expected);
            assert_eq!(v, expected);
            expected += 1;
            count += 1;
            cursor.advance().unwrap();
        }
        assert_eq!(count, 500);
    }

    #[test]
    fn test_cursor_seek_lands_on_first_key_at_or_above() {
        let mut tree = new_tree();
        for k in [10u64, 20, 30, 40] {
            tree.insert(k, k).unwrap();
        }

        let cursor = Cursor::seek(&tree, &25).unwrap();
        assert!(cursor.is_valid());
        assert_eq!(cursor.current().unwrap(), Some((30, 30)));

        let cursor = Cursor::seek(&tree, &100).unwrap();
        assert!(!cursor.is_valid());
    }
}

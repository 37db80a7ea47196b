//! Inner node layout and operations: sorted separator keys plus
//! `count + 1` child page ids.
//!
//! For every `i`, all keys reachable from `children[i]` are `< keys[i]`
//! and all keys reachable from `children[i+1]` are `>= keys[i]` — the
//! separator equals the smallest key in the right subtree.

use std::marker::PhantomData;

use crate::types::{Comparator, FixedSizeKey, NODE_HEADER_SIZE, PAGE_ID_SIZE, PAGE_SIZE};
use crate::PageId;

use super::header::NodeHeader;

/// Namespace for inner-page operations over separator key `K`. Never
/// instantiated; every method is an associated function over page bytes.
pub struct InnerNode<K>(PhantomData<K>);

impl<K: FixedSizeKey> InnerNode<K> {
    /// `InnerCapacity = floor((P - Header - sizeof(PageId)) / (sizeof(K) + sizeof(PageId)))`,
    /// reserving one `PageId` slot up front so `children` (which holds
    /// `capacity + 1` entries) always fits.
    pub fn capacity() -> usize {
        (PAGE_SIZE - NODE_HEADER_SIZE - PAGE_ID_SIZE) / (K::ENCODED_SIZE + PAGE_ID_SIZE)
    }

    fn keys_offset() -> usize {
        NODE_HEADER_SIZE
    }

    fn key_offset(i: usize) -> usize {
        Self::keys_offset() + i * K::ENCODED_SIZE
    }

    fn children_offset() -> usize {
        Self::keys_offset() + Self::capacity() * K::ENCODED_SIZE
    }

    fn child_offset(i: usize) -> usize {
        Self::children_offset() + i * PAGE_ID_SIZE
    }

    /// Initialize a fresh page as an empty inner node at the given level.
    pub fn init(buf: &mut [u8], level: u16) {
        debug_assert!(level > 0, "inner nodes have level > 0");
        NodeHeader { level, count: 0 }.write(buf);
    }

    /// Initialize a fresh root page with its sole (leftmost) child already
    /// in place, ready for the first separator to be `insert`ed.
    pub fn init_root(buf: &mut [u8], level: u16, left_child: PageId) {
        Self::init(buf, level);
        Self::set_child_at(buf, 0, left_child);
    }

    /// Overwrite the separator at `i` in place, without touching children.
    /// Used to rotate a new separator up after a borrow from a sibling.
    pub fn set_separator(buf: &mut [u8], i: usize, key: K) {
        Self::set_key_at(buf, i, key);
    }

    pub fn level(buf: &[u8]) -> u16 {
        NodeHeader::level_of(buf)
    }

    pub fn count(buf: &[u8]) -> usize {
        NodeHeader::count(buf) as usize
    }

    fn set_count(buf: &mut [u8], count: usize) {
        debug_assert!(count <= Self::capacity());
        NodeHeader::set_count(buf, count as u16);
    }

    pub fn key_at(buf: &[u8], i: usize) -> K {
        let off = Self::key_offset(i);
        K::decode(&buf[off..off + K::ENCODED_SIZE])
    }

    fn set_key_at(buf: &mut [u8], i: usize, key: K) {
        let off = Self::key_offset(i);
        key.encode(&mut buf[off..off + K::ENCODED_SIZE]);
    }

    pub fn child_at(buf: &[u8], i: usize) -> PageId {
        let off = Self::child_offset(i);
        let mut raw = [0u8; PAGE_ID_SIZE];
        raw.copy_from_slice(&buf[off..off + PAGE_ID_SIZE]);
        PageId::from_be_bytes(raw)
    }

    fn set_child_at(buf: &mut [u8], i: usize, child: PageId) {
        let off = Self::child_offset(i);
        buf[off..off + PAGE_ID_SIZE].copy_from_slice(&child.to_be_bytes());
    }

    /// Smallest index `i` such that `key < keys[i]`, or `count` if none.
    /// A key equal to a separator belongs to that separator's right
    /// subtree (see the module docs), so equality advances past it.
    pub fn lower_bound<C: Comparator<K>>(buf: &[u8], key: &K, cmp: &C) -> usize {
        let count = Self::count(buf);
        let (mut lo, mut hi) = (0usize, count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if !cmp.lt(key, &Self::key_at(buf, mid)) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    /// The child subtree where `key` must live, with the index it was
    /// found at (the caller needs the index to recover siblings later).
    /// A key equal to a separator lives in that separator's right
    /// subtree, per the separator contract.
    pub fn child_for<C: Comparator<K>>(buf: &[u8], key: &K, cmp: &C) -> (usize, PageId) {
        let i = Self::lower_bound(buf, key, cmp);
        (i, Self::child_at(buf, i))
    }

    /// Insert `separator` with its right child. The left child at the
    /// insertion point is the pre-existing subtree holding keys `< separator`.
    pub fn insert<C: Comparator<K>>(buf: &mut [u8], separator: K, right_child: PageId, cmp: &C) {
        let count = Self::count(buf);
        assert!(
            count < Self::capacity(),
            "capacity violation: inner insert into a full node"
        );
        let i = Self::lower_bound(buf, &separator, cmp);
        for j in (i..count).rev() {
            let k = Self::key_at(buf, j);
            Self::set_key_at(buf, j + 1, k);
        }
        for j in (i + 1..=count).rev() {
            let c = Self::child_at(buf, j);
            Self::set_child_at(buf, j + 1, c);
        }
        Self::set_key_at(buf, i, separator);
        Self::set_child_at(buf, i + 1, right_child);
        Self::set_count(buf, count + 1);
    }

    /// Split via the lift convention: `keys[m]` is removed from both
    /// halves and returned as the separator to install in the parent.
    pub fn split(buf: &mut [u8], dst: &mut [u8]) -> K {
        let count = Self::count(buf);
        assert!(count >= 2, "capacity violation: split requires count >= 2");
        let m = count / 2;
        let separator = Self::key_at(buf, m);

        Self::init(dst, Self::level(buf));
        for j in 0..(count - m - 1) {
            let k = Self::key_at(buf, m + 1 + j);
            Self::set_key_at(dst, j, k);
        }
        for j in 0..(count - m) {
            let c = Self::child_at(buf, m + 1 + j);
            Self::set_child_at(dst, j, c);
        }
        Self::set_count(dst, count - m - 1);
        Self::set_count(buf, m);
        separator
    }

    /// Remove `keys[i]` and `children[i+1]`, shifting the rest left.
    /// Used when a merge below removes a separator from this node.
    pub fn erase_separator(buf: &mut [u8], i: usize) {
        let count = Self::count(buf);
        for j in i..count - 1 {
            let k = Self::key_at(buf, j + 1);
            Self::set_key_at(buf, j, k);
        }
        for j in i + 1..count {
            let c = Self::child_at(buf, j + 1);
            Self::set_child_at(buf, j, c);
        }
        Self::set_count(buf, count - 1);
    }

    /// Rotate one entry from `left` through the parent separator into the
    /// front of `buf`. Returns the new separator to install in the parent.
    pub fn borrow_from_left(buf: &mut [u8], left: &mut [u8], parent_separator: K) -> K {
        let count = Self::count(buf);
        let left_count = Self::count(left);
        assert!(left_count > 0);

        for j in (0..count).rev() {
            let k = Self::key_at(buf, j);
            Self::set_key_at(buf, j + 1, k);
        }
        for j in (0..=count).rev() {
            let c = Self::child_at(buf, j);
            Self::set_child_at(buf, j + 1, c);
        }
        Self::set_key_at(buf, 0, parent_separator);
        Self::set_child_at(buf, 0, Self::child_at(left, left_count));

        let new_separator = Self::key_at(left, left_count - 1);
        Self::set_count(buf, count + 1);
        Self::set_count(left, left_count - 1);
        new_separator
    }

    /// Rotate one entry from `right` through the parent separator into the
    /// end of `buf`. Returns the new separator to install in the parent.
    pub fn borrow_from_right(buf: &mut [u8], right: &mut [u8], parent_separator: K) -> K {
        let count = Self::count(buf);
        let right_count = Self::count(right);
        assert!(right_count > 0);

        Self::set_key_at(buf, count, parent_separator);
        Self::set_child_at(buf, count + 1, Self::child_at(right, 0));

        let new_separator = Self::key_at(right, 0);
        for j in 0..right_count - 1 {
            let k = Self::key_at(right, j + 1);
            Self::set_key_at(right, j, k);
        }
        for j in 0..right_count {
            let c = Self::child_at(right, j + 1);
            Self::set_child_at(right, j, c);
        }
        Self::set_count(buf, count + 1);
        Self::set_count(right, right_count - 1);
        new_separator
    }

    /// Merge `right` into `buf`, pulling `parent_separator` down between them.
    pub fn merge_with(buf: &mut [u8], right: &[u8], parent_separator: K) {
        let count = Self::count(buf);
        let right_count = Self::count(right);
        assert!(
            count + 1 + right_count <= Self::capacity(),
            "capacity violation: inner merge would exceed capacity"
        );
        Self::set_key_at(buf, count, parent_separator);
        for j in 0..right_count {
            let k = Self::key_at(right, j);
            Self::set_key_at(buf, count + 1 + j, k);
        }
        for j in 0..=right_count {
            let c = Self::child_at(right, j);
            Self::set_child_at(buf, count + 1 + j, c);
        }
        Self::set_count(buf, count + 1 + right_count);
    }
}

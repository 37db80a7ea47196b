//! Leaf node layout and operations: sorted `K -> V` pairs in one page.
//!
//! A leaf page is laid out as `[header][keys...][values...]`, all fixed
//! width, so every operation here is plain index arithmetic over a
//! borrowed page byte slice — no node ever owns or outlives the page it
//! describes.

use std::marker::PhantomData;

use crate::types::{Comparator, FixedSizeKey, FixedSizeValue, NODE_HEADER_SIZE, PAGE_SIZE};

use super::header::NodeHeader;

/// Namespace for leaf-page operations over `K -> V`. Never instantiated;
/// every method is an associated function taking the page bytes directly.
pub struct LeafNode<K, V>(PhantomData<(K, V)>);

impl<K: FixedSizeKey, V: FixedSizeValue> LeafNode<K, V> {
    /// `LeafCapacity = floor((P - sizeof(Header)) / (sizeof(K) + sizeof(V)))`.
    pub fn capacity() -> usize {
        (PAGE_SIZE - NODE_HEADER_SIZE) / (K::ENCODED_SIZE + V::ENCODED_SIZE)
    }

    fn keys_offset() -> usize {
        NODE_HEADER_SIZE
    }

    fn key_offset(i: usize) -> usize {
        Self::keys_offset() + i * K::ENCODED_SIZE
    }

    fn values_offset() -> usize {
        Self::keys_offset() + Self::capacity() * K::ENCODED_SIZE
    }

    fn value_offset(i: usize) -> usize {
        Self::values_offset() + i * V::ENCODED_SIZE
    }

    /// Initialize a fresh page as an empty leaf (`level = 0`, `count = 0`).
    pub fn init(buf: &mut [u8]) {
        NodeHeader { level: 0, count: 0 }.write(buf);
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

    pub fn value_at(buf: &[u8], i: usize) -> V {
        let off = Self::value_offset(i);
        V::decode(&buf[off..off + V::ENCODED_SIZE])
    }

    fn set_value_at(buf: &mut [u8], i: usize, value: V) {
        let off = Self::value_offset(i);
        value.encode(&mut buf[off..off + V::ENCODED_SIZE]);
    }

    /// Smallest index `i` such that `keys[i] >= key`, or `count` if none.
    pub fn lower_bound<C: Comparator<K>>(buf: &[u8], key: &K, cmp: &C) -> usize {
        let count = Self::count(buf);
        let (mut lo, mut hi) = (0usize, count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if cmp.lt(&Self::key_at(buf, mid), key) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo
    }

    pub fn lookup<C: Comparator<K>>(buf: &[u8], key: &K, cmp: &C) -> Option<V> {
        let i = Self::lower_bound(buf, key, cmp);
        if i < Self::count(buf) && cmp.eq(&Self::key_at(buf, i), key) {
            Some(Self::value_at(buf, i))
        } else {
            None
        }
    }

    /// Insert `(key, value)`, overwriting the existing value if `key` is
    /// already present. Panics (capacity violation) if the node is full
    /// and the key is new — callers must split first.
    pub fn insert<C: Comparator<K>>(buf: &mut [u8], key: K, value: V, cmp: &C) {
        let count = Self::count(buf);
        let i = Self::lower_bound(buf, &key, cmp);
        if i < count && cmp.eq(&Self::key_at(buf, i), &key) {
            Self::set_value_at(buf, i, value);
            return;
        }
        assert!(
            count < Self::capacity(),
            "capacity violation: leaf insert into a full node"
        );
        for j in (i..count).rev() {
            let k = Self::key_at(buf, j);
            let v = Self::value_at(buf, j);
            Self::set_key_at(buf, j + 1, k);
            Self::set_value_at(buf, j + 1, v);
        }
        Self::set_key_at(buf, i, key);
        Self::set_value_at(buf, i, value);
        Self::set_count(buf, count + 1);
    }

    /// Remove `key`. No-op (returns `false`) if absent.
    pub fn erase<C: Comparator<K>>(buf: &mut [u8], key: &K, cmp: &C) -> bool {
        let count = Self::count(buf);
        let i = Self::lower_bound(buf, key, cmp);
        if i >= count || !cmp.eq(&Self::key_at(buf, i), key) {
            return false;
        }
        for j in i..count - 1 {
            let k = Self::key_at(buf, j + 1);
            let v = Self::value_at(buf, j + 1);
            Self::set_key_at(buf, j, k);
            Self::set_value_at(buf, j, v);
        }
        Self::set_count(buf, count - 1);
        true
    }

    /// Split `count >= 2` entries roughly in half, moving the upper half
    /// into `dst` (a freshly initialized leaf page). Returns the
    /// separator: `dst`'s first key.
    pub fn split(buf: &mut [u8], dst: &mut [u8]) -> K {
        let count = Self::count(buf);
        assert!(count >= 2, "capacity violation: split requires count >= 2");
        let m = count / 2;
        Self::init(dst);
        for j in 0..(count - m) {
            let k = Self::key_at(buf, m + j);
            let v = Self::value_at(buf, m + j);
            Self::set_key_at(dst, j, k);
            Self::set_value_at(dst, j, v);
        }
        Self::set_count(dst, count - m);
        Self::set_count(buf, m);
        Self::key_at(dst, 0)
    }

    /// Move the largest entry from `left` to the front of `buf`. Returns
    /// the new separator to install in the parent (`buf`'s new first key).
    pub fn borrow_from_left(buf: &mut [u8], left: &mut [u8]) -> K {
        let count = Self::count(buf);
        let left_count = Self::count(left);
        assert!(left_count > 0);
        for j in (0..count).rev() {
            let k = Self::key_at(buf, j);
            let v = Self::value_at(buf, j);
            Self::set_key_at(buf, j + 1, k);
            Self::set_value_at(buf, j + 1, v);
        }
        let k = Self::key_at(left, left_count - 1);
        let v = Self::value_at(left, left_count - 1);
        Self::set_key_at(buf, 0, k);
        Self::set_value_at(buf, 0, v);
        Self::set_count(buf, count + 1);
        Self::set_count(left, left_count - 1);
        k
    }

    /// Move the smallest entry from `right` to the end of `buf`. Returns
    /// the new separator to install in the parent (`right`'s new first key).
    pub fn borrow_from_right(buf: &mut [u8], right: &mut [u8]) -> K {
        let count = Self::count(buf);
        let right_count = Self::count(right);
        assert!(right_count > 0);
        let k = Self::key_at(right, 0);
        let v = Self::value_at(right, 0);
        Self::set_key_at(buf, count, k);
        Self::set_value_at(buf, count, v);
        for j in 0..right_count - 1 {
            let k2 = Self::key_at(right, j + 1);
            let v2 = Self::value_at(right, j + 1);
            Self::set_key_at(right, j, k2);
            Self::set_value_at(right, j, v2);
        }
        Self::set_count(buf, count + 1);
        Self::set_count(right, right_count - 1);
        Self::key_at(right, 0)
    }

    /// Append `right`'s contents onto `buf`.
    pub fn merge_with(buf: &mut [u8], right: &[u8]) {
        let count = Self::count(buf);
        let right_count = Self::count(right);
        assert!(
            count + right_count <= Self::capacity(),
            "capacity violation: leaf merge would exceed capacity"
        );
        for j in 0..right_count {
            let k = Self::key_at(right, j);
            let v = Self::value_at(right, j);
            Self::set_key_at(buf, count + j, k);
            Self::set_value_at(buf, count + j, v);
        }
        Self::set_count(buf, count + right_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NaturalOrder;

    type L = LeafNode<u64, u64>;

    fn new_page() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut buf = new_page();
        L::init(&mut buf);
        let cmp = NaturalOrder;
        L::insert(&mut buf, 5, 50, &cmp);
        L::insert(&mut buf, 1, 10, &cmp);
        L::insert(&mut buf, 3, 30, &cmp);
        assert_eq!(L::count(&buf), 3);
        assert_eq!(L::lookup(&buf, &1, &cmp), Some(10));
        assert_eq!(L::lookup(&buf, &3, &cmp), Some(30));
        assert_eq!(L::lookup(&buf, &5, &cmp), Some(50));
        assert_eq!(L::lookup(&buf, &4, &cmp), None);
        // keys stay sorted
        assert_eq!(L::key_at(&buf, 0), 1);
        assert_eq!(L::key_at(&buf, 1), 3);
        assert_eq!(L::key_at(&buf, 2), 5);
    }

    #[test]
    fn test_insert_overwrites() {
        let mut buf = new_page();
        L::init(&mut buf);
        let cmp = NaturalOrder;
        L::insert(&mut buf, 1, 10, &cmp);
        L::insert(&mut buf, 1, 20, &cmp);
        assert_eq!(L::count(&buf), 1);
        assert_eq!(L::lookup(&buf, &1, &cmp), Some(20));
    }

    #[test]
    fn test_erase() {
        let mut buf = new_page();
        L::init(&mut buf);
        let cmp = NaturalOrder;
        L::insert(&mut buf, 1, 10, &cmp);
        L::insert(&mut buf, 2, 20, &cmp);
        assert!(L::erase(&mut buf, &1, &cmp));
        assert_eq!(L::lookup(&mut buf, &1, &cmp), None);
        assert_eq!(L::lookup(&buf, &2, &cmp), Some(20));
        assert!(!L::erase(&mut buf, &1, &cmp));
    }

    #[test]
    fn test_split() {
        let mut buf = new_page();
        let mut dst = new_page();
        L::init(&mut buf);
        let cmp = NaturalOrder;
        for k in 0..10u64 {
            L::insert(&mut buf, k, k * 10, &cmp);
        }
        let sep = L::split(&mut buf, &mut dst);
        assert_eq!(L::count(&buf), 5);
        assert_eq!(L::count(&dst), 5);
        assert_eq!(sep, L::key_at(&dst, 0));
        assert_eq!(L::key_at(&buf, 4), 4);
        assert_eq!(L::key_at(&dst, 0), 5);
    }

    #[test]
    fn test_borrow_and_merge() {
        let cmp = NaturalOrder;
        let mut left = new_page();
        let mut right = new_page();
        L::init(&mut left);
        L::init(&mut right);
        for k in 0..5u64 {
            L::insert(&mut left, k, k, &cmp);
        }
        L::insert(&mut right, 100, 100, &cmp);

        let sep = L::borrow_from_left(&mut right, &mut left);
        assert_eq!(sep, 4);
        assert_eq!(L::count(&left), 4);
        assert_eq!(L::count(&right), 2);
        assert_eq!(L::key_at(&right, 0), 4);

        L::merge_with(&mut left, &right);
        assert_eq!(L::count(&left), 6);
        assert_eq!(L::key_at(&left, 5), 100);
    }
}

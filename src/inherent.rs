//! Core single-bitmap operations: construction, membership, range edits,
//! rank/select, and the scalar queries that don't need the cross-bitmap
//! merge machinery in `ops.rs` (spec.md §4.6 "directory", §4.7 core ops).

use std::ops::{Range, RangeBounds};

/// Inclusive upper bound on the value space, `2^32 - 1`.
const MAX_VALUE: u64 = u32::MAX as u64;

use crate::container::Container;
use crate::util;
use crate::RoaringBitmap;

impl RoaringBitmap {
    /// An empty bitmap.
    pub fn new() -> RoaringBitmap {
        RoaringBitmap { containers: Vec::new() }
    }

    /// Finds the directory slot for `key`, inserting an empty container if
    /// absent (spec.md §4.6 "insert_new_key_value_at").
    fn container_mut(&mut self, key: u16) -> &mut Container {
        match self.containers.binary_search_by_key(&key, |c| c.key) {
            Ok(loc) => &mut self.containers[loc],
            Err(loc) => {
                self.containers.insert(loc, Container::new(key));
                &mut self.containers[loc]
            }
        }
    }

    fn container(&self, key: u16) -> Option<&Container> {
        self.containers.binary_search_by_key(&key, |c| c.key).ok().map(|loc| &self.containers[loc])
    }

    pub fn insert(&mut self, value: u32) -> bool {
        let (key, index) = util::split(value);
        self.container_mut(key).insert(index)
    }

    /// Appends `value`, which must be strictly greater than every element
    /// already present. Skips the directory binary search the general
    /// `insert` path needs, matching the teacher's append-only fast path.
    pub fn push(&mut self, value: u32) -> bool {
        let (key, index) = util::split(value);
        match self.containers.last_mut() {
            Some(last) if last.key == key => {
                if last.max().map_or(true, |m| index > m) {
                    last.insert(index)
                } else {
                    false
                }
            }
            Some(last) if last.key > key => false,
            _ => {
                let mut container = Container::new(key);
                container.insert(index);
                self.containers.push(container);
                true
            }
        }
    }

    pub fn remove(&mut self, value: u32) -> bool {
        let (key, index) = util::split(value);
        match self.containers.binary_search_by_key(&key, |c| c.key) {
            Ok(loc) => {
                let removed = self.containers[loc].remove(index);
                if removed && self.containers[loc].is_empty() {
                    self.containers.remove(loc);
                }
                removed
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, value: u32) -> bool {
        let (key, index) = util::split(value);
        self.container(key).map_or(false, |c| c.contains(index))
    }

    /// `true` if every value in `range` is present.
    pub fn contains_range<R: RangeBounds<u64>>(&self, range: R) -> bool {
        let range = to_exclusive_range(range);
        if range.is_empty() {
            return true;
        }
        let (start_hi, start_lo) = util::split(range.start as u32);
        let (end_hi, end_lo_inclusive) = util::split((range.end - 1) as u32);
        if start_hi == end_hi {
            return self
                .container(start_hi)
                .map_or(false, |c| (u32::from(start_lo)..=u32::from(end_lo_inclusive)).all(|v| c.contains(v as u16)));
        }
        let first_ok = self.container(start_hi).map_or(false, |c| (u32::from(start_lo)..=0xFFFF).all(|v| c.contains(v as u16)));
        let last_ok = self.container(end_hi).map_or(false, |c| (0u32..=u32::from(end_lo_inclusive)).all(|v| c.contains(v as u16)));
        if !first_ok || !last_ok {
            return false;
        }
        for hi in (start_hi + 1)..end_hi {
            match self.container(hi) {
                Some(c) if c.is_full() => continue,
                _ => return false,
            }
        }
        true
    }

    /// Inserts every value in `range`, returning how many were newly added.
    /// `range.end` may be `2^32` to reach the top of the value space, which
    /// is why this takes `u64` bounds rather than `u32` (matches the
    /// teacher's `insert_range`).
    pub fn insert_range<R: RangeBounds<u64>>(&mut self, range: R) -> u64 {
        let range = to_exclusive_range(range);
        if range.is_empty() {
            return 0;
        }
        let (start_hi, start_lo) = util::split(range.start as u32);
        let (end_hi, end_lo) = util::split((range.end - 1) as u32);
        let mut added = 0;
        if start_hi == end_hi {
            added += self.container_mut(start_hi).insert_range(u32::from(start_lo)..u32::from(end_lo) + 1);
            return added;
        }
        added += self.container_mut(start_hi).insert_range(u32::from(start_lo)..0x1_0000);
        for hi in (start_hi + 1)..end_hi {
            added += self.container_mut(hi).insert_range(0..0x1_0000);
        }
        added += self.container_mut(end_hi).insert_range(0..u32::from(end_lo) + 1);
        added
    }

    pub fn remove_range<R: RangeBounds<u64>>(&mut self, range: R) -> u64 {
        let range = to_exclusive_range(range);
        if range.is_empty() {
            return 0;
        }
        let (start_hi, start_lo) = util::split(range.start as u32);
        let (end_hi, end_lo) = util::split((range.end - 1) as u32);
        let mut removed = 0;
        let mut to_delete = Vec::new();
        for (i, container) in self.containers.iter_mut().enumerate() {
            if container.key < start_hi || container.key > end_hi {
                continue;
            }
            let (lo, hi) = if container.key == start_hi && container.key == end_hi {
                (u32::from(start_lo), u32::from(end_lo) + 1)
            } else if container.key == start_hi {
                (u32::from(start_lo), 0x1_0000)
            } else if container.key == end_hi {
                (0, u32::from(end_lo) + 1)
            } else {
                (0, 0x1_0000)
            };
            removed += container.remove_range(lo..hi);
            if container.is_empty() {
                to_delete.push(i);
            }
        }
        for &i in to_delete.iter().rev() {
            self.containers.remove(i);
        }
        removed
    }

    /// Complements every value in `range` (spec.md "FLIP").
    pub fn flip<R: RangeBounds<u64>>(&mut self, range: R) {
        let range = to_exclusive_range(range);
        if range.is_empty() {
            return;
        }
        let (start_hi, start_lo) = util::split(range.start as u32);
        let (end_hi, end_lo) = util::split((range.end - 1) as u32);
        for hi in start_hi..=end_hi {
            let lo = if hi == start_hi { u32::from(start_lo) } else { 0 };
            let hi_bound = if hi == end_hi { u32::from(end_lo) + 1 } else { 0x1_0000 };
            self.container_mut(hi).complement_range(lo..hi_bound);
        }
        self.containers.retain_mut(|c| !c.is_empty());
    }

    pub fn clear(&mut self) {
        self.containers.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    pub fn len(&self) -> u64 {
        self.containers.iter().map(|c| c.store.len()).sum()
    }

    pub fn min(&self) -> Option<u32> {
        self.containers.first().and_then(|c| c.min().map(|lo| util::join(c.key, lo)))
    }

    pub fn max(&self) -> Option<u32> {
        self.containers.last().and_then(|c| c.max().map(|lo| util::join(c.key, lo)))
    }

    /// Number of elements `<= value` (spec.md "rank").
    pub fn rank(&self, value: u32) -> u64 {
        let (key, index) = util::split(value);
        let mut total = 0u64;
        for c in &self.containers {
            if c.key < key {
                total += c.store.len();
            } else if c.key == key {
                total += c.rank(index);
                break;
            } else {
                break;
            }
        }
        total
    }

    /// The `n`-th smallest element (0-indexed).
    pub fn select(&self, n: u64) -> Option<u32> {
        let mut remaining = n;
        for c in &self.containers {
            let len = c.store.len();
            if remaining < len {
                return c.select(remaining).map(|lo| util::join(c.key, lo));
            }
            remaining -= len;
        }
        None
    }

    /// `|self ∩ other|` without materializing the intersection.
    pub fn intersection_len(&self, other: &RoaringBitmap) -> u64 {
        crate::cmp::Pairs::new(&self.containers, &other.containers)
            .map(|pair| match pair {
                (Some(a), Some(b)) => a.intersection_len(b),
                _ => 0,
            })
            .sum()
    }

    /// The Jaccard similarity coefficient `|A∩B| / |A∪B|`, `1.0` when both
    /// bitmaps are empty.
    pub fn jaccard_index(&self, other: &RoaringBitmap) -> f64 {
        let inter = self.intersection_len(other) as f64;
        let union = self.len() as f64 + other.len() as f64 - inter;
        if union == 0.0 {
            1.0
        } else {
            inter / union
        }
    }

    /// Resolves any lazily-deferred cardinality and restores canonical form
    /// after a batch of lazy operations (spec.md §4.5/§9 "lazy / repair").
    pub fn repair_cardinality(&mut self) {
        for c in &mut self.containers {
            c.repair();
        }
    }

    /// Re-encodes every container with the representation that minimizes
    /// estimated wire size (spec.md "run-optimize").
    pub fn run_optimize(&mut self) {
        for c in &mut self.containers {
            c.run_optimize();
        }
    }
}

impl Default for RoaringBitmap {
    fn default() -> RoaringBitmap {
        RoaringBitmap::new()
    }
}

/// Normalizes any `RangeBounds<u64>` into a half-open `Range`, asserting
/// both ends fit within `[0, 2^32]` (matches the teacher's `insert_range`
/// assertion; spec.md §4.1/§8 "ranges touching 2^32").
fn to_exclusive_range<R: RangeBounds<u64>>(range: R) -> Range<u64> {
    use std::ops::Bound::*;
    let start = match range.start_bound() {
        Included(&v) => v,
        Excluded(&v) => v + 1,
        Unbounded => 0,
    };
    let end = match range.end_bound() {
        Included(&v) => v + 1,
        Excluded(&v) => v,
        Unbounded => MAX_VALUE + 1,
    };
    assert!(start <= MAX_VALUE + 1, "range start out of bitmap bounds");
    assert!(end <= MAX_VALUE + 1, "range end out of bitmap bounds");
    start..end.max(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_remove_contains() {
        let mut bm = RoaringBitmap::new();
        assert!(bm.insert(5));
        assert!(!bm.insert(5));
        assert!(bm.contains(5));
        assert!(bm.remove(5));
        assert!(!bm.contains(5));
        assert!(bm.is_empty());
    }

    #[test]
    fn insert_range_spans_containers() {
        let mut bm = RoaringBitmap::new();
        let added = bm.insert_range(65530..65540);
        assert_eq!(added, 10);
        assert_eq!(bm.len(), 10);
        for v in 65530..65540 {
            assert!(bm.contains(v));
        }
    }

    #[test]
    fn rank_select_agree() {
        let bm: RoaringBitmap = [1u32, 5, 100, 70000].iter().copied().collect();
        for (i, &v) in [1u32, 5, 100, 70000].iter().enumerate() {
            assert_eq!(bm.select(i as u64), Some(v));
            assert_eq!(bm.rank(v), i as u64 + 1);
        }
    }

    #[test]
    fn flip_is_its_own_inverse() {
        let mut bm: RoaringBitmap = [1u32, 2, 3].iter().copied().collect();
        let before = bm.clone();
        bm.flip(0..10);
        bm.flip(0..10);
        assert_eq!(bm, before);
    }

    #[test]
    fn min_max_empty() {
        let bm = RoaringBitmap::new();
        assert_eq!(bm.min(), None);
        assert_eq!(bm.max(), None);
    }
}

//! A single directory entry: a 16-bit high key paired with a [`Store`]
//! (spec.md §3 "directory entry", §4.4 "shared wrapper").
//!
//! The spec's manually-refcounted `Shared` wrapper is realized here as
//! `Rc<Store>`, unshared on write via `Rc::make_mut` (see DESIGN.md). Lazy
//! operations (spec.md §4.5) leave `len` as [`Cardinality::Unknown`] instead
//! of eagerly recomputing it; `Container::repair` restores an exact count.

use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::store::{Store, ARRAY_LIMIT};

/// Tracks whether a container's cardinality is known exactly or must be
/// recomputed. Lazy set operations (spec.md §4.5) produce `Unknown` rather
/// than an eagerly-wrong count; `repair` resolves it back to `Exact`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cardinality {
    Exact(u64),
    Unknown,
}

#[derive(Clone)]
pub struct Container {
    pub key: u16,
    len: Cardinality,
    pub store: Rc<Store>,
}

impl Container {
    pub fn new(key: u16) -> Container {
        Container { key, len: Cardinality::Exact(0), store: Rc::new(Store::new_array()) }
    }

    /// The container's exact cardinality, recomputing and caching it if a
    /// lazy operation left it unknown.
    pub fn len(&mut self) -> u64 {
        match self.len {
            Cardinality::Exact(n) => n,
            Cardinality::Unknown => {
                let n = self.store.len();
                self.len = Cardinality::Exact(n);
                n
            }
        }
    }

    /// Reads the cardinality without resolving `Unknown`, for callers that
    /// can tolerate (or are themselves producing) a lazy result.
    pub fn len_hint(&self) -> Cardinality {
        self.len
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    fn store_mut(&mut self) -> &mut Store {
        Rc::make_mut(&mut self.store)
    }

    pub fn insert(&mut self, index: u16) -> bool {
        let inserted = self.store_mut().insert(index);
        if inserted {
            self.bump_len(1);
        }
        inserted
    }

    pub fn remove(&mut self, index: u16) -> bool {
        let removed = self.store_mut().remove(index);
        if removed {
            self.bump_len(-1);
        }
        removed
    }

    pub fn contains(&self, index: u16) -> bool {
        self.store.contains(index)
    }

    pub fn is_full(&self) -> bool {
        self.store.is_full()
    }

    /// Replaces this container's store wholesale and marks its cardinality
    /// unknown, for deserialization paths that build a `Store` directly.
    pub(crate) fn replace_store(&mut self, store: Store) {
        self.store = Rc::new(store);
        self.len = Cardinality::Unknown;
    }

    pub fn min(&self) -> Option<u16> {
        self.store.min()
    }

    pub fn max(&self) -> Option<u16> {
        self.store.max()
    }

    pub fn rank(&self, index: u16) -> u64 {
        self.store.rank(index)
    }

    pub fn select(&self, n: u64) -> Option<u16> {
        self.store.select(n)
    }

    pub fn min_ge(&self, index: u16) -> Option<u16> {
        self.store.min_ge(index)
    }

    pub fn insert_range(&mut self, range: Range<u32>) -> u64 {
        let added = self.store_mut().insert_range(range);
        if added > 0 {
            self.bump_len(added as i64);
            self.ensure_correct_store();
        }
        added
    }

    pub fn remove_range(&mut self, range: Range<u32>) -> u64 {
        let removed = self.store_mut().remove_range(range);
        if removed > 0 {
            self.bump_len(-(removed as i64));
            self.ensure_correct_store();
        }
        removed
    }

    pub fn complement_range(&mut self, range: Range<u32>) {
        self.store_mut().complement_range(range);
        self.len = Cardinality::Unknown;
        self.len();
        self.ensure_correct_store();
    }

    pub fn union_with(&mut self, other: &Container) {
        self.store_mut().union_with(&other.store);
        self.len = Cardinality::Unknown;
        self.ensure_correct_store();
    }

    pub fn intersect_with(&mut self, other: &Container) {
        self.store_mut().intersect_with(&other.store);
        self.len = Cardinality::Unknown;
        self.ensure_correct_store();
    }

    pub fn difference_with(&mut self, other: &Container) {
        self.store_mut().difference_with(&other.store);
        self.len = Cardinality::Unknown;
        self.ensure_correct_store();
    }

    pub fn symmetric_difference_with(&mut self, other: &Container) {
        self.store_mut().symmetric_difference_with(&other.store);
        self.len = Cardinality::Unknown;
        self.ensure_correct_store();
    }

    /// Like [`union_with`](Self::union_with) but leaves the canonical-form
    /// invariant and cardinality unresolved (spec.md §4.5 "lazy"); callers
    /// must eventually call [`Container::repair`].
    pub fn lazy_union_with(&mut self, other: &Container) {
        self.store_mut().union_with(&other.store);
        self.len = Cardinality::Unknown;
    }

    pub fn lazy_symmetric_difference_with(&mut self, other: &Container) {
        self.store_mut().symmetric_difference_with(&other.store);
        self.len = Cardinality::Unknown;
    }

    /// `|self ∩ other|` without materializing the intersection or touching
    /// `self`'s own representation.
    pub fn intersection_len(&self, other: &Container) -> u64 {
        self.store.intersection_len(&other.store)
    }

    pub fn is_subset(&self, other: &Container) -> bool {
        self.store.is_subset(&other.store)
    }

    pub fn is_disjoint(&self, other: &Container) -> bool {
        self.store.is_disjoint(&other.store)
    }

    /// Restores the canonical-form invariant and an exact cardinality after
    /// one or more lazy operations (spec.md §4.5/§9 "lazy / repair",
    /// grounded on CRoaring's `roaring_bitmap_repair_after_lazy`).
    pub fn repair(&mut self) {
        self.len();
        self.ensure_correct_store();
    }

    /// Chooses the run/array/bitmap representation with the smallest
    /// estimated wire size (spec.md §4.5 "run-optimize").
    pub fn run_optimize(&mut self) {
        self.len();
        let optimized = self.store.run_optimize();
        self.store = Rc::new(optimized);
    }

    fn ensure_correct_store(&mut self) {
        let len = self.len();
        let should_be_array = len <= ARRAY_LIMIT;
        let is_array = matches!(&*self.store, Store::Array(_));
        let is_run = matches!(&*self.store, Store::Run(_));
        if is_run {
            // A run can still be the worse choice for its current contents
            // (e.g. after many small removals fragment it into many short
            // runs); fall back to array/bitmap when it no longer wins.
            let optimized = self.store.run_optimize();
            if !matches!(optimized, Store::Run(_)) {
                self.store = Rc::new(optimized);
            }
            return;
        }
        if should_be_array && !is_array {
            self.store = Rc::new(self.store.to_array());
        } else if !should_be_array && is_array {
            self.store = Rc::new(self.store.to_bitmap());
        }
    }

    fn bump_len(&mut self, delta: i64) {
        self.len = match self.len {
            Cardinality::Exact(n) => Cardinality::Exact((n as i64 + delta) as u64),
            Cardinality::Unknown => Cardinality::Unknown,
        };
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && *self.store == *other.store
    }
}

impl Eq for Container {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Container(key={}, store={})", self.key, self.store)
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = u32;
    type IntoIter = std::iter::Map<crate::store::Iter<'a>, Box<dyn FnMut(u16) -> u32 + 'a>>;
    fn into_iter(self) -> Self::IntoIter {
        let key = self.key;
        self.store.into_iter().map(Box::new(move |lo| crate::util::join(key, lo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_track_len() {
        let mut c = Container::new(0);
        assert!(c.insert(5));
        assert!(c.insert(10));
        assert!(!c.insert(5));
        assert_eq!(c.len(), 2);
        assert!(c.remove(5));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn converts_to_bitmap_past_array_limit() {
        let mut c = Container::new(0);
        for i in 0..=ARRAY_LIMIT as u16 {
            c.insert(i);
        }
        assert!(matches!(&*c.store, Store::Bitmap(_)));
    }

    #[test]
    fn lazy_union_defers_cardinality() {
        let mut a = Container::new(0);
        a.insert(1);
        let mut b = Container::new(0);
        b.insert(2);
        a.lazy_union_with(&b);
        assert_eq!(a.len_hint(), Cardinality::Unknown);
        a.repair();
        assert_eq!(a.len_hint(), Cardinality::Exact(2));
    }

    #[test]
    fn cow_does_not_mutate_shared_store() {
        let mut a = Container::new(0);
        a.insert(1);
        let shared = Rc::clone(&a.store);
        a.insert(2);
        assert_eq!(shared.len(), 1);
        assert_eq!(a.store.len(), 2);
    }
}

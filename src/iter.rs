//! Ascending iteration over a bitmap's values, plus the sorted bulk-insert
//! entry points (`from_sorted_iter`/`append`) that skip per-value directory
//! lookups when the caller already guarantees order.

use std::slice;

use crate::container::Container;
use crate::error::NonSortedIntegers;
use crate::RoaringBitmap;

/// A lazy iterator over a [`RoaringBitmap`]'s values in ascending order.
pub struct Iter<'a> {
    inner: std::iter::FlatMap<slice::Iter<'a, Container>, <&'a Container as IntoIterator>::IntoIter, fn(&'a Container) -> <&'a Container as IntoIterator>::IntoIter>,
    size_hint: u64,
}

/// An owning iterator over a [`RoaringBitmap`]'s values in ascending order.
pub struct IntoIter {
    inner: std::iter::FlatMap<std::vec::IntoIter<Container>, <Container as IntoIterator>::IntoIter, fn(Container) -> <Container as IntoIterator>::IntoIter>,
    size_hint: u64,
}

impl RoaringBitmap {
    pub fn iter(&self) -> Iter<'_> {
        fn f(c: &Container) -> <&Container as IntoIterator>::IntoIter {
            c.into_iter()
        }
        Iter { inner: self.containers.iter().flat_map(f as fn(&Container) -> _), size_hint: self.len() }
    }

    /// Builds a bitmap from values already known to be sorted and
    /// deduplicated, without the per-value directory lookup `insert` does.
    pub fn from_sorted_iter<I: IntoIterator<Item = u32>>(iter: I) -> Result<RoaringBitmap, NonSortedIntegers> {
        let mut bm = RoaringBitmap::new();
        bm.append(iter).map(|_| bm)
    }

    /// Appends values already known to be sorted and strictly increasing
    /// relative to the bitmap's current contents, returning the count
    /// successfully appended, or an error naming the first out-of-order
    /// value if `iter` is not actually sorted.
    pub fn append<I: IntoIterator<Item = u32>>(&mut self, iter: I) -> Result<u64, NonSortedIntegers> {
        let mut count = 0u64;
        for value in iter {
            if self.push(value) {
                count += 1;
            } else {
                return Err(NonSortedIntegers::new(count));
            }
        }
        Ok(count)
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl IntoIterator for RoaringBitmap {
    type Item = u32;
    type IntoIter = IntoIter;
    fn into_iter(self) -> IntoIter {
        fn f(c: Container) -> <Container as IntoIterator>::IntoIter {
            c.into_iter()
        }
        let size_hint = self.len();
        IntoIter { inner: self.containers.into_iter().flat_map(f as fn(Container) -> _), size_hint }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u32;
    fn next(&mut self) -> Option<u32> {
        let next = self.inner.next();
        if next.is_some() {
            self.size_hint = self.size_hint.saturating_sub(1);
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size_hint.min(usize::MAX as u64) as usize, None)
    }
}

impl Iterator for IntoIter {
    type Item = u32;
    fn next(&mut self) -> Option<u32> {
        let next = self.inner.next();
        if next.is_some() {
            self.size_hint = self.size_hint.saturating_sub(1);
        }
        next
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.size_hint.min(usize::MAX as u64) as usize, None)
    }
}

impl FromIterator<u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> RoaringBitmap {
        let mut bm = RoaringBitmap::new();
        bm.extend(iter);
        bm
    }
}

impl Extend<u32> for RoaringBitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_ascending_order() {
        let bm: RoaringBitmap = [5u32, 1, 100000, 3].iter().copied().collect();
        let values: Vec<u32> = bm.iter().collect();
        assert_eq!(values, vec![1, 3, 5, 100000]);
    }

    #[test]
    fn from_sorted_iter_accepts_sorted_input() {
        let bm = RoaringBitmap::from_sorted_iter(vec![1u32, 2, 3]).unwrap();
        assert_eq!(bm.len(), 3);
    }

    #[test]
    fn append_rejects_out_of_order() {
        let mut bm = RoaringBitmap::new();
        let err = bm.append(vec![3u32, 1]).unwrap_err();
        assert_eq!(err.valid_until(), 1);
    }

    #[test]
    fn owned_into_iter_matches_borrowed() {
        let bm: RoaringBitmap = [1u32, 2, 3].iter().copied().collect();
        let borrowed: Vec<u32> = (&bm).into_iter().collect();
        let owned: Vec<u32> = bm.into_iter().collect();
        assert_eq!(borrowed, owned);
    }
}

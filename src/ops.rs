//! Cross-bitmap set algebra: in-place AND/OR/XOR/ANDNOT, their lazy and
//! cardinality-only variants, and the `BitOr`/`BitAnd`/`Sub`/`BitXor`
//! operator impls (spec.md §4.5 "mixed dispatch", §4.7).

use std::cmp::Ordering::{Equal, Greater, Less};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::container::Container;
use crate::RoaringBitmap;

impl RoaringBitmap {
    pub fn union_with(&mut self, other: &RoaringBitmap) {
        self.containers = merge(std::mem::take(&mut self.containers), &other.containers, Container::union_with);
    }

    pub fn intersect_with(&mut self, other: &RoaringBitmap) {
        self.containers.retain_mut(|c| match other.containers.binary_search_by_key(&c.key, |o| o.key) {
            Ok(loc) => {
                c.intersect_with(&other.containers[loc]);
                !c.is_empty()
            }
            Err(_) => false,
        });
    }

    pub fn difference_with(&mut self, other: &RoaringBitmap) {
        self.containers.retain_mut(|c| {
            if let Ok(loc) = other.containers.binary_search_by_key(&c.key, |o| o.key) {
                c.difference_with(&other.containers[loc]);
            }
            !c.is_empty()
        });
    }

    pub fn symmetric_difference_with(&mut self, other: &RoaringBitmap) {
        self.containers = merge(std::mem::take(&mut self.containers), &other.containers, Container::symmetric_difference_with);
    }

    /// Like [`union_with`](Self::union_with), but leaves affected containers'
    /// cardinality and canonical form unresolved until
    /// [`RoaringBitmap::repair_cardinality`] is called (spec.md §4.5 "lazy").
    pub fn lazy_union_with(&mut self, other: &RoaringBitmap) {
        self.containers = merge(std::mem::take(&mut self.containers), &other.containers, Container::lazy_union_with);
    }

    pub fn lazy_symmetric_difference_with(&mut self, other: &RoaringBitmap) {
        self.containers = merge(std::mem::take(&mut self.containers), &other.containers, Container::lazy_symmetric_difference_with);
    }

    /// `|self ∪ other|` without materializing the union.
    pub fn union_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.len() + other.len() - self.intersection_len(other)
    }

    /// `|self ∩ other|` without materializing the intersection. Alias of
    /// [`RoaringBitmap::intersection_len`] kept for symmetry with the other
    /// `_cardinality` operations.
    pub fn intersection_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.intersection_len(other)
    }

    /// `|self - other|` without materializing the difference.
    pub fn difference_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.len() - self.intersection_len(other)
    }

    /// `|self ^ other|` without materializing the symmetric difference.
    pub fn symmetric_difference_cardinality(&self, other: &RoaringBitmap) -> u64 {
        self.len() + other.len() - 2 * self.intersection_len(other)
    }

    /// Unions many bitmaps lazily, then repairs once at the end, grounded on
    /// CRoaring's `roaring_bitmap_or_many`/`lazy_or_array`.
    pub fn union_many<'a, I: IntoIterator<Item = &'a RoaringBitmap>>(bitmaps: I) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for bm in bitmaps {
            out.lazy_union_with(bm);
        }
        out.repair_cardinality();
        out
    }

    /// Symmetric-differences many bitmaps lazily, then repairs once.
    pub fn symmetric_difference_many<'a, I: IntoIterator<Item = &'a RoaringBitmap>>(bitmaps: I) -> RoaringBitmap {
        let mut out = RoaringBitmap::new();
        for bm in bitmaps {
            out.lazy_symmetric_difference_with(bm);
        }
        out.repair_cardinality();
        out
    }
}

/// Two-pointer merge of two sorted container lists (spec.md §4.6
/// "directory"). Keys present on only one side are copied through
/// unchanged — correct for both OR (the other side contributes nothing) and
/// XOR (same reasoning, since a container is never stored empty). Keys
/// present on both sides get `op` applied and are dropped if the result is
/// empty (possible for XOR, never for OR).
fn merge(left: Vec<Container>, right: &[Container], op: fn(&mut Container, &Container)) -> Vec<Container> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut a = left.into_iter().peekable();
    let mut b = right.iter().peekable();
    loop {
        match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => match x.key.cmp(&y.key) {
                Less => merged.push(a.next().unwrap()),
                Greater => merged.push(b.next().unwrap().clone()),
                Equal => {
                    let mut x = a.next().unwrap();
                    let y = b.next().unwrap();
                    op(&mut x, y);
                    if !x.is_empty() {
                        merged.push(x);
                    }
                }
            },
            (Some(_), None) => merged.push(a.next().unwrap()),
            (None, Some(_)) => merged.push(b.next().unwrap().clone()),
            (None, None) => break,
        }
    }
    merged
}

impl BitOrAssign<&RoaringBitmap> for RoaringBitmap {
    fn bitor_assign(&mut self, rhs: &RoaringBitmap) {
        self.union_with(rhs);
    }
}

impl BitOrAssign<RoaringBitmap> for RoaringBitmap {
    fn bitor_assign(&mut self, rhs: RoaringBitmap) {
        self.union_with(&rhs);
    }
}

impl BitOr<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;
    fn bitor(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let mut out = self.clone();
        out.union_with(rhs);
        out
    }
}

impl BitOr<RoaringBitmap> for RoaringBitmap {
    type Output = RoaringBitmap;
    fn bitor(mut self, rhs: RoaringBitmap) -> RoaringBitmap {
        self.union_with(&rhs);
        self
    }
}

impl BitAndAssign<&RoaringBitmap> for RoaringBitmap {
    fn bitand_assign(&mut self, rhs: &RoaringBitmap) {
        self.intersect_with(rhs);
    }
}

impl BitAnd<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;
    fn bitand(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let mut out = self.clone();
        out.intersect_with(rhs);
        out
    }
}

impl BitAnd<RoaringBitmap> for RoaringBitmap {
    type Output = RoaringBitmap;
    fn bitand(mut self, rhs: RoaringBitmap) -> RoaringBitmap {
        self.intersect_with(&rhs);
        self
    }
}

impl SubAssign<&RoaringBitmap> for RoaringBitmap {
    fn sub_assign(&mut self, rhs: &RoaringBitmap) {
        self.difference_with(rhs);
    }
}

impl Sub<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;
    fn sub(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let mut out = self.clone();
        out.difference_with(rhs);
        out
    }
}

impl Sub<RoaringBitmap> for RoaringBitmap {
    type Output = RoaringBitmap;
    fn sub(mut self, rhs: RoaringBitmap) -> RoaringBitmap {
        self.difference_with(&rhs);
        self
    }
}

impl BitXorAssign<&RoaringBitmap> for RoaringBitmap {
    fn bitxor_assign(&mut self, rhs: &RoaringBitmap) {
        self.symmetric_difference_with(rhs);
    }
}

impl BitXor<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;
    fn bitxor(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let mut out = self.clone();
        out.symmetric_difference_with(rhs);
        out
    }
}

impl BitXor<RoaringBitmap> for RoaringBitmap {
    type Output = RoaringBitmap;
    fn bitxor(mut self, rhs: RoaringBitmap) -> RoaringBitmap {
        self.symmetric_difference_with(&rhs);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_intersect_difference_symmetric() {
        let a: RoaringBitmap = (0..10).collect();
        let b: RoaringBitmap = (5..15).collect();

        assert_eq!((&a | &b).len(), 15);
        assert_eq!((&a & &b).len(), 5);
        assert_eq!((&a - &b).len(), 5);
        assert_eq!((&a ^ &b).len(), 10);
    }

    #[test]
    fn cardinality_matches_materialized_ops() {
        let a: RoaringBitmap = (0..1000).step_by(3).collect();
        let b: RoaringBitmap = (0..1000).step_by(5).collect();
        assert_eq!(a.union_cardinality(&b), (&a | &b).len());
        assert_eq!(a.intersection_cardinality(&b), (&a & &b).len());
        assert_eq!(a.difference_cardinality(&b), (&a - &b).len());
        assert_eq!(a.symmetric_difference_cardinality(&b), (&a ^ &b).len());
    }

    #[test]
    fn union_many_matches_repeated_union() {
        let a: RoaringBitmap = (0..10).collect();
        let b: RoaringBitmap = (5..15).collect();
        let c: RoaringBitmap = (100..110).collect();
        let combined = RoaringBitmap::union_many([&a, &b, &c]);
        let mut expected = a.clone();
        expected.union_with(&b);
        expected.union_with(&c);
        assert_eq!(combined, expected);
    }
}

//! Set-relation queries (`is_subset`/`is_superset`/`is_disjoint`) and the
//! [`Pairs`] merge-walk helper shared by the mixed-dispatch operations in
//! `ops.rs` (spec.md §4.6 "directory", §4.7 "is_subset/is_disjoint").

use crate::container::Container;
use crate::RoaringBitmap;

impl RoaringBitmap {
    /// `true` if `self` and `other` have no elements in common.
    pub fn is_disjoint(&self, other: &RoaringBitmap) -> bool {
        Pairs::new(&self.containers, &other.containers).all(|pair| match pair {
            (Some(a), Some(b)) => a.is_disjoint(b),
            _ => true,
        })
    }

    /// `true` if every element of `self` is also in `other`.
    pub fn is_subset(&self, other: &RoaringBitmap) -> bool {
        Pairs::new(&self.containers, &other.containers).all(|pair| match pair {
            (Some(_), None) => false,
            (Some(a), Some(b)) => a.is_subset(b),
            (None, _) => true,
        })
    }

    /// `true` if `self` is a subset of `other` and the two are not equal.
    pub fn is_strict_subset(&self, other: &RoaringBitmap) -> bool {
        self.is_subset(other) && self.len() != other.len()
    }

    /// `true` if every element of `other` is also in `self`.
    pub fn is_superset(&self, other: &RoaringBitmap) -> bool {
        other.is_subset(self)
    }
}

/// Walks two container slices sorted by key in lock-step, yielding `(Some,
/// Some)` for matching keys and `(Some, None)`/`(None, Some)` for keys
/// present on only one side. Mirrors the teacher's `cmp::Pairs`.
pub struct Pairs<'a> {
    a: std::iter::Peekable<std::slice::Iter<'a, Container>>,
    b: std::iter::Peekable<std::slice::Iter<'a, Container>>,
}

impl<'a> Pairs<'a> {
    pub fn new(a: &'a [Container], b: &'a [Container]) -> Pairs<'a> {
        Pairs { a: a.iter().peekable(), b: b.iter().peekable() }
    }
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (Option<&'a Container>, Option<&'a Container>);

    fn next(&mut self) -> Option<Self::Item> {
        let which = match (self.a.peek(), self.b.peek()) {
            (Some(c1), Some(c2)) => Some(c1.key.cmp(&c2.key)),
            (Some(_), None) => Some(std::cmp::Ordering::Less),
            (None, Some(_)) => Some(std::cmp::Ordering::Greater),
            (None, None) => None,
        };
        match which {
            Some(std::cmp::Ordering::Less) => Some((self.a.next(), None)),
            Some(std::cmp::Ordering::Greater) => Some((None, self.b.next())),
            Some(std::cmp::Ordering::Equal) => Some((self.a.next(), self.b.next())),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RoaringBitmap;

    #[test]
    fn subset_superset_disjoint() {
        let a: RoaringBitmap = (1..5).collect();
        let b: RoaringBitmap = (1..10).collect();
        assert!(a.is_subset(&b));
        assert!(a.is_strict_subset(&b));
        assert!(b.is_superset(&a));
        assert!(!a.is_disjoint(&b));

        let c: RoaringBitmap = (100..200).collect();
        assert!(a.is_disjoint(&c));
        assert!(!a.is_subset(&c));
    }
}

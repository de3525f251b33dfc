//! A compressed bitset over `u32` using the Roaring bitmap compression
//! scheme: values are split into a 16-bit high key and a 16-bit low value,
//! the high keys index a sorted directory of containers, and each
//! container stores its low values as a sorted array, a fixed bitset, or a
//! run list, whichever is smallest for its contents.
//!
//! ```
//! use rbitset::RoaringBitmap;
//!
//! let mut rb = RoaringBitmap::new();
//! rb.insert(1);
//! rb.insert(100);
//! rb.insert_range(1000..2000);
//! assert_eq!(rb.len(), 1002);
//! assert!(rb.contains(1500));
//! ```
//!
//! `RoaringBitmap` is single-threaded by construction: each container's
//! store is held behind an `Rc`, shared cheaply on clone and unshared
//! on write via `Rc::make_mut`. That `Rc` makes the type `!Send`/`!Sync`,
//! which is the correct way to express "concurrent mutation of a shared
//! instance is not supported" in Rust — the compiler rejects it rather than
//! relying on callers to avoid it.

mod cmp;
mod container;
mod error;
mod fmt;
#[cfg(feature = "std")]
mod frozen;
mod inherent;
mod iter;
mod ops;
#[cfg(feature = "std")]
mod serialization;
mod store;
mod util;

pub use error::{FrozenViewError, NonSortedIntegers};
#[cfg(feature = "std")]
pub use frozen::FrozenBitmap;
pub use iter::{IntoIter, Iter};

use container::Container;

/// A compressed bitset over `u32`, implemented as a sorted directory of
/// 16-bit-keyed containers (array, bitset, or run) over the low 16 bits of
/// each value.
#[derive(Clone, PartialEq, Eq)]
pub struct RoaringBitmap {
    containers: Vec<Container>,
}

#[cfg(feature = "serde")]
mod serde_impl {
    use serde::de::{Deserialize, Deserializer};
    use serde::ser::{Serialize, Serializer};

    use super::RoaringBitmap;

    impl Serialize for RoaringBitmap {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut buf = Vec::with_capacity(self.serialized_size() as usize);
            self.serialize_into(&mut buf).map_err(serde::ser::Error::custom)?;
            serializer.serialize_bytes(&buf)
        }
    }

    impl<'de> Deserialize<'de> for RoaringBitmap {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let bytes: Vec<u8> = Vec::deserialize(deserializer)?;
            RoaringBitmap::deserialize_from(&mut &bytes[..]).map_err(serde::de::Error::custom)
        }
    }

    #[cfg(test)]
    mod test {
        use proptest::prelude::*;

        use super::RoaringBitmap;

        proptest! {
            #[test]
            fn test_serde_json(values in prop::collection::vec(0u32..200_000, 0..300)) {
                let bitmap: RoaringBitmap = values.into_iter().collect();
                let json = serde_json::to_vec(&bitmap).unwrap();
                prop_assert_eq!(bitmap, serde_json::from_slice(&json).unwrap());
            }

            #[test]
            fn test_bincode(values in prop::collection::vec(0u32..200_000, 0..300)) {
                let bitmap: RoaringBitmap = values.into_iter().collect();
                let buffer = bincode::serialize(&bitmap).unwrap();
                prop_assert_eq!(bitmap, bincode::deserialize(&buffer).unwrap());
            }
        }
    }
}

#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::RoaringBitmap;

    fn bitmap_from(values: Vec<u32>) -> RoaringBitmap {
        values.into_iter().collect()
    }

    proptest! {
        #[test]
        fn union_is_commutative(a in prop::collection::vec(0u32..5000, 0..200), b in prop::collection::vec(0u32..5000, 0..200)) {
            let a = bitmap_from(a);
            let b = bitmap_from(b);
            prop_assert_eq!(&a | &b, &b | &a);
        }

        #[test]
        fn intersection_is_commutative(a in prop::collection::vec(0u32..5000, 0..200), b in prop::collection::vec(0u32..5000, 0..200)) {
            let a = bitmap_from(a);
            let b = bitmap_from(b);
            prop_assert_eq!(&a & &b, &b & &a);
        }

        #[test]
        fn union_is_associative(
            a in prop::collection::vec(0u32..5000, 0..100),
            b in prop::collection::vec(0u32..5000, 0..100),
            c in prop::collection::vec(0u32..5000, 0..100),
        ) {
            let a = bitmap_from(a);
            let b = bitmap_from(b);
            let c = bitmap_from(c);
            prop_assert_eq!((&a | &b) | &c, &a | (&b | &c));
        }

        #[test]
        fn union_and_intersection_cardinalities(a in prop::collection::vec(0u32..5000, 0..200), b in prop::collection::vec(0u32..5000, 0..200)) {
            let a = bitmap_from(a);
            let b = bitmap_from(b);
            let union = (&a | &b).len();
            let inter = (&a & &b).len();
            prop_assert_eq!(union + inter, a.len() + b.len());
        }

        #[test]
        fn symmetric_difference_cardinality(a in prop::collection::vec(0u32..5000, 0..200), b in prop::collection::vec(0u32..5000, 0..200)) {
            let a = bitmap_from(a);
            let b = bitmap_from(b);
            let xor = (&a ^ &b).len();
            let inter = (&a & &b).len();
            prop_assert_eq!(xor, a.len() + b.len() - 2 * inter);
        }

        #[test]
        fn flip_is_its_own_inverse(values in prop::collection::vec(0u32..1000, 0..100)) {
            let mut a = bitmap_from(values);
            let before = a.clone();
            a.flip(0..1000);
            a.flip(0..1000);
            prop_assert_eq!(a, before);
        }

        #[test]
        fn is_subset_iff_union_equals_superset(a in prop::collection::vec(0u32..5000, 0..100), extra in prop::collection::vec(0u32..5000, 0..100)) {
            let a = bitmap_from(a);
            let mut b = a.clone();
            b.extend(extra);
            prop_assert!(a.is_subset(&b));
            prop_assert_eq!(&a | &b, b.clone());
            prop_assert_eq!(&a - &b, RoaringBitmap::new());
        }

        #[test]
        fn rank_select_round_trip(values in prop::collection::vec(0u32..100_000, 1..300)) {
            let bm = bitmap_from(values);
            for (i, v) in bm.iter().enumerate() {
                prop_assert_eq!(bm.select(i as u64), Some(v));
                prop_assert_eq!(bm.rank(v), i as u64 + 1);
            }
        }

        #[test]
        fn serialization_round_trips(values in prop::collection::vec(0u32..100_000, 0..300)) {
            let bm = bitmap_from(values);
            let mut buf = Vec::new();
            bm.serialize_into(&mut buf).unwrap();
            let back = RoaringBitmap::deserialize_from(&mut &buf[..]).unwrap();
            prop_assert_eq!(bm, back);
        }
    }
}

//! The three container variants (spec §3, §4.1-4.3): [`Store::Array`], a
//! sorted unique `u16` array; [`Store::Bitmap`], a fixed 1024-word bit array;
//! and [`Store::Run`], a sorted list of disjoint, non-adjacent [`Interval`]s.
//!
//! Mixed Array/Run and Bitmap/Run operations in this module bridge through a
//! temporary bitmap materialization of the `Run` operand rather than
//! implementing bespoke merge algorithms for every pairing (see DESIGN.md);
//! `Array`/`Bitmap` and `Run`/`Run` operations are direct merges, matching
//! the teacher's two-pointer style in `union_with`/`intersect_with`.

use std::cmp::Ordering::{Equal, Greater, Less};
use std::ops::Range;
use std::{fmt, slice, vec};

use self::Store::{Array, Bitmap, Run};
use crate::util;

pub const BITMAP_LENGTH: usize = 1024;
pub const ARRAY_LIMIT: u64 = 4096;

/// A single run `[start, end]`, both inclusive. Corresponds to spec.md's
/// `{value, length}` pair with `length = end - start`.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Interval {
    pub start: u16,
    pub end: u16,
}

impl Interval {
    #[inline]
    pub fn new(start: u16, end: u16) -> Interval {
        debug_assert!(start <= end);
        Interval { start, end }
    }

    #[inline]
    pub fn run_len(&self) -> u64 {
        u64::from(self.end) - u64::from(self.start) + 1
    }
}

#[derive(Clone, Debug)]
pub enum Store {
    Array(Vec<u16>),
    Bitmap(Box<[u64; BITMAP_LENGTH]>),
    Run(Vec<Interval>),
}

pub enum Iter<'a> {
    Array(slice::Iter<'a, u16>),
    Vec(vec::IntoIter<u16>),
    BitmapBorrowed { words: &'a [u64; BITMAP_LENGTH], word: usize, bits: u64 },
    BitmapOwned { words: Box<[u64; BITMAP_LENGTH]>, word: usize, bits: u64 },
    Run(RunIter),
}

pub struct RunIter {
    intervals: Vec<Interval>,
    run: usize,
    offset: u32,
}

impl Store {
    pub fn new_array() -> Store {
        Array(Vec::new())
    }

    pub fn insert(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.binary_search(&index).map_err(|loc| vec.insert(loc, index)).is_err(),
            Bitmap(bits) => {
                let (w, b) = (util::word_index(index), util::bit_index(index));
                let mask = 1u64 << b;
                if bits[w] & mask == 0 {
                    bits[w] |= mask;
                    true
                } else {
                    false
                }
            }
            Run(runs) => insert_run(runs, index),
        }
    }

    pub fn remove(&mut self, index: u16) -> bool {
        match self {
            Array(vec) => vec.binary_search(&index).map(|loc| vec.remove(loc)).is_ok(),
            Bitmap(bits) => {
                let (w, b) = (util::word_index(index), util::bit_index(index));
                let mask = 1u64 << b;
                if bits[w] & mask != 0 {
                    bits[w] &= !mask;
                    true
                } else {
                    false
                }
            }
            Run(runs) => remove_run(runs, index),
        }
    }

    pub fn contains(&self, index: u16) -> bool {
        match self {
            Array(vec) => vec.binary_search(&index).is_ok(),
            Bitmap(bits) => bits[util::word_index(index)] & (1u64 << util::bit_index(index)) != 0,
            Run(runs) => find_run(runs, index).is_ok(),
        }
    }

    pub fn len(&self) -> u64 {
        match self {
            Array(vec) => vec.len() as u64,
            Bitmap(bits) => bits.iter().map(|w| u64::from(w.count_ones())).sum(),
            Run(runs) => runs.iter().map(Interval::run_len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> Iter<'_> {
        self.into_iter()
    }

    pub fn is_full(&self) -> bool {
        match self {
            Run(runs) => runs.len() == 1 && runs[0].start == 0 && runs[0].end == u16::MAX,
            _ => self.len() == u64::from(u16::MAX) + 1,
        }
    }

    pub fn min(&self) -> Option<u16> {
        match self {
            Array(vec) => vec.first().copied(),
            Bitmap(bits) => {
                bits.iter().enumerate().find(|&(_, &w)| w != 0).map(|(i, &w)| (i * 64 + w.trailing_zeros() as usize) as u16)
            }
            Run(runs) => runs.first().map(|iv| iv.start),
        }
    }

    pub fn max(&self) -> Option<u16> {
        match self {
            Array(vec) => vec.last().copied(),
            Bitmap(bits) => bits
                .iter()
                .enumerate()
                .rev()
                .find(|&(_, &w)| w != 0)
                .map(|(i, &w)| (i * 64 + 63 - w.leading_zeros() as usize) as u16),
            Run(runs) => runs.last().map(|iv| iv.end),
        }
    }

    /// Number of elements `<= index` (spec.md "rank").
    pub fn rank(&self, index: u16) -> u64 {
        match self {
            Array(vec) => (vec.partition_point(|&v| v <= index)) as u64,
            Bitmap(bits) => {
                let w = util::word_index(index);
                let b = util::bit_index(index);
                let mut total: u64 = bits[..w].iter().map(|word| u64::from(word.count_ones())).sum();
                total += u64::from((bits[w] & util::range_mask(0, b + 1)).count_ones());
                total
            }
            Run(runs) => runs
                .iter()
                .map(|iv| {
                    if iv.end <= index {
                        iv.run_len()
                    } else if iv.start <= index {
                        u64::from(index) - u64::from(iv.start) + 1
                    } else {
                        0
                    }
                })
                .sum(),
        }
    }

    /// The `n`-th smallest element (0-indexed), spec.md "select".
    pub fn select(&self, n: u64) -> Option<u16> {
        match self {
            Array(vec) => vec.get(n as usize).copied(),
            Bitmap(bits) => {
                let mut remaining = n;
                for (i, &word) in bits.iter().enumerate() {
                    let count = u64::from(word.count_ones());
                    if remaining < count {
                        let mut w = word;
                        for _ in 0..remaining {
                            w &= w - 1;
                        }
                        return Some((i * 64 + w.trailing_zeros() as usize) as u16);
                    }
                    remaining -= count;
                }
                None
            }
            Run(runs) => {
                let mut remaining = n;
                for iv in runs {
                    let len = iv.run_len();
                    if remaining < len {
                        return Some(iv.start + remaining as u16);
                    }
                    remaining -= len;
                }
                None
            }
        }
    }

    /// The smallest element `>= index`, used by iterator `advance_to` and
    /// directory `advance_until` (spec.md §4.6).
    pub fn min_ge(&self, index: u16) -> Option<u16> {
        match self {
            Array(vec) => {
                let loc = vec.partition_point(|&v| v < index);
                vec.get(loc).copied()
            }
            Bitmap(bits) => {
                let w0 = util::word_index(index);
                let b0 = util::bit_index(index);
                if w0 >= BITMAP_LENGTH {
                    return None;
                }
                let masked = bits[w0] & util::range_mask(b0, 64);
                if masked != 0 {
                    return Some((w0 * 64 + masked.trailing_zeros() as usize) as u16);
                }
                bits[w0 + 1..].iter().enumerate().find(|&(_, &w)| w != 0).map(|(i, &w)| ((w0 + 1 + i) * 64 + w.trailing_zeros() as usize) as u16)
            }
            Run(runs) => {
                let loc = runs.partition_point(|iv| iv.end < index);
                runs.get(loc).map(|iv| iv.start.max(index))
            }
        }
    }

    pub fn insert_range(&mut self, range: Range<u32>) -> u64 {
        if range.is_empty() {
            return 0;
        }
        match self {
            Array(vec) => {
                let start = range.start as u16;
                let end_incl = (range.end - 1) as u16;
                let a = vec.partition_point(|&v| v < start);
                let b = vec.partition_point(|&v| v <= end_incl);
                let existing = (b - a) as u64;
                let total = range.end as u64 - range.start as u64;
                let fresh: Vec<u16> = (start..=end_incl).filter(|v| vec[a..b].binary_search(v).is_err()).collect();
                vec.splice(a..b, merge_sorted(&vec[a..b], &fresh));
                total - existing
            }
            Bitmap(bits) => {
                let start = range.start as u16;
                let end_incl = (range.end - 1) as u16;
                let before = bitmap_rank(bits, end_incl) - if start == 0 { 0 } else { bitmap_rank(bits, start - 1) };
                set_bitmap_range(bits, start, end_incl, true);
                (range.end as u64 - range.start as u64) - before
            }
            Run(runs) => {
                let start = range.start as u16;
                let end_incl = (range.end - 1) as u16;
                let before: u64 = runs
                    .iter()
                    .map(|iv| overlap_len(iv.start, iv.end, start, end_incl))
                    .sum();
                let lo = runs.partition_point(|iv| (iv.end as u32) + 1 < start as u32);
                let hi = runs.partition_point(|iv| (iv.start as u32) <= end_incl as u32 + 1);
                let new_start = if lo < hi { start.min(runs[lo].start) } else { start };
                let new_end = if lo < hi { end_incl.max(runs[hi - 1].end) } else { end_incl };
                runs.splice(lo..hi, std::iter::once(Interval::new(new_start, new_end)));
                (range.end as u64 - range.start as u64) - before
            }
        }
    }

    pub fn remove_range(&mut self, range: Range<u32>) -> u64 {
        if range.is_empty() {
            return 0;
        }
        match self {
            Array(vec) => {
                let a = vec.partition_point(|&v| (v as u32) < range.start);
                let b = if range.end > u32::from(u16::MAX) { vec.len() } else { vec.partition_point(|&v| (v as u32) < range.end) };
                let removed = (b - a) as u64;
                vec.drain(a..b);
                removed
            }
            Bitmap(bits) => {
                let start = range.start as u16;
                let end_incl = (range.end - 1) as u16;
                let removed = bitmap_rank(bits, end_incl) - if start == 0 { 0 } else { bitmap_rank(bits, start - 1) };
                set_bitmap_range(bits, start, end_incl, false);
                removed
            }
            Run(runs) => {
                let start = range.start as u16;
                let end_incl = (range.end - 1) as u16;
                let mut removed = 0u64;
                let mut new_runs = Vec::with_capacity(runs.len() + 1);
                for iv in runs.iter() {
                    let ov = overlap_len(iv.start, iv.end, start, end_incl);
                    if ov == 0 {
                        new_runs.push(iv.clone());
                        continue;
                    }
                    removed += ov;
                    if iv.start < start {
                        new_runs.push(Interval::new(iv.start, start - 1));
                    }
                    if iv.end > end_incl {
                        new_runs.push(Interval::new(end_incl + 1, iv.end));
                    }
                }
                *runs = new_runs;
                removed
            }
        }
    }

    /// Complements (flips) the bits in `[range.start, range.end)`, spec.md
    /// "complement-range" / `FLIP`.
    pub fn complement_range(&mut self, range: Range<u32>) {
        if range.is_empty() {
            return;
        }
        let start = range.start as u16;
        let end_incl = (range.end - 1) as u16;
        match self {
            Array(vec) => {
                let a = vec.partition_point(|&v| (v as u32) < range.start);
                let b = vec.partition_point(|&v| (v as u32) < range.end);
                let mut complement = Vec::new();
                let mut cursor = start;
                for &v in &vec[a..b] {
                    if v > cursor {
                        complement.extend(cursor..v);
                    }
                    cursor = v.saturating_add(1);
                    if v == u16::MAX {
                        break;
                    }
                }
                if cursor <= end_incl {
                    complement.extend(cursor..=end_incl);
                }
                vec.splice(a..b, complement);
            }
            Bitmap(bits) => {
                let w0 = util::word_index(start);
                let w1 = util::word_index(end_incl);
                if w0 == w1 {
                    bits[w0] ^= util::range_mask(util::bit_index(start), util::bit_index(end_incl) + 1);
                } else {
                    bits[w0] ^= util::range_mask(util::bit_index(start), 64);
                    for w in &mut bits[w0 + 1..w1] {
                        *w = !*w;
                    }
                    bits[w1] ^= util::range_mask(0, util::bit_index(end_incl) + 1);
                }
            }
            Run(runs) => {
                let mut kept = Vec::new();
                let mut covered = Vec::new();
                for iv in runs.iter() {
                    if (iv.end as u32) < range.start || (iv.start as u32) >= range.end {
                        kept.push(iv.clone());
                    } else {
                        if iv.start < start {
                            kept.push(Interval::new(iv.start, start - 1));
                        }
                        if iv.end > end_incl {
                            kept.push(Interval::new(end_incl + 1, iv.end));
                        }
                        covered.push(Interval::new(iv.start.max(start), iv.end.min(end_incl)));
                    }
                }
                let mut cursor = start;
                for iv in &covered {
                    if iv.start > cursor {
                        kept.push(Interval::new(cursor, iv.start - 1));
                    }
                    cursor = iv.end.saturating_add(1);
                    if iv.end == u16::MAX {
                        break;
                    }
                }
                if cursor <= end_incl {
                    kept.push(Interval::new(cursor, end_incl));
                }
                kept.sort_by_key(|iv| iv.start);
                *runs = kept;
            }
        }
    }

    pub fn to_array(&self) -> Store {
        match self {
            Array(_) => self.clone(),
            Bitmap(bits) => {
                let mut vec = Vec::with_capacity(self.len() as usize);
                for (w, &word) in bits.iter().enumerate() {
                    let mut word = word;
                    while word != 0 {
                        let b = word.trailing_zeros() as usize;
                        vec.push((w * 64 + b) as u16);
                        word &= word - 1;
                    }
                }
                Array(vec)
            }
            Run(runs) => {
                let mut vec = Vec::with_capacity(self.len() as usize);
                for iv in runs {
                    vec.extend(iv.start..=iv.end);
                }
                Array(vec)
            }
        }
    }

    pub fn to_bitmap(&self) -> Store {
        match self {
            Array(vec) => {
                let mut bits = Box::new([0u64; BITMAP_LENGTH]);
                for &v in vec {
                    bits[util::word_index(v)] |= 1u64 << util::bit_index(v);
                }
                Bitmap(bits)
            }
            Bitmap(_) => self.clone(),
            Run(runs) => {
                let mut bits = Box::new([0u64; BITMAP_LENGTH]);
                for iv in runs {
                    set_bitmap_range(&mut bits, iv.start, iv.end, true);
                }
                Bitmap(bits)
            }
        }
    }

    pub fn to_run(&self) -> Store {
        match self {
            Run(_) => self.clone(),
            Array(vec) => {
                if vec.is_empty() {
                    return Run(Vec::new());
                }
                let mut runs = Vec::new();
                let mut start = vec[0];
                let mut prev = vec[0];
                for &v in &vec[1..] {
                    if v > prev + 1 {
                        runs.push(Interval::new(start, prev));
                        start = v;
                    }
                    prev = v;
                }
                runs.push(Interval::new(start, prev));
                Run(runs)
            }
            Bitmap(bits) => {
                // Work over a scratch copy so each run found can be cleared out,
                // letting the scan always look for the next lowest set bit.
                let mut words: [u64; BITMAP_LENGTH] = **bits;
                let mut runs = Vec::new();
                let mut i = 0usize;
                while i < BITMAP_LENGTH {
                    if words[i] == 0 {
                        i += 1;
                        continue;
                    }
                    let start = (i * 64 + words[i].trailing_zeros() as usize) as u16;
                    // Pad bits below the run's start with 1s so the complement's
                    // trailing zeros locate the first bit after the run ends.
                    let mut cur_word = words[i] | (words[i] - 1);
                    let mut cur_i = i;
                    let end = loop {
                        if cur_word == u64::MAX {
                            if cur_i + 1 == BITMAP_LENGTH {
                                break u16::MAX;
                            }
                            cur_i += 1;
                            cur_word = words[cur_i];
                            continue;
                        }
                        break (cur_i * 64 + (!cur_word).trailing_zeros() as usize) as u16 - 1;
                    };
                    runs.push(Interval::new(start, end));
                    set_bitmap_range(&mut words, start, end, false);
                }
                Run(runs)
            }
        }
    }

    /// Estimated in-memory wire size of this store under each representation,
    /// used to pick the canonical form (spec.md §4.5 "run-optimize").
    pub fn run_optimize(&self) -> Store {
        let card = self.len();
        let run = if let Run(_) = self { self.clone() } else { self.to_run() };
        let n_runs = match &run {
            Run(runs) => runs.len() as u64,
            _ => unreachable!(),
        };
        let run_bytes = 2 + 4 * n_runs;
        let array_bytes = 2 * card;
        let bitmap_bytes = 2 + 8 * BITMAP_LENGTH as u64;

        if run_bytes <= array_bytes && run_bytes <= bitmap_bytes {
            run
        } else if card <= ARRAY_LIMIT {
            if let Array(_) = self {
                self.clone()
            } else {
                self.to_array()
            }
        } else if let Bitmap(_) = self {
            self.clone()
        } else {
            self.to_bitmap()
        }
    }

    pub fn union_with(&mut self, other: &Store) {
        match (&mut *self, other) {
            (Array(vec1), Array(vec2)) => {
                let merged = merge_sorted(vec1, vec2);
                *vec1 = merged;
            }
            (this @ Array(_), Bitmap(_)) => {
                let mut bitmap = this.to_bitmap();
                bitmap.union_with(other);
                *this = bitmap;
            }
            (this @ Array(_), Run(_)) => {
                let other_bitmap = other.to_bitmap();
                let mut bitmap = this.to_bitmap();
                bitmap.union_with(&other_bitmap);
                *this = bitmap;
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                for (a, &b) in bits1.iter_mut().zip(bits2.iter()) {
                    *a |= b;
                }
            }
            (this @ Bitmap(_), Array(vec2)) => {
                if let Bitmap(bits) = this {
                    for &v in vec2 {
                        bits[util::word_index(v)] |= 1u64 << util::bit_index(v);
                    }
                }
            }
            (this @ Bitmap(_), Run(_)) => {
                let other_bitmap = other.to_bitmap();
                this.union_with(&other_bitmap);
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = run_union(runs1, runs2);
            }
            (this @ Run(_), other) => {
                let mut bitmap = this.to_bitmap();
                bitmap.union_with(other);
                *this = bitmap;
            }
        }
    }

    pub fn intersect_with(&mut self, other: &Store) {
        match (&mut *self, other) {
            (Array(vec1), Array(vec2)) => {
                vec1.retain(|v| vec2.binary_search(v).is_ok());
            }
            (Array(vec1), store) => {
                vec1.retain(|&v| store.contains(v));
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                for (a, &b) in bits1.iter_mut().zip(bits2.iter()) {
                    *a &= b;
                }
            }
            (this @ Bitmap(_), Array(vec2)) => {
                let mut result = Vec::new();
                if let Bitmap(bits) = this {
                    for &v in vec2 {
                        if bits[util::word_index(v)] & (1u64 << util::bit_index(v)) != 0 {
                            result.push(v);
                        }
                    }
                }
                *this = Array(result);
            }
            (this @ Bitmap(_), Run(_)) => {
                let other_bitmap = other.to_bitmap();
                this.intersect_with(&other_bitmap);
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = run_intersect(runs1, runs2);
            }
            (this @ Run(_), other) => {
                let this_bitmap = this.to_bitmap();
                let mut tmp = this_bitmap;
                tmp.intersect_with(other);
                *this = tmp;
            }
        }
    }

    pub fn difference_with(&mut self, other: &Store) {
        match (&mut *self, other) {
            (Array(vec1), Array(vec2)) => {
                vec1.retain(|v| vec2.binary_search(v).is_err());
            }
            (Array(vec1), store) => {
                vec1.retain(|&v| !store.contains(v));
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                for (a, &b) in bits1.iter_mut().zip(bits2.iter()) {
                    *a &= !b;
                }
            }
            (this @ Bitmap(_), Array(vec2)) => {
                if let Bitmap(bits) = this {
                    for &v in vec2 {
                        bits[util::word_index(v)] &= !(1u64 << util::bit_index(v));
                    }
                }
            }
            (this @ Bitmap(_), Run(_)) => {
                let other_bitmap = other.to_bitmap();
                this.difference_with(&other_bitmap);
            }
            (Run(runs1), Run(runs2)) => {
                *runs1 = run_difference(runs1, runs2);
            }
            (this @ Run(_), other) => {
                let mut bitmap = this.to_bitmap();
                bitmap.difference_with(other);
                *this = bitmap;
            }
        }
    }

    pub fn symmetric_difference_with(&mut self, other: &Store) {
        match (&mut *self, other) {
            (Array(vec1), Array(vec2)) => {
                *vec1 = sym_diff_sorted(vec1, vec2);
            }
            (this @ Array(_), Bitmap(_)) => {
                let mut bitmap = this.to_bitmap();
                bitmap.symmetric_difference_with(other);
                *this = bitmap;
            }
            (this @ Array(_), Run(_)) => {
                let other_bitmap = other.to_bitmap();
                let mut bitmap = this.to_bitmap();
                bitmap.symmetric_difference_with(&other_bitmap);
                *this = bitmap;
            }
            (Bitmap(bits1), Bitmap(bits2)) => {
                for (a, &b) in bits1.iter_mut().zip(bits2.iter()) {
                    *a ^= b;
                }
            }
            (this @ Bitmap(_), Array(vec2)) => {
                if let Bitmap(bits) = this {
                    for &v in vec2 {
                        bits[util::word_index(v)] ^= 1u64 << util::bit_index(v);
                    }
                }
            }
            (this @ Bitmap(_), Run(_)) => {
                let other_bitmap = other.to_bitmap();
                this.symmetric_difference_with(&other_bitmap);
            }
            (Run(runs1), Run(runs2)) => {
                let union = run_union(runs1, runs2);
                let inter = run_intersect(runs1, runs2);
                *runs1 = run_difference(&union, &inter);
            }
            (this @ Run(_), other) => {
                let mut bitmap = this.to_bitmap();
                bitmap.symmetric_difference_with(other);
                *this = bitmap;
            }
        }
    }

    pub fn is_subset(&self, other: &Store) -> bool {
        if self.len() > other.len() {
            return false;
        }
        match (self, other) {
            (Array(vec1), Array(vec2)) => is_sorted_subset(vec1, vec2),
            (Array(vec), store) => vec.iter().all(|&v| store.contains(v)),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.iter().zip(bits2.iter()).all(|(&a, &b)| a & b == a),
            (this, other) => this.iter().all(|v| other.contains(v)),
        }
    }

    pub fn is_disjoint(&self, other: &Store) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => {
                let (mut i, mut j) = (0, 0);
                while i < vec1.len() && j < vec2.len() {
                    match vec1[i].cmp(&vec2[j]) {
                        Less => i += 1,
                        Greater => j += 1,
                        Equal => return false,
                    }
                }
                true
            }
            (Bitmap(bits1), Bitmap(bits2)) => bits1.iter().zip(bits2.iter()).all(|(&a, &b)| a & b == 0),
            (Array(vec), store) | (store, Array(vec)) => vec.iter().all(|&v| !store.contains(v)),
            (this, other) => this.iter().all(|v| !other.contains(v)),
        }
    }

    /// `|self ∩ other|` without materializing the intersection (spec.md
    /// `cardinality_OP`).
    pub fn intersection_len(&self, other: &Store) -> u64 {
        match (self, other) {
            (Bitmap(bits1), Bitmap(bits2)) => bits1.iter().zip(bits2.iter()).map(|(&a, &b)| u64::from((a & b).count_ones())).sum(),
            (Array(vec1), Array(vec2)) => {
                let (mut i, mut j, mut count) = (0, 0, 0u64);
                while i < vec1.len() && j < vec2.len() {
                    match vec1[i].cmp(&vec2[j]) {
                        Less => i += 1,
                        Greater => j += 1,
                        Equal => {
                            count += 1;
                            i += 1;
                            j += 1;
                        }
                    }
                }
                count
            }
            (Array(vec), store) | (store, Array(vec)) => vec.iter().filter(|&&v| store.contains(v)).count() as u64,
            (this, other) => this.iter().filter(|&v| other.contains(v)).count() as u64,
        }
    }
}

fn overlap_len(a_start: u16, a_end: u16, b_start: u16, b_end: u16) -> u64 {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    if start > end {
        0
    } else {
        u64::from(end) - u64::from(start) + 1
    }
}

/// Count of set bits at or below `index`, mirroring `Store::rank`'s `Bitmap`
/// arm. Free function so it can be called while `bits` is already borrowed
/// out of a `match self` without re-borrowing `self`.
fn bitmap_rank(bits: &[u64; BITMAP_LENGTH], index: u16) -> u64 {
    let w = util::word_index(index);
    let b = util::bit_index(index);
    let mut total: u64 = bits[..w].iter().map(|word| u64::from(word.count_ones())).sum();
    total += u64::from((bits[w] & util::range_mask(0, b + 1)).count_ones());
    total
}

fn set_bitmap_range(bits: &mut [u64; BITMAP_LENGTH], start: u16, end_incl: u16, value: bool) {
    let w0 = util::word_index(start);
    let w1 = util::word_index(end_incl);
    let apply = |word: &mut u64, mask: u64| {
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    };
    if w0 == w1 {
        apply(&mut bits[w0], util::range_mask(util::bit_index(start), util::bit_index(end_incl) + 1));
    } else {
        apply(&mut bits[w0], util::range_mask(util::bit_index(start), 64));
        for w in &mut bits[w0 + 1..w1] {
            *w = if value { u64::MAX } else { 0 };
        }
        apply(&mut bits[w1], util::range_mask(0, util::bit_index(end_incl) + 1));
    }
}

fn find_run(runs: &[Interval], index: u16) -> Result<usize, usize> {
    runs.binary_search_by(|iv| {
        if index < iv.start {
            Greater
        } else if index > iv.end {
            Less
        } else {
            Equal
        }
    })
}

fn insert_run(runs: &mut Vec<Interval>, index: u16) -> bool {
    match find_run(runs, index) {
        Ok(_) => false,
        Err(loc) => {
            let merge_left = loc > 0 && runs[loc - 1].end != u16::MAX && runs[loc - 1].end + 1 == index;
            let merge_right = loc < runs.len() && runs[loc].start != 0 && runs[loc].start - 1 == index;
            match (merge_left, merge_right) {
                (true, true) => {
                    runs[loc - 1].end = runs[loc].end;
                    runs.remove(loc);
                }
                (true, false) => runs[loc - 1].end = index,
                (false, true) => runs[loc].start = index,
                (false, false) => runs.insert(loc, Interval::new(index, index)),
            }
            true
        }
    }
}

fn remove_run(runs: &mut Vec<Interval>, index: u16) -> bool {
    match find_run(runs, index) {
        Err(_) => false,
        Ok(loc) => {
            let iv = runs[loc].clone();
            if iv.start == iv.end {
                runs.remove(loc);
            } else if index == iv.start {
                runs[loc].start += 1;
            } else if index == iv.end {
                runs[loc].end -= 1;
            } else {
                runs[loc].end = index - 1;
                runs.insert(loc + 1, Interval::new(index + 1, iv.end));
            }
            true
        }
    }
}

fn merge_sorted(a: &[u16], b: &[u16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Less => {
                out.push(a[i]);
                i += 1;
            }
            Greater => {
                out.push(b[j]);
                j += 1;
            }
            Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

fn sym_diff_sorted(a: &[u16], b: &[u16]) -> Vec<u16> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Less => {
                out.push(a[i]);
                i += 1;
            }
            Greater => {
                out.push(b[j]);
                j += 1;
            }
            Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

fn is_sorted_subset(a: &[u16], b: &[u16]) -> bool {
    let mut j = 0;
    for &v in a {
        while j < b.len() && b[j] < v {
            j += 1;
        }
        if j >= b.len() || b[j] != v {
            return false;
        }
    }
    true
}

fn run_union(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut merged: Vec<Interval> = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let next = if i >= a.len() {
            let iv = b[j].clone();
            j += 1;
            iv
        } else if j >= b.len() {
            let iv = a[i].clone();
            i += 1;
            iv
        } else if a[i].start <= b[j].start {
            let iv = a[i].clone();
            i += 1;
            iv
        } else {
            let iv = b[j].clone();
            j += 1;
            iv
        };
        match merged.last_mut() {
            Some(last) if next.start <= last.end.saturating_add(1) || (last.end == u16::MAX && next.start >= last.start) => {
                if next.end > last.end {
                    last.end = next.end;
                }
            }
            _ => merged.push(next),
        }
    }
    merged
}

fn run_intersect(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let start = a[i].start.max(b[j].start);
        let end = a[i].end.min(b[j].end);
        if start <= end {
            out.push(Interval::new(start, end));
        }
        if a[i].end < b[j].end {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

fn run_difference(a: &[Interval], b: &[Interval]) -> Vec<Interval> {
    let mut out = Vec::new();
    let mut j = 0;
    for iv in a {
        let mut cursor = iv.start;
        while j < b.len() && b[j].end < cursor {
            j += 1;
        }
        let mut k = j;
        while k < b.len() && b[k].start <= iv.end {
            if b[k].start > cursor {
                out.push(Interval::new(cursor, b[k].start - 1));
            }
            if b[k].end >= cursor {
                cursor = b[k].end.saturating_add(1);
                if b[k].end == u16::MAX {
                    cursor = iv.end.saturating_add(1).max(cursor);
                    break;
                }
            }
            k += 1;
        }
        if cursor <= iv.end {
            out.push(Interval::new(cursor, iv.end));
        }
    }
    out
}

impl<'a> IntoIterator for &'a Store {
    type Item = u16;
    type IntoIter = Iter<'a>;
    fn into_iter(self) -> Iter<'a> {
        match self {
            Array(vec) => Iter::Array(vec.iter()),
            Bitmap(bits) => Iter::BitmapBorrowed { words: bits, word: 0, bits: bits[0] },
            Run(runs) => Iter::Run(RunIter::new(runs.clone())),
        }
    }
}

impl IntoIterator for Store {
    type Item = u16;
    type IntoIter = Iter<'static>;
    fn into_iter(self) -> Iter<'static> {
        match self {
            Array(vec) => Iter::Vec(vec.into_iter()),
            Bitmap(bits) => {
                let first = bits[0];
                Iter::BitmapOwned { words: bits, word: 0, bits: first }
            }
            Run(runs) => Iter::Run(RunIter::new(runs)),
        }
    }
}

impl RunIter {
    fn new(intervals: Vec<Interval>) -> RunIter {
        RunIter { intervals, run: 0, offset: 0 }
    }
}

impl Iterator for RunIter {
    type Item = u16;
    fn next(&mut self) -> Option<u16> {
        let iv = self.intervals.get(self.run)?;
        let value = iv.start + self.offset as u16;
        if u64::from(self.offset) + 1 == iv.run_len() {
            self.run += 1;
            self.offset = 0;
        } else {
            self.offset += 1;
        }
        Some(value)
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u16;
    fn next(&mut self) -> Option<u16> {
        match self {
            Iter::Array(it) => it.next().copied(),
            Iter::Vec(it) => it.next(),
            Iter::BitmapBorrowed { words, word, bits } => advance_bitmap_iter(words.as_ref(), word, bits),
            Iter::BitmapOwned { words, word, bits } => advance_bitmap_iter(words.as_ref(), word, bits),
            Iter::Run(it) => it.next(),
        }
    }
}

fn advance_bitmap_iter(words: &[u64; BITMAP_LENGTH], word: &mut usize, bits: &mut u64) -> Option<u16> {
    loop {
        if *bits != 0 {
            let b = bits.trailing_zeros() as usize;
            let result = (*word * 64 + b) as u16;
            *bits &= *bits - 1;
            return Some(result);
        }
        *word += 1;
        if *word >= BITMAP_LENGTH {
            return None;
        }
        *bits = words[*word];
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(a), Array(b)) => a == b,
            (Bitmap(a), Bitmap(b)) => a.iter().eq(b.iter()),
            (Run(a), Run(b)) => a == b,
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Array(_) => write!(f, "Array<{} values>", self.len()),
            Bitmap(_) => write!(f, "Bitmap<{} bits set>", self.len()),
            Run(runs) => write!(f, "Run<{} runs, {} values>", runs.len(), self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_insert_remove() {
        let mut s = Store::new_array();
        assert!(s.insert(5));
        assert!(!s.insert(5));
        assert!(s.contains(5));
        assert!(s.remove(5));
        assert!(!s.contains(5));
    }

    #[test]
    fn run_insert_merges_adjacent() {
        let mut s = Run(vec![Interval::new(1, 3), Interval::new(10, 12)]);
        assert!(s.insert(4));
        assert_eq!(s, Run(vec![Interval::new(1, 4), Interval::new(10, 12)]));
        assert!(s.insert(9));
        assert_eq!(s, Run(vec![Interval::new(1, 4), Interval::new(9, 12)]));
        assert!(s.insert(5));
        assert!(s.insert(6));
        assert!(s.insert(7));
        assert!(s.insert(8));
        assert_eq!(s, Run(vec![Interval::new(1, 12)]));
    }

    #[test]
    fn run_remove_splits() {
        let mut s = Run(vec![Interval::new(1, 10)]);
        assert!(s.remove(5));
        assert_eq!(s, Run(vec![Interval::new(1, 4), Interval::new(6, 10)]));
    }

    #[test]
    fn conversions_round_trip() {
        let array = Array(vec![1, 2, 3, 100, 65535]);
        let bitmap = array.to_bitmap();
        assert_eq!(array.len(), bitmap.len());
        assert!(array.iter().eq(bitmap.iter()));
        let run = array.to_run();
        assert!(array.iter().eq(run.iter()));
        assert_eq!(run.to_array(), array);
    }

    #[test]
    fn rank_select_roundtrip() {
        let s = Array(vec![1, 2, 3, 100]);
        for (i, &v) in [1u16, 2, 3, 100].iter().enumerate() {
            assert_eq!(s.select(i as u64), Some(v));
            assert_eq!(s.rank(v) as usize, i + 1);
        }
    }

    #[test]
    fn bitmap_range_ops() {
        let mut bits = Bitmap(Box::new([0u64; BITMAP_LENGTH]));
        let inserted = bits.insert_range(10..20);
        assert_eq!(inserted, 10);
        assert_eq!(bits.len(), 10);
        let removed = bits.remove_range(15..17);
        assert_eq!(removed, 2);
        assert_eq!(bits.len(), 8);
        bits.complement_range(10..20);
        assert_eq!(bits.len(), 2);
    }

    #[test]
    fn union_intersection_mixed_types() {
        let mut array = Array(vec![1, 2, 3]);
        let bitmap = Array(vec![2, 3, 4]).to_bitmap();
        array.union_with(&bitmap);
        assert_eq!(array.to_array(), Array(vec![1, 2, 3, 4]));

        let mut run = Run(vec![Interval::new(0, 5)]);
        let array2 = Array(vec![3, 10]);
        run.intersect_with(&array2);
        assert!(run.iter().eq(vec![3]));
    }
}

//! Frozen format: a random-access, zero-copy view over a pre-serialized
//! buffer (spec.md §6.3). The teacher has no equivalent of this format; it
//! is built fresh, grounded on `original_source/src/roaring.c`'s
//! `roaring_bitmap_frozen_size_in_bytes`/`roaring_bitmap_frozen_serialize`/
//! `roaring_bitmap_frozen_view`.
//!
//! Layout, from the front of the buffer: bitset words, then run intervals,
//! then array values, then one `u16` key per container, then one `u16`
//! count per container (`cardinality - 1` for array/bitmap, `n_runs` for
//! run), then one `u8` typecode per container, then a 4-byte header word
//! `(num_containers << 15) | FROZEN_COOKIE`. The buffer must be 32-byte
//! aligned, matching CRoaring so the bitset words can be read in place
//! without a copy.

use crate::container::Container;
use crate::error::FrozenViewError;
use crate::store::{Interval, Store, BITMAP_LENGTH};
use crate::RoaringBitmap;

const FROZEN_COOKIE: u32 = 13;
const ALIGNMENT: usize = 32;

const TYPECODE_BITSET: u8 = 1;
const TYPECODE_ARRAY: u8 = 2;
const TYPECODE_RUN: u8 = 3;

struct Layout {
    num_containers: usize,
    typecodes_off: usize,
    counts_off: usize,
    keys_off: usize,
    array_off: usize,
    run_off: usize,
    bitset_off: usize,
}

impl RoaringBitmap {
    /// Exact size in bytes of this bitmap's frozen image. Only the buffer's
    /// *start* needs 32-byte alignment (so bitset words can be read in place);
    /// the image itself is packed with no trailing padding, matching
    /// CRoaring's `roaring_bitmap_frozen_size_in_bytes`.
    pub fn frozen_size_in_bytes(&self) -> usize {
        let n = self.containers.len();
        let mut size = 4 + n * (1 + 2 + 2); // header + typecode + count + key per container
        for c in &self.containers {
            size += match &*c.store {
                Store::Array(vec) => 2 * vec.len(),
                Store::Bitmap(_) => 8 * BITMAP_LENGTH,
                Store::Run(runs) => 4 * runs.len(),
            };
        }
        size
    }

    /// Writes this bitmap's frozen image into `buf`, which must be at least
    /// [`RoaringBitmap::frozen_size_in_bytes`] long.
    pub fn frozen_serialize_into(&self, buf: &mut [u8]) {
        let n = self.containers.len();
        let total = self.frozen_size_in_bytes();
        assert!(buf.len() >= total, "buffer too small for frozen image");

        let mut bitset_cursor = 0usize;
        for c in &self.containers {
            if let Store::Bitmap(bits) = &*c.store {
                for &word in bits.iter() {
                    buf[bitset_cursor..bitset_cursor + 8].copy_from_slice(&word.to_le_bytes());
                    bitset_cursor += 8;
                }
            }
        }
        let mut run_cursor = bitset_cursor;
        for c in &self.containers {
            if let Store::Run(runs) = &*c.store {
                for iv in runs {
                    buf[run_cursor..run_cursor + 2].copy_from_slice(&iv.start.to_le_bytes());
                    buf[run_cursor + 2..run_cursor + 4].copy_from_slice(&(iv.end - iv.start).to_le_bytes());
                    run_cursor += 4;
                }
            }
        }
        let mut array_cursor = run_cursor;
        for c in &self.containers {
            if let Store::Array(vec) = &*c.store {
                for &v in vec {
                    buf[array_cursor..array_cursor + 2].copy_from_slice(&v.to_le_bytes());
                    array_cursor += 2;
                }
            }
        }

        let keys_off = array_cursor;
        let counts_off = keys_off + 2 * n;
        let typecodes_off = counts_off + 2 * n;
        let header_off = typecodes_off + n;

        for (i, c) in self.containers.iter().enumerate() {
            buf[keys_off + 2 * i..keys_off + 2 * i + 2].copy_from_slice(&c.key.to_le_bytes());
            let (typecode, count): (u8, u16) = match &*c.store {
                Store::Array(vec) => (TYPECODE_ARRAY, (vec.len() - 1) as u16),
                Store::Bitmap(_) => (TYPECODE_BITSET, (c.store.len() - 1) as u16),
                Store::Run(runs) => (TYPECODE_RUN, runs.len() as u16),
            };
            buf[counts_off + 2 * i..counts_off + 2 * i + 2].copy_from_slice(&count.to_le_bytes());
            buf[typecodes_off + i] = typecode;
        }

        let header = ((n as u32) << 15) | FROZEN_COOKIE;
        buf[header_off..header_off + 4].copy_from_slice(&header.to_le_bytes());
    }
}

/// A read-only, lifetime-bound view over a frozen buffer. Values are decoded
/// on demand rather than copied; the view cannot outlive `buf` (spec.md §9
/// "the viewer must not outlive the buffer").
pub struct FrozenBitmap<'a> {
    buf: &'a [u8],
    layout: Layout,
}

impl<'a> FrozenBitmap<'a> {
    /// Validates `buf`'s header and returns a view over it, or an error
    /// describing why `buf` cannot be a valid frozen image.
    pub fn from_bytes(buf: &'a [u8]) -> Result<FrozenBitmap<'a>, FrozenViewError> {
        if buf.as_ptr() as usize % ALIGNMENT != 0 {
            return Err(FrozenViewError::Misaligned);
        }
        if buf.len() < 4 {
            return Err(FrozenViewError::TooShort);
        }
        let header = u32::from_le_bytes(buf[buf.len() - 4..].try_into().unwrap());
        if header & 0x7FFF != FROZEN_COOKIE {
            return Err(FrozenViewError::BadCookie);
        }
        let n = (header >> 15) as usize;

        let header_off = buf.len().saturating_sub(4);
        let typecodes_off = header_off.checked_sub(n).ok_or(FrozenViewError::LengthMismatch)?;
        let counts_off = typecodes_off.checked_sub(2 * n).ok_or(FrozenViewError::LengthMismatch)?;
        let keys_off = counts_off.checked_sub(2 * n).ok_or(FrozenViewError::LengthMismatch)?;

        let mut bitset_bytes = 0usize;
        let mut run_bytes = 0usize;
        let mut array_bytes = 0usize;
        for i in 0..n {
            let typecode = buf[typecodes_off + i];
            let count = u16::from_le_bytes(buf[counts_off + 2 * i..counts_off + 2 * i + 2].try_into().unwrap());
            match typecode {
                TYPECODE_BITSET => bitset_bytes += 8 * BITMAP_LENGTH,
                TYPECODE_ARRAY => array_bytes += 2 * (u32::from(count) as usize + 1),
                TYPECODE_RUN => run_bytes += 4 * count as usize,
                _ => return Err(FrozenViewError::UnknownTypeCode),
            }
        }

        let array_off = bitset_bytes + run_bytes;
        let run_off = bitset_bytes;
        let bitset_off = 0;
        if array_off + array_bytes != keys_off {
            return Err(FrozenViewError::LengthMismatch);
        }

        Ok(FrozenBitmap { buf, layout: Layout { num_containers: n, typecodes_off, counts_off, keys_off, array_off, run_off, bitset_off } })
    }

    pub fn num_containers(&self) -> usize {
        self.layout.num_containers
    }

    /// `true` if `value` is present in the view, without materializing a
    /// [`RoaringBitmap`].
    pub fn contains(&self, value: u32) -> bool {
        let (key, index) = crate::util::split(value);
        let Some(i) = self.find_container(key) else { return false };
        self.container_contains(i, index)
    }

    fn find_container(&self, key: u16) -> Option<usize> {
        (0..self.layout.num_containers).find(|&i| self.key_at(i) == key)
    }

    fn key_at(&self, i: usize) -> u16 {
        let off = self.layout.keys_off + 2 * i;
        u16::from_le_bytes(self.buf[off..off + 2].try_into().unwrap())
    }

    fn count_at(&self, i: usize) -> u16 {
        let off = self.layout.counts_off + 2 * i;
        u16::from_le_bytes(self.buf[off..off + 2].try_into().unwrap())
    }

    fn typecode_at(&self, i: usize) -> u8 {
        self.buf[self.layout.typecodes_off + i]
    }

    fn container_contains(&self, i: usize, index: u16) -> bool {
        match self.typecode_at(i) {
            TYPECODE_ARRAY => {
                let base = self.layout.array_off + 2 * self.array_elements_before(i);
                let card = self.count_at(i) as usize + 1;
                let bytes = &self.buf[base..base + 2 * card];
                bytes.chunks_exact(2).any(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]) == index)
            }
            TYPECODE_BITSET => {
                let words = self.bitset_words(i);
                words[crate::util::word_index(index)] & (1u64 << crate::util::bit_index(index)) != 0
            }
            TYPECODE_RUN => {
                let base = self.layout.run_off + 4 * self.run_intervals_before(i);
                let n_runs = self.count_at(i) as usize;
                for r in 0..n_runs {
                    let off = base + 4 * r;
                    let start = u16::from_le_bytes(self.buf[off..off + 2].try_into().unwrap());
                    let length = u16::from_le_bytes(self.buf[off + 2..off + 4].try_into().unwrap());
                    if index >= start && index <= start.wrapping_add(length) {
                        return true;
                    }
                }
                false
            }
            _ => false,
        }
    }

    /// Zero-copy view of one bitset container's words. Valid because the
    /// whole buffer is 32-byte aligned and every bitset region is an exact
    /// multiple of 8 bytes, so `bytemuck` never has to reject the cast.
    fn bitset_words(&self, i: usize) -> &[u64] {
        let base = self.layout.bitset_off + 8 * BITMAP_LENGTH * self.bitset_containers_before(i);
        bytemuck::cast_slice(&self.buf[base..base + 8 * BITMAP_LENGTH])
    }

    fn array_elements_before(&self, i: usize) -> usize {
        (0..i).filter(|&j| self.typecode_at(j) == TYPECODE_ARRAY).map(|j| self.count_at(j) as usize + 1).sum()
    }

    fn bitset_containers_before(&self, i: usize) -> usize {
        (0..i).filter(|&j| self.typecode_at(j) == TYPECODE_BITSET).count()
    }

    fn run_intervals_before(&self, i: usize) -> usize {
        (0..i).filter(|&j| self.typecode_at(j) == TYPECODE_RUN).map(|j| self.count_at(j) as usize).sum()
    }

    /// Materializes an owned [`RoaringBitmap`] with the same contents.
    pub fn to_bitmap(&self) -> RoaringBitmap {
        let mut containers = Vec::with_capacity(self.layout.num_containers);
        for i in 0..self.layout.num_containers {
            let key = self.key_at(i);
            let store = match self.typecode_at(i) {
                TYPECODE_ARRAY => {
                    let base = self.layout.array_off + 2 * self.array_elements_before(i);
                    let card = self.count_at(i) as usize + 1;
                    let vec = self.buf[base..base + 2 * card].chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
                    Store::Array(vec)
                }
                TYPECODE_BITSET => {
                    let mut bits = Box::new([0u64; BITMAP_LENGTH]);
                    bits.copy_from_slice(self.bitset_words(i));
                    Store::Bitmap(bits)
                }
                TYPECODE_RUN => {
                    let base = self.layout.run_off + 4 * self.run_intervals_before(i);
                    let n_runs = self.count_at(i) as usize;
                    let runs = (0..n_runs)
                        .map(|r| {
                            let off = base + 4 * r;
                            let start = u16::from_le_bytes(self.buf[off..off + 2].try_into().unwrap());
                            let length = u16::from_le_bytes(self.buf[off + 2..off + 4].try_into().unwrap());
                            Interval::new(start, start + length)
                        })
                        .collect();
                    Store::Run(runs)
                }
                _ => unreachable!("typecode validated in from_bytes"),
            };
            let mut container = Container::new(key);
            container.replace_store(store);
            containers.push(container);
        }
        RoaringBitmap { containers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aligned_buffer(len: usize) -> Vec<u8> {
        let mut v = vec![0u8; len + ALIGNMENT];
        let misalignment = v.as_ptr() as usize % ALIGNMENT;
        v.drain(0..(ALIGNMENT - misalignment) % ALIGNMENT);
        v.truncate(len);
        v
    }

    #[test]
    fn round_trips_through_frozen_view() {
        let mut bm = RoaringBitmap::new();
        bm.insert_range(0..50);
        bm.insert_range(100_000..170_000);
        bm.run_optimize();

        let size = bm.frozen_size_in_bytes();
        let mut buf = aligned_buffer(size);
        bm.frozen_serialize_into(&mut buf);

        let view = FrozenBitmap::from_bytes(&buf).unwrap();
        for v in [0u32, 25, 49, 100_000, 150_000, 169_999] {
            assert!(view.contains(v));
        }
        assert!(!view.contains(99_999));
        assert_eq!(view.to_bitmap(), bm);
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(FrozenBitmap::from_bytes(&[0u8; 3]).unwrap_err(), FrozenViewError::TooShort);
    }

    #[test]
    fn rejects_misaligned_buffer() {
        let mut buf = vec![0u8; ALIGNMENT * 2];
        let misalignment = buf.as_ptr() as usize % ALIGNMENT;
        let offset = (1 + ALIGNMENT - misalignment) % ALIGNMENT;
        let offset = if offset == 0 { 1 } else { offset };
        if offset < buf.len() {
            assert_eq!(FrozenBitmap::from_bytes(&buf[offset..]).unwrap_err(), FrozenViewError::Misaligned);
        }
    }
}

//! Normalized bit-index sets describing where a field lives inside an instruction word.

use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;
use smallvec::SmallVec;

use crate::model::error::{ModelError, ModelResult};
use crate::model::types::DataType;
use crate::model::value::Value;

/// One contiguous `[msb..lsb]` run of bit indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Part {
    msb: u32,
    lsb: u32,
}

impl Part {
    /// Highest addressable bit index; `MAX_INDEX + 1` is still a valid width.
    pub const MAX_INDEX: u32 = u32::MAX - 1;

    pub fn new(msb: u32, lsb: u32) -> ModelResult<Self> {
        Self::check_index(msb)?;
        if msb < lsb {
            return Err(
                ModelError::shape(format!("part {msb}..{lsb} has its msb below its lsb"))
                    .with_context("msb", msb)
                    .with_context("lsb", lsb),
            );
        }
        Ok(Self { msb, lsb })
    }

    fn check_index(index: u32) -> ModelResult<()> {
        if index > Self::MAX_INDEX {
            return Err(ModelError::range(format!(
                "bit index {index} exceeds the highest index {}",
                Self::MAX_INDEX
            ))
            .with_context("index", index));
        }
        Ok(())
    }

    pub const fn index(index: u32) -> Self {
        Self {
            msb: index,
            lsb: index,
        }
    }

    pub const fn msb(&self) -> u32 {
        self.msb
    }

    pub const fn lsb(&self) -> u32 {
        self.lsb
    }

    pub const fn size(&self) -> u32 {
        self.msb - self.lsb + 1
    }

    pub const fn is_index(&self) -> bool {
        self.msb == self.lsb
    }

    pub const fn is_range(&self) -> bool {
        !self.is_index()
    }

    pub const fn contains(&self, index: u32) -> bool {
        self.lsb <= index && index <= self.msb
    }

    /// True iff the closed ranges `[lsb, msb]` intersect.
    pub const fn is_overlapping(&self, other: &Part) -> bool {
        self.lsb <= other.msb && other.lsb <= self.msb
    }

    pub const fn is_surrounded_by(&self, other: &Part) -> bool {
        other.lsb <= self.lsb && self.msb <= other.msb
    }

    /// Merges two parts that touch or overlap into the covering part.
    pub fn join(&self, other: &Part) -> Option<Part> {
        let touching = self.lsb <= other.msb.saturating_add(1)
            && other.lsb <= self.msb.saturating_add(1);
        touching.then(|| Part {
            msb: self.msb.max(other.msb),
            lsb: self.lsb.min(other.lsb),
        })
    }

    /// Indices from `lsb` up to `msb`.
    pub fn iter(&self) -> std::ops::RangeInclusive<u32> {
        self.lsb..=self.msb
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_index() {
            write!(f, "{}", self.msb)
        } else {
            write!(f, "{}..{}", self.msb, self.lsb)
        }
    }
}

/// A non-empty set of disjoint bit indices, stored as maximal descending runs in declaration order.
///
/// Construction flattens the supplied parts msb-first, in the order given, and merges every index
/// that continues the previous one downward. `[0], [7..5], [4], [3..2], [9..8]` therefore becomes
/// `[0], [7..2], [9..8]`. Size and extreme indices are computed once.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BitSlice {
    parts: SmallVec<[Part; 2]>,
    bit_size: u32,
    msb: u32,
    lsb: u32,
}

impl BitSlice {
    pub fn new(parts: impl IntoIterator<Item = Part>) -> ModelResult<Self> {
        let declared: SmallVec<[Part; 4]> = parts.into_iter().collect();
        if declared.is_empty() {
            return Err(ModelError::shape("bit slice requires at least one part"));
        }
        for (idx, part) in declared.iter().enumerate() {
            Part::check_index(part.msb)?;
            if let Some(other) = declared[idx + 1..]
                .iter()
                .find(|other| part.is_overlapping(other))
            {
                return Err(ModelError::shape(format!(
                    "bit slice parts {part} and {other} overlap"
                ))
                .with_context("part", part)
                .with_context("other", other));
            }
        }

        let mut normalized: SmallVec<[Part; 2]> = SmallVec::new();
        for part in &declared {
            match normalized.last_mut() {
                Some(last) if part.msb.checked_add(1) == Some(last.lsb) => last.lsb = part.lsb,
                _ => normalized.push(*part),
            }
        }

        let bit_size = normalized.iter().map(Part::size).sum();
        let msb = normalized.iter().map(Part::msb).max().unwrap_or_default();
        let lsb = normalized.iter().map(Part::lsb).min().unwrap_or_default();
        Ok(Self {
            parts: normalized,
            bit_size,
            msb,
            lsb,
        })
    }

    /// Single continuous slice `[msb..lsb]`.
    pub fn of(msb: u32, lsb: u32) -> ModelResult<Self> {
        Self::new([Part::new(msb, lsb)?])
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    pub fn bit_size(&self) -> u32 {
        self.bit_size
    }

    pub fn msb(&self) -> u32 {
        self.msb
    }

    pub fn lsb(&self) -> u32 {
        self.lsb
    }

    pub fn is_continuous(&self) -> bool {
        self.parts.len() == 1
    }

    /// Indices in ascending order, independent of declaration order.
    pub fn iter(&self) -> BitIndices {
        let mut parts = self.parts.clone();
        parts.sort_by_key(|part| part.lsb);
        BitIndices {
            parts,
            part: 0,
            next: None,
        }
    }

    /// Instruction-word index of each bit of the field value, least significant value bit first.
    ///
    /// The first declared part holds the most significant value bits.
    pub fn value_positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.parts.iter().rev().flat_map(Part::iter)
    }

    pub fn contains(&self, index: u32) -> bool {
        self.parts.iter().any(|part| part.contains(index))
    }

    pub fn overlaps(&self, other: &BitSlice) -> bool {
        self.parts
            .iter()
            .any(|part| other.parts.iter().any(|rhs| part.is_overlapping(rhs)))
    }

    /// `Bits<msb + 1>` value with exactly the slice's indices set.
    pub fn mask(&self) -> Value {
        let mut pattern = BigUint::zero();
        for index in self.iter() {
            pattern.set_bit(u64::from(index), true);
        }
        Value::from_masked(pattern, DataType::bits(self.msb + 1))
    }

    /// Resolves `inner`, expressed in field-value bit positions, to instruction-word positions.
    pub fn apply(&self, inner: &BitSlice) -> ModelResult<BitSlice> {
        if inner.msb() >= self.bit_size {
            return Err(ModelError::shape(format!(
                "slice {inner} exceeds the {} bits of slice {self}",
                self.bit_size
            )));
        }
        let positions: SmallVec<[u32; 32]> = self.value_positions().collect();
        let mut mapped = SmallVec::<[Part; 8]>::new();
        for part in inner.parts() {
            for value_bit in part.iter().rev() {
                mapped.push(Part::index(positions[value_bit as usize]));
            }
        }
        BitSlice::new(mapped)
    }
}

impl fmt::Display for BitSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, part) in self.parts.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{part}")?;
        }
        write!(f, "]")
    }
}

/// Ascending iterator over the indices of a [`BitSlice`].
#[derive(Clone, Debug)]
pub struct BitIndices {
    parts: SmallVec<[Part; 2]>,
    part: usize,
    next: Option<u32>,
}

impl Iterator for BitIndices {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            let part = self.parts.get(self.part)?;
            let index = self.next.unwrap_or(part.lsb);
            if index <= part.msb {
                self.next = index.checked_add(1);
                if self.next.is_none() || index == part.msb {
                    self.part += 1;
                    self.next = None;
                }
                return Some(index);
            }
            self.part += 1;
            self.next = None;
        }
    }
}

impl<'a> IntoIterator for &'a BitSlice {
    type Item = u32;
    type IntoIter = BitIndices;

    fn into_iter(self) -> BitIndices {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::error::ModelErrorKind;

    fn range(msb: u32, lsb: u32) -> Part {
        Part::new(msb, lsb).expect("valid part")
    }

    #[test]
    fn normalization_merges_descending_runs() {
        let slice = BitSlice::new([
            Part::index(0),
            range(7, 5),
            Part::index(4),
            range(3, 2),
            range(9, 8),
        ])
        .unwrap();
        assert_eq!(slice.parts(), &[Part::index(0), range(7, 2), range(9, 8)]);
        assert_eq!(slice.to_string(), "[0, 7..2, 9..8]");
        assert_eq!(slice.bit_size(), 9);
        assert_eq!(slice.msb(), 9);
        assert_eq!(slice.lsb(), 0);
        assert!(!slice.is_continuous());
    }

    #[test]
    fn normalization_is_idempotent() {
        let slice = BitSlice::new([range(15, 12), range(11, 8), Part::index(2)]).unwrap();
        let again = BitSlice::new(slice.parts().iter().copied()).unwrap();
        assert_eq!(again.parts(), slice.parts());
        assert_eq!(slice.parts(), &[range(15, 8), Part::index(2)]);
    }

    #[test]
    fn rejects_empty_and_overlapping_parts() {
        let err = BitSlice::new([]).expect_err("empty slice");
        assert_eq!(err.kind(), ModelErrorKind::Shape);
        let err = BitSlice::new([range(7, 4), range(5, 0)]).expect_err("parts overlap");
        assert_eq!(err.message(), "bit slice parts 7..4 and 5..0 overlap");
        assert!(Part::new(1, 2).is_err());
    }

    #[test]
    fn iteration_is_ascending() {
        let slice = BitSlice::new([Part::index(0), range(7, 5), range(11, 10)]).unwrap();
        let indices: Vec<u32> = slice.iter().collect();
        assert_eq!(indices, vec![0, 5, 6, 7, 10, 11]);
        let part: Vec<u32> = range(3, 1).iter().collect();
        assert_eq!(part, vec![1, 2, 3]);
    }

    #[test]
    fn value_positions_follow_declaration_significance() {
        let slice = BitSlice::new([range(31, 31), range(7, 7), range(30, 25)]).unwrap();
        let positions: Vec<u32> = slice.value_positions().collect();
        assert_eq!(positions, vec![25, 26, 27, 28, 29, 30, 7, 31]);
    }

    #[test]
    fn queries_and_mask() {
        let slice = BitSlice::new([range(6, 4), Part::index(1)]).unwrap();
        assert!(slice.contains(5) && slice.contains(1));
        assert!(!slice.contains(3));
        assert!(slice.overlaps(&BitSlice::of(3, 1).unwrap()));
        assert!(!slice.overlaps(&BitSlice::of(3, 2).unwrap()));
        assert_eq!(slice.mask().to_u64(), Some(0b111_0010));
        assert_eq!(slice.mask().ty(), DataType::bits(7));
    }

    #[test]
    fn part_relations() {
        assert!(range(5, 3).is_overlapping(&range(3, 0)));
        assert!(!range(5, 3).is_overlapping(&range(2, 0)));
        assert!(range(4, 3).is_surrounded_by(&range(5, 0)));
        assert_eq!(range(5, 3).join(&range(2, 0)), Some(range(5, 0)));
        assert_eq!(range(5, 4).join(&range(2, 0)), None);
        assert_eq!(range(5, 3).size(), 3);
    }

    #[test]
    fn highest_index_leaves_room_for_the_mask_width() {
        let err = BitSlice::of(u32::MAX, 0).expect_err("msb + 1 overflows");
        assert_eq!(err.kind(), ModelErrorKind::Range);
        assert_eq!(err.context_value("index"), Some("4294967295"));
        let err = BitSlice::new([Part::index(u32::MAX)]).expect_err("index part too");
        assert_eq!(err.kind(), ModelErrorKind::Range);

        let widest = range(Part::MAX_INDEX, 0);
        assert_eq!(widest.size(), u32::MAX);
        let top = BitSlice::new([Part::index(Part::MAX_INDEX)]).unwrap();
        assert_eq!((top.msb(), top.bit_size()), (Part::MAX_INDEX, 1));
    }

    #[test]
    fn apply_resolves_nested_slices() {
        let field = BitSlice::new([range(31, 25), range(11, 7)]).unwrap();
        let upper = field.apply(&BitSlice::of(11, 5).unwrap()).unwrap();
        assert_eq!(upper, BitSlice::of(31, 25).unwrap());
        let low = field.apply(&BitSlice::of(4, 0).unwrap()).unwrap();
        assert_eq!(low, BitSlice::of(11, 7).unwrap());
        assert!(field.apply(&BitSlice::of(12, 0).unwrap()).is_err());
    }
}

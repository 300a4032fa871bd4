//! Row predicates and bitmask composition
//!
//! Every active predicate of a [`FilterSpec`] produces a row mask over the
//! dataset. Masks are intersected, so the order predicates are applied in
//! never changes the result.

use super::filter::FilterSpec;
use crate::data::{ParcelRecord, Utility};

/// A bitmask representing which rows pass a filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMask {
    /// Bit array where 1 = row passes, 0 = row fails
    bits: Vec<u64>,
    /// Total number of rows
    len: usize,
    /// Count of passing rows (cached for efficiency)
    count: usize,
}

impl RowMask {
    /// Create a mask where all rows pass
    pub fn all_true(len: usize) -> Self {
        let num_words = (len + 63) / 64;
        let mut bits = vec![u64::MAX; num_words];

        // Clear bits beyond len
        if len % 64 != 0 {
            let last_word_bits = len % 64;
            bits[num_words - 1] = (1u64 << last_word_bits) - 1;
        }

        Self {
            bits,
            len,
            count: len,
        }
    }

    /// Create a mask where no rows pass
    pub fn all_false(len: usize) -> Self {
        let num_words = (len + 63) / 64;
        Self {
            bits: vec![0u64; num_words],
            len,
            count: 0,
        }
    }

    /// Set a specific row to pass
    #[inline]
    pub fn set(&mut self, index: usize) {
        if index >= self.len {
            return;
        }
        let word = index / 64;
        let bit = index % 64;
        if self.bits[word] & (1u64 << bit) == 0 {
            self.bits[word] |= 1u64 << bit;
            self.count += 1;
        }
    }

    /// AND this mask with another (intersection)
    pub fn and(&mut self, other: &RowMask) {
        for (a, b) in self.bits.iter_mut().zip(other.bits.iter()) {
            *a &= *b;
        }
        self.count = self.bits.iter().map(|w| w.count_ones() as usize).sum();
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn none(&self) -> bool {
        self.count == 0
    }

    /// Get indices of passing rows in ascending order
    pub fn indices(&self) -> Vec<usize> {
        let mut result = Vec::with_capacity(self.count);
        for (word_idx, &word) in self.bits.iter().enumerate() {
            let base = word_idx * 64;
            let mut w = word;
            while w != 0 {
                let bit = w.trailing_zeros() as usize;
                let idx = base + bit;
                if idx < self.len {
                    result.push(idx);
                }
                w &= w - 1; // Clear lowest set bit
            }
        }
        result
    }
}

/// A single active condition on a parcel
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Exact land category
    Category(String),
    /// Utility flag must equal the given value
    Utility(Utility, bool),
    /// Case-sensitive substring of the cadastral block
    BlockContains(String),
    /// Exact address
    Address(String),
}

impl Predicate {
    /// Missing values never match
    #[inline]
    pub fn matches(&self, record: &ParcelRecord) -> bool {
        match self {
            Predicate::Category(category) => record.category.as_deref() == Some(category.as_str()),
            Predicate::Utility(utility, required) => record.utility(*utility) == Some(*required),
            Predicate::BlockContains(needle) => record
                .cadastral_block
                .as_deref()
                .map(|block| block.contains(needle.as_str()))
                .unwrap_or(false),
            Predicate::Address(address) => record.address.as_deref() == Some(address.as_str()),
        }
    }
}

/// Active predicates of a filter spec; unset filters contribute nothing
pub fn predicates_for(spec: &FilterSpec) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if let Some(address) = spec.active_address() {
        predicates.push(Predicate::Address(address.to_string()));
    }
    if let Some(category) = spec.active_category() {
        predicates.push(Predicate::Category(category.to_string()));
    }
    if let Some(block) = spec.active_block() {
        predicates.push(Predicate::BlockContains(block.to_string()));
    }
    for utility in Utility::ALL {
        if let Some(required) = spec.utility(utility).required() {
            predicates.push(Predicate::Utility(utility, required));
        }
    }

    predicates
}

/// Build a row mask for a single predicate
pub fn build_predicate_mask(records: &[ParcelRecord], predicate: &Predicate) -> RowMask {
    let mut mask = RowMask::all_false(records.len());
    for (i, record) in records.iter().enumerate() {
        if predicate.matches(record) {
            mask.set(i);
        }
    }
    mask
}

/// Build a combined mask for all predicates (AND logic)
pub fn build_combined_mask(records: &[ParcelRecord], predicates: &[Predicate]) -> RowMask {
    let mut result = RowMask::all_true(records.len());

    for predicate in predicates {
        if result.none() {
            break;
        }
        let mask = build_predicate_mask(records, predicate);
        result.and(&mask);
    }

    result
}

#![forbid(unsafe_code)]

//! Random XML identifiers for one signature block.
//!
//! The IDs only disambiguate elements inside a single document, so they are
//! not security material; what matters is that the eight roles get pairwise
//! distinct values and that tests can pin the generator with a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;

/// Default identifier range, matching the reference credential tooling.
pub const DEFAULT_ID_RANGE: RangeInclusive<u32> = 990..=9999;

/// One identifier per role of the signature block. Generated once at the
/// start of a pipeline run and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierBatch {
    pub signature: u32,
    pub signed_properties: u32,
    pub signed_properties_id: u32,
    pub signed_info: u32,
    pub certificate: u32,
    pub reference_id: u32,
    pub signature_value: u32,
    pub object: u32,
}

impl IdentifierBatch {
    /// Draw eight pairwise-distinct identifiers from `range`.
    ///
    /// Panics if `range` holds fewer than eight values; that is a
    /// configuration bug, not a runtime condition.
    pub fn generate<R: Rng>(rng: &mut R, range: RangeInclusive<u32>) -> Self {
        // width in u64: 0..=u32::MAX would overflow a u32 count
        let width = u64::from(*range.end()) - u64::from(*range.start()) + 1;
        assert!(
            width >= 8,
            "identifier range must hold at least 8 distinct values"
        );

        let mut taken: Vec<u32> = Vec::with_capacity(8);
        let mut next = |rng: &mut R| loop {
            let value = rng.gen_range(range.clone());
            if !taken.contains(&value) {
                taken.push(value);
                return value;
            }
        };

        Self {
            signature: next(rng),
            signed_properties: next(rng),
            signed_properties_id: next(rng),
            signed_info: next(rng),
            certificate: next(rng),
            reference_id: next(rng),
            signature_value: next(rng),
            object: next(rng),
        }
    }

    /// Generate from OS entropy.
    pub fn from_entropy(range: RangeInclusive<u32>) -> Self {
        Self::generate(&mut StdRng::from_entropy(), range)
    }

    /// Generate reproducibly from a seed.
    pub fn from_seed(seed: u64, range: RangeInclusive<u32>) -> Self {
        Self::generate(&mut StdRng::seed_from_u64(seed), range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl IdentifierBatch {
        fn as_array(&self) -> [u32; 8] {
            [
                self.signature,
                self.signed_properties,
                self.signed_properties_id,
                self.signed_info,
                self.certificate,
                self.reference_id,
                self.signature_value,
                self.object,
            ]
        }
    }

    #[test]
    fn test_values_in_range_and_distinct() {
        for seed in 0..50 {
            let batch = IdentifierBatch::from_seed(seed, DEFAULT_ID_RANGE);
            let values = batch.as_array();
            assert!(values.iter().all(|v| DEFAULT_ID_RANGE.contains(v)));
            for i in 0..values.len() {
                for j in (i + 1)..values.len() {
                    assert_ne!(values[i], values[j], "seed {seed}: duplicate identifier");
                }
            }
        }
    }

    #[test]
    fn test_seed_reproducibility() {
        let a = IdentifierBatch::from_seed(7, DEFAULT_ID_RANGE);
        let b = IdentifierBatch::from_seed(7, DEFAULT_ID_RANGE);
        assert_eq!(a, b);

        let c = IdentifierBatch::from_seed(8, DEFAULT_ID_RANGE);
        assert_ne!(a, c);
    }

    #[test]
    fn test_tight_range_still_distinct() {
        // exactly eight candidates forces a full permutation
        let batch = IdentifierBatch::from_seed(1, 10..=17);
        let mut values = batch.as_array();
        values.sort_unstable();
        assert_eq!(values, [10, 11, 12, 13, 14, 15, 16, 17]);
    }

    #[test]
    fn test_full_u32_range_does_not_overflow() {
        let batch = IdentifierBatch::from_seed(3, 0..=u32::MAX);
        let values = batch.as_array();
        for i in 0..values.len() {
            for j in (i + 1)..values.len() {
                assert_ne!(values[i], values[j]);
            }
        }
    }

    #[test]
    #[should_panic(expected = "at least 8 distinct values")]
    fn test_range_too_small_panics() {
        let _ = IdentifierBatch::from_seed(1, 10..=14);
    }
}

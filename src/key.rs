//! Lookup key encoding
//!
//! A [`LookupKey`] is the fixed-order boolean vector used to match a selection
//! against the precomputed performance table: all training flags in subset
//! order, then all testing flags in subset order. Encoding is pure and
//! order-stable, so keys compare equal across calls and process restarts.

use crate::selection::SubsetSelection;
use std::fmt;

/// Canonical 2×N flag vector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    bits: Vec<bool>,
}

impl LookupKey {
    /// Assemble a key from separate training and testing flag lists
    ///
    /// Both lists must have the same length (one entry per subset).
    pub fn from_parts(training: &[bool], testing: &[bool]) -> Self {
        debug_assert_eq!(training.len(), testing.len());
        let mut bits = Vec::with_capacity(training.len() + testing.len());
        bits.extend_from_slice(training);
        bits.extend_from_slice(testing);
        Self { bits }
    }

    /// Number of subsets the key describes
    pub fn subset_count(&self) -> usize {
        self.bits.len() / 2
    }

    /// Raw flags, training half first
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn training(&self) -> &[bool] {
        &self.bits[..self.subset_count()]
    }

    pub fn testing(&self) -> &[bool] {
        &self.bits[self.subset_count()..]
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &bit in self.training() {
            write!(f, "{}", u8::from(bit))?;
        }
        write!(f, "|")?;
        for &bit in self.testing() {
            write!(f, "{}", u8::from(bit))?;
        }
        Ok(())
    }
}

/// Encode a selection into its lookup key
///
/// # Example
/// ```
/// use subset_lab::key::encode;
/// use subset_lab::selection::SubsetSelection;
///
/// let selection = SubsetSelection::from_assignments(4, &[1, 2], &[3]).unwrap();
/// assert_eq!(encode(&selection).to_string(), "1100|0010");
/// ```
pub fn encode(selection: &SubsetSelection) -> LookupKey {
    let flags = selection.raw_flags();
    let training: Vec<bool> = flags.iter().map(|f| f.training).collect();
    let testing: Vec<bool> = flags.iter().map(|f| f.testing).collect();
    LookupKey::from_parts(&training, &testing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::{Role, SubsetId};
    use proptest::prelude::*;

    #[test]
    fn test_training_half_precedes_testing_half() {
        let selection = SubsetSelection::from_assignments(4, &[4], &[1]).unwrap();
        let key = encode(&selection);

        assert_eq!(
            key.bits(),
            &[false, false, false, true, true, false, false, false]
        );
        assert_eq!(key.subset_count(), 4);
        assert_eq!(key.to_string(), "0001|1000");
    }

    #[test]
    fn test_path_independence() {
        // Reach the same flags through different toggle orders
        let mut a = SubsetSelection::new(4);
        a.toggle(SubsetId::new(1).unwrap(), Role::Training).unwrap();
        a.toggle(SubsetId::new(3).unwrap(), Role::Testing).unwrap();

        let mut b = SubsetSelection::new(4);
        b.toggle(SubsetId::new(3).unwrap(), Role::Testing).unwrap();
        b.toggle(SubsetId::new(2).unwrap(), Role::Training).unwrap();
        b.toggle(SubsetId::new(1).unwrap(), Role::Training).unwrap();
        b.toggle(SubsetId::new(2).unwrap(), Role::Training).unwrap();

        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn test_empty_selection_encodes_empty_key() {
        let key = encode(&SubsetSelection::new(0));
        assert_eq!(key.subset_count(), 0);
        assert_eq!(key.to_string(), "|");
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(
            flags in prop::collection::vec((any::<bool>(), any::<bool>()), 1..8)
        ) {
            let build = || {
                SubsetSelection::from_flags(
                    flags
                        .iter()
                        .map(|&(training, testing)| crate::selection::SubsetFlags { training, testing })
                        .collect(),
                )
            };
            let key_a = encode(&build());
            let key_b = encode(&build());

            prop_assert_eq!(&key_a, &key_b);
            prop_assert_eq!(key_a.bits().len(), flags.len() * 2);
            for (i, &(training, testing)) in flags.iter().enumerate() {
                prop_assert_eq!(key_a.training()[i], training);
                prop_assert_eq!(key_a.testing()[i], testing);
            }
        }
    }
}

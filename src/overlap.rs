//! Overlap classification
//!
//! A selection *overlaps* when some subset is used for both training and
//! testing. The comparison view also needs a "non-overlapping" group, but
//! that group is its own predicate (some subset is missing at least one of
//! the two roles), not the negation of the first one. The two groups are
//! filtered independently from the population, so one observation can land
//! in both groups, or in neither:
//!
//! | selection                            | overlapping | non-overlapping |
//! |--------------------------------------|-------------|-----------------|
//! | 1: train+test, 2: train              | yes         | yes             |
//! | every subset train+test              | yes         | no              |
//! | 1: train, 2: test                    | no          | yes             |
//! | no subsets recorded                  | no          | no              |
//!
//! This double filter is kept as-is; charts label the groups by predicate,
//! not as a partition.

use crate::observation::ErrorObservation;
use crate::selection::SubsetSelection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Some subset is in both training and testing
pub fn is_overlapping(selection: &SubsetSelection) -> bool {
    selection.iter().any(|(_, f)| f.training && f.testing)
}

/// Some subset lacks training or lacks testing
pub fn is_non_overlapping(selection: &SubsetSelection) -> bool {
    selection.iter().any(|(_, f)| !f.training || !f.testing)
}

/// The two comparison groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapGroup {
    Overlapping,
    NonOverlapping,
}

impl OverlapGroup {
    pub const ALL: [OverlapGroup; 2] = [OverlapGroup::NonOverlapping, OverlapGroup::Overlapping];

    /// Membership test for this group
    pub fn matches(self, selection: &SubsetSelection) -> bool {
        match self {
            OverlapGroup::Overlapping => is_overlapping(selection),
            OverlapGroup::NonOverlapping => is_non_overlapping(selection),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OverlapGroup::Overlapping => "Overlapping Data",
            OverlapGroup::NonOverlapping => "Non-overlapping Data",
        }
    }
}

impl fmt::Display for OverlapGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error values of the population, filtered once per group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedErrors {
    pub overlapping: Vec<f64>,
    pub non_overlapping: Vec<f64>,
}

impl GroupedErrors {
    /// Run both filters over `observations`
    pub fn from_observations(observations: &[ErrorObservation]) -> Self {
        let collect = |group: OverlapGroup| -> Vec<f64> {
            observations
                .iter()
                .filter(|o| group.matches(&o.selected_subsets))
                .map(|o| o.error_in_accuracy)
                .collect()
        };

        Self {
            overlapping: collect(OverlapGroup::Overlapping),
            non_overlapping: collect(OverlapGroup::NonOverlapping),
        }
    }

    pub fn get(&self, group: OverlapGroup) -> &[f64] {
        match group {
            OverlapGroup::Overlapping => &self.overlapping,
            OverlapGroup::NonOverlapping => &self.non_overlapping,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SubsetFlags;
    use proptest::prelude::*;

    fn selection(flags: &[(bool, bool)]) -> SubsetSelection {
        SubsetSelection::from_flags(
            flags
                .iter()
                .map(|&(training, testing)| SubsetFlags { training, testing })
                .collect(),
        )
    }

    #[test]
    fn test_partial_overlap_satisfies_both_predicates() {
        // Subset 1 fully overlapping, subset 2 training only
        let s = selection(&[(true, true), (true, false)]);
        assert!(is_overlapping(&s));
        assert!(is_non_overlapping(&s));
    }

    #[test]
    fn test_full_overlap_is_only_overlapping() {
        let s = selection(&[(true, true); 4]);
        assert!(is_overlapping(&s));
        assert!(!is_non_overlapping(&s));
    }

    #[test]
    fn test_disjoint_split_is_only_non_overlapping() {
        let s = selection(&[(true, false), (true, false), (false, true), (false, false)]);
        assert!(!is_overlapping(&s));
        assert!(is_non_overlapping(&s));
    }

    #[test]
    fn test_empty_selection_is_in_neither_group() {
        let s = SubsetSelection::new(0);
        assert!(!is_overlapping(&s));
        assert!(!is_non_overlapping(&s));
    }

    #[test]
    fn test_grouped_errors_are_not_a_partition() {
        let obs = |flags: &[(bool, bool)], predicted: f64| {
            ErrorObservation::new(predicted, 50.0, selection(flags), "2025-03-01T10:00:00.000Z")
        };
        let population = vec![
            obs(&[(true, true), (true, false)], 60.0), // both
            obs(&[(true, true), (true, true)], 55.0),  // overlapping only
            obs(&[(true, false), (false, true)], 45.0), // non-overlapping only
            ErrorObservation::new(70.0, 50.0, SubsetSelection::new(0), "t"), // neither
        ];

        let grouped = GroupedErrors::from_observations(&population);
        assert_eq!(grouped.overlapping, vec![10.0, 5.0]);
        assert_eq!(grouped.non_overlapping, vec![10.0, -5.0]);
        assert_eq!(grouped.get(OverlapGroup::Overlapping).len(), 2);
    }

    proptest! {
        #[test]
        fn prop_predicates_match_definitions(
            flags in prop::collection::vec((any::<bool>(), any::<bool>()), 0..8)
        ) {
            let s = selection(&flags);
            let any_both = flags.iter().any(|&(t, e)| t && e);
            let any_missing = flags.iter().any(|&(t, e)| !t || !e);

            prop_assert_eq!(is_overlapping(&s), any_both);
            prop_assert_eq!(is_non_overlapping(&s), any_missing);
            prop_assert_eq!(OverlapGroup::Overlapping.matches(&s), any_both);
        }
    }
}

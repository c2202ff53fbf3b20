//! Error population analysis
//!
//! Summaries of the two overlap groups, a significance test between them,
//! and the user's standing within the population.

mod statistics;

pub use statistics::{compare_groups, summarize, GroupComparison, GroupSummary, DEFAULT_ALPHA};

use crate::overlap::GroupedErrors;
use serde::Serialize;

/// Fraction of the population whose absolute error is strictly larger
///
/// `None` for an empty population. A user with error `0.0` "beats" everyone
/// who missed at all; ties never count.
///
/// # Example
/// ```
/// use subset_lab::analysis::standing;
///
/// let population = [-10.0, 2.0, 5.0, 20.0];
/// assert_eq!(standing(&population, 4.0), Some(0.75));
/// assert_eq!(standing(&population, -20.0), Some(0.0));
/// assert_eq!(standing(&[], 1.0), None);
/// ```
pub fn standing(population: &[f64], error: f64) -> Option<f64> {
    if population.is_empty() {
        return None;
    }
    let magnitude = error.abs();
    let beaten = population.iter().filter(|e| e.abs() > magnitude).count();
    Some(beaten as f64 / population.len() as f64)
}

/// Everything the comparison view reports about a population
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PopulationAnalysis {
    pub overlapping: Option<GroupSummary>,
    pub non_overlapping: Option<GroupSummary>,
    pub comparison: Option<GroupComparison>,
}

/// Summarize both groups and compare them where the data allows
///
/// Groups too small to summarize or test are reported as `None`.
pub fn analyze(grouped: &GroupedErrors, alpha: f64) -> PopulationAnalysis {
    let summary = |errors: &[f64]| {
        summarize(errors)
            .map_err(|e| tracing::debug!("No summary: {}", e))
            .ok()
    };

    let comparison = compare_groups(&grouped.overlapping, &grouped.non_overlapping, alpha)
        .map_err(|e| tracing::debug!("No group comparison: {}", e))
        .ok();

    PopulationAnalysis {
        overlapping: summary(&grouped.overlapping),
        non_overlapping: summary(&grouped.non_overlapping),
        comparison,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing_counts_strictly_larger() {
        let population = vec![-5.0, 5.0, 10.0, 1.0];
        // |5| ties do not count
        assert_eq!(standing(&population, -5.0), Some(0.25));
        assert_eq!(standing(&population, 0.0), Some(1.0));
    }

    #[test]
    fn test_analyze_small_groups() {
        let grouped = GroupedErrors {
            overlapping: vec![12.0],
            non_overlapping: vec![],
        };
        let analysis = analyze(&grouped, DEFAULT_ALPHA);
        assert_eq!(analysis.overlapping.as_ref().map(|s| s.count), Some(1));
        assert!(analysis.non_overlapping.is_none());
        assert!(analysis.comparison.is_none());
    }

    #[test]
    fn test_analyze_full_groups() {
        let grouped = GroupedErrors {
            overlapping: vec![18.0, 22.0, 20.0, 25.0],
            non_overlapping: vec![-2.0, 1.0, 0.5, -1.0],
        };
        let analysis = analyze(&grouped, DEFAULT_ALPHA);
        assert!(analysis.comparison.is_some_and(|c| c.significant));
        assert_eq!(analysis.non_overlapping.map(|s| s.count), Some(4));
    }
}

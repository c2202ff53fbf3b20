// Frequency counting over shared bin edges

use super::binning::{BinEdges, Binning};
use crate::observation::ErrorObservation;
use crate::overlap::{GroupedErrors, OverlapGroup};
use serde::Serialize;

/// One bin of an error distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub lower_bound: f64,
    pub count: u64,
}

/// Frequency distribution of error values
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Histogram {
    pub bins: Vec<Bin>,
    /// Values that fell outside every bin (or were not finite)
    pub dropped: usize,
}

impl Histogram {
    /// Count `values` into `edges`
    pub fn with_edges(values: &[f64], edges: &BinEdges) -> Self {
        let mut counts = vec![0u64; edges.count()];
        let mut dropped = 0;

        for &value in values {
            match edges.bin_index(value) {
                Some(index) => counts[index] += 1,
                None => dropped += 1,
            }
        }

        let non_finite = values.iter().filter(|v| !v.is_finite()).count();
        if non_finite > 0 {
            tracing::warn!("Skipped {} non-finite error values", non_finite);
        }
        if dropped > non_finite {
            tracing::debug!("Dropped {} values outside the bin range", dropped - non_finite);
        }

        Self {
            bins: counts
                .into_iter()
                .enumerate()
                .map(|(i, count)| Bin {
                    lower_bound: edges.lower_bound(i),
                    count,
                })
                .collect(),
            dropped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn counts(&self) -> Vec<u64> {
        self.bins.iter().map(|b| b.count).collect()
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.lower_bound).collect()
    }

    /// Number of values that landed in a bin
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }

    pub fn max_count(&self) -> u64 {
        self.bins.iter().map(|b| b.count).max().unwrap_or(0)
    }
}

/// Bin `values` under `binning`
///
/// Empty input (or input without a finite value) gives an empty histogram.
///
/// # Example
/// ```
/// use subset_lab::histogram::{aggregate, Binning};
///
/// let histogram = aggregate(&[-35.0, -35.0, 34.9, 100.0], &Binning::default());
/// assert_eq!(histogram.bins[0].count, 2);
/// assert_eq!(histogram.bins[23].count, 1);
/// assert_eq!(histogram.dropped, 1);
/// assert!(aggregate(&[], &Binning::default()).is_empty());
/// ```
pub fn aggregate(values: &[f64], binning: &Binning) -> Histogram {
    match binning.edges(values) {
        Some(edges) => Histogram::with_edges(values, &edges),
        None => Histogram {
            bins: Vec::new(),
            dropped: values.len(),
        },
    }
}

/// The two comparison histograms, binned on the same edges
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupedHistogram {
    pub overlapping: Histogram,
    pub non_overlapping: Histogram,
}

impl GroupedHistogram {
    pub fn get(&self, group: OverlapGroup) -> &Histogram {
        match group {
            OverlapGroup::Overlapping => &self.overlapping,
            OverlapGroup::NonOverlapping => &self.non_overlapping,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overlapping.is_empty() && self.non_overlapping.is_empty()
    }

    /// Lower bounds shared by both groups
    pub fn lower_bounds(&self) -> Vec<f64> {
        self.overlapping.lower_bounds()
    }
}

/// Partition `population` with the overlap predicates, then bin both groups
///
/// Data-driven edges come from the whole population (not from either group)
/// so both histograms line up bin for bin.
pub fn aggregate_grouped(population: &[ErrorObservation], binning: &Binning) -> GroupedHistogram {
    let all: Vec<f64> = population.iter().map(|o| o.error_in_accuracy).collect();
    let grouped = GroupedErrors::from_observations(population);
    aggregate_partitioned(&all, &grouped, binning)
}

/// Bin pre-partitioned groups on edges derived from `all`
pub fn aggregate_partitioned(all: &[f64], grouped: &GroupedErrors, binning: &Binning) -> GroupedHistogram {
    let Some(edges) = binning.edges(all) else {
        return GroupedHistogram {
            overlapping: Histogram {
                bins: Vec::new(),
                dropped: grouped.overlapping.len(),
            },
            non_overlapping: Histogram {
                bins: Vec::new(),
                dropped: grouped.non_overlapping.len(),
            },
        };
    };

    tracing::debug!(
        "Binning {} overlapping and {} non-overlapping errors into {} bins of width {}",
        grouped.overlapping.len(),
        grouped.non_overlapping.len(),
        edges.count(),
        edges.width()
    );

    GroupedHistogram {
        overlapping: Histogram::with_edges(&grouped.overlapping, &edges),
        non_overlapping: Histogram::with_edges(&grouped.non_overlapping, &edges),
    }
}

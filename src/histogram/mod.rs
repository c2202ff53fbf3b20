// Error distribution histograms
//
// Bins a population of prediction errors into (lower_bound, count) pairs.
// Two layouts are supported (see `binning`): a fixed 27-bin chart over
// [-35, 35] with width 3, and a data-driven layout splitting [min, max] into
// a configurable number of bins.
//
// The comparison view partitions the population with the overlap predicates
// first and bins both groups on the same edges, so the two histograms can be
// drawn side by side. Histograms are derived on demand and never persisted.

mod aggregate;
mod binning;

pub use aggregate::{aggregate, aggregate_grouped, aggregate_partitioned, Bin, GroupedHistogram, Histogram};
pub use binning::{BinEdges, Binning, DataDrivenBins, FixedBins};

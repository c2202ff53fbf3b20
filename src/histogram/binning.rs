// Bin boundary policies
//
// Two policies are supported:
//
// - Fixed: constant origin and width, constant bin count. A value lands in
//   bin floor((v - lower) / width); indices outside [0, bins) are dropped
//   silently. The default (-35, width 3, 27 bins) is the lesson chart's
//   layout. Note the last bins reach past `upper`; `upper` only bounds the
//   chart axis.
//
// - Data-driven: domain [min, max] of the data, split into `bins` equal
//   widths. Bins are half-open [lo, lo + width) except the last one, which
//   also holds `max`, so floating-point width never loses the maximum.

use serde::{Deserialize, Serialize};

/// Fixed-range layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedBins {
    /// Lower edge of bin 0
    pub lower: f64,
    /// Upper end of the chart axis
    pub upper: f64,
    /// Bin width
    pub width: f64,
    /// Number of bins
    pub bins: usize,
}

impl Default for FixedBins {
    fn default() -> Self {
        Self {
            lower: -35.0,
            upper: 35.0,
            width: 3.0,
            bins: 27,
        }
    }
}

/// Layout derived from the data's own range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataDrivenBins {
    pub bins: usize,
}

impl Default for DataDrivenBins {
    fn default() -> Self {
        Self { bins: 20 }
    }
}

/// Binning policy
///
/// # Example
/// ```
/// use subset_lab::histogram::Binning;
///
/// let edges = Binning::default().edges(&[0.0]).unwrap();
/// assert_eq!(edges.bin_index(-35.0), Some(0));
/// assert_eq!(edges.bin_index(-32.0), Some(1));
/// assert_eq!(edges.bin_index(34.0), Some(23));
/// assert_eq!(edges.bin_index(100.0), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum Binning {
    Fixed(FixedBins),
    DataDriven(DataDrivenBins),
}

impl Default for Binning {
    fn default() -> Self {
        Binning::Fixed(FixedBins::default())
    }
}

impl Binning {
    pub fn data_driven(bins: usize) -> Self {
        Binning::DataDriven(DataDrivenBins { bins })
    }

    /// Validate layout parameters
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Binning::Fixed(fixed) => {
                if !(fixed.width.is_finite() && fixed.width > 0.0) {
                    return Err(format!("bin width must be positive, got {}", fixed.width));
                }
                if fixed.bins == 0 {
                    return Err("fixed layout needs at least one bin".to_string());
                }
                if !(fixed.lower.is_finite() && fixed.upper.is_finite()) || fixed.lower >= fixed.upper {
                    return Err(format!(
                        "fixed range must satisfy lower < upper, got [{}, {}]",
                        fixed.lower, fixed.upper
                    ));
                }
            }
            Binning::DataDriven(data) => {
                if data.bins == 0 {
                    return Err("data-driven layout needs at least one bin".to_string());
                }
            }
        }
        Ok(())
    }

    /// Bin boundaries for `values`
    ///
    /// `None` when there is nothing to bin (no finite values), which callers
    /// render as an empty histogram.
    pub fn edges(&self, values: &[f64]) -> Option<BinEdges> {
        let mut finite = values.iter().copied().filter(|v| v.is_finite());
        let first = finite.next()?;

        match self {
            Binning::Fixed(fixed) => Some(BinEdges {
                lower: fixed.lower,
                upper: fixed.lower + fixed.width * fixed.bins as f64,
                width: fixed.width,
                count: fixed.bins,
                policy: EdgePolicy::DropOutside,
            }),
            Binning::DataDriven(data) => {
                let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
                if min == max {
                    tracing::debug!("All values equal {}, using a single zero-width bin", min);
                    return Some(BinEdges {
                        lower: min,
                        upper: max,
                        width: 0.0,
                        count: 1,
                        policy: EdgePolicy::LastInclusive,
                    });
                }
                let count = data.bins.max(1);
                Some(BinEdges {
                    lower: min,
                    upper: max,
                    width: (max - min) / count as f64,
                    count,
                    policy: EdgePolicy::LastInclusive,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgePolicy {
    /// floor index, anything outside [0, count) dropped
    DropOutside,
    /// half-open bins, last bin closed at `upper`
    LastInclusive,
}

/// Concrete bin boundaries shared by every histogram built from them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinEdges {
    lower: f64,
    upper: f64,
    width: f64,
    count: usize,
    policy: EdgePolicy,
}

impl BinEdges {
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Lower edge of bin 0
    pub fn min(&self) -> f64 {
        self.lower
    }

    /// Upper edge of the last bin
    pub fn max(&self) -> f64 {
        self.upper
    }

    pub fn lower_bound(&self, index: usize) -> f64 {
        self.lower + index as f64 * self.width
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        (0..self.count).map(|i| self.lower_bound(i)).collect()
    }

    /// Bin for `value`, `None` when it falls outside the layout
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        match self.policy {
            EdgePolicy::DropOutside => {
                let index = ((value - self.lower) / self.width).floor();
                if index >= 0.0 && index < self.count as f64 {
                    Some(index as usize)
                } else {
                    None
                }
            }
            EdgePolicy::LastInclusive => {
                if value < self.lower || value > self.upper {
                    return None;
                }
                if self.width == 0.0 {
                    return Some(0);
                }
                let last = self.count - 1;
                let mut index = (((value - self.lower) / self.width).floor() as usize).min(last);
                // Settle against the reported edges, not the division
                if index > 0 && value < self.lower_bound(index) {
                    index -= 1;
                } else if index < last && value >= self.lower_bound(index + 1) {
                    index += 1;
                }
                Some(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_defaults() {
        let binning = Binning::default();
        assert!(binning.validate().is_ok());

        let edges = binning.edges(&[1.0]).unwrap();
        assert_eq!(edges.count(), 27);
        assert_eq!(edges.width(), 3.0);
        assert_eq!(edges.lower_bound(0), -35.0);
        assert_eq!(edges.lower_bound(26), 43.0);
    }

    #[test]
    fn test_fixed_bin_index() {
        let edges = Binning::default().edges(&[0.0]).unwrap();
        assert_eq!(edges.bin_index(-35.0), Some(0));
        assert_eq!(edges.bin_index(-32.0), Some(1));
        assert_eq!(edges.bin_index(34.0), Some(23));
        assert_eq!(edges.bin_index(34.9), Some(23));
        assert_eq!(edges.bin_index(35.0), Some(23));
        assert_eq!(edges.bin_index(45.9), Some(26));
        assert_eq!(edges.bin_index(46.0), None);
        assert_eq!(edges.bin_index(-35.01), None);
        assert_eq!(edges.bin_index(f64::NAN), None);
    }

    #[test]
    fn test_data_driven_edges() {
        let values: Vec<f64> = (0..20).map(f64::from).collect();
        let edges = Binning::data_driven(20).edges(&values).unwrap();

        assert_eq!(edges.min(), 0.0);
        assert_eq!(edges.max(), 19.0);
        assert!((edges.width() - 0.95).abs() < 1e-12);
        assert_eq!(edges.count(), 20);
    }

    #[test]
    fn test_data_driven_max_lands_in_last_bin() {
        let edges = Binning::data_driven(3).edges(&[0.0, 0.3]).unwrap();
        // 0.3 / 3 = 0.09999999999999999
        assert_eq!(edges.bin_index(0.3), Some(2));
        assert_eq!(edges.bin_index(0.0), Some(0));
        assert_eq!(edges.bin_index(0.31), None);
        assert_eq!(edges.bin_index(-0.01), None);
    }

    #[test]
    fn test_data_driven_half_open_bins() {
        let edges = Binning::data_driven(4).edges(&[0.0, 4.0]).unwrap();
        assert_eq!(edges.bin_index(1.0), Some(1));
        assert_eq!(edges.bin_index(0.999), Some(0));
        assert_eq!(edges.bin_index(3.0), Some(3));
        assert_eq!(edges.bin_index(4.0), Some(3));
    }

    #[test]
    fn test_data_driven_constant_values() {
        let edges = Binning::data_driven(20).edges(&[5.0, 5.0]).unwrap();
        assert_eq!(edges.count(), 1);
        assert_eq!(edges.bin_index(5.0), Some(0));
        assert_eq!(edges.bin_index(5.1), None);
    }

    #[test]
    fn test_no_finite_values_means_no_edges() {
        assert!(Binning::default().edges(&[]).is_none());
        assert!(Binning::data_driven(20).edges(&[f64::NAN]).is_none());
    }

    #[test]
    fn test_validate_rejects_bad_layouts() {
        let bad_width = Binning::Fixed(FixedBins {
            width: 0.0,
            ..FixedBins::default()
        });
        assert!(bad_width.validate().is_err());

        let bad_range = Binning::Fixed(FixedBins {
            lower: 10.0,
            upper: -10.0,
            ..FixedBins::default()
        });
        assert!(bad_range.validate().is_err());

        assert!(Binning::data_driven(0).validate().is_err());
    }

    #[test]
    fn test_serde_mode_tag() {
        let binning: Binning = toml::from_str("mode = \"data-driven\"\nbins = 12\n").unwrap();
        assert_eq!(binning, Binning::data_driven(12));

        let fixed: Binning = toml::from_str("mode = \"fixed\"\n").unwrap();
        assert_eq!(fixed, Binning::default());
    }
}

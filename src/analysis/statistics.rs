// Group statistics for prediction errors
//
// Wraps trueno vector reductions and aprender's descriptive statistics and
// hypothesis tests:
// - trueno::Vector for mean, stddev, min, max
// - aprender::stats::DescriptiveStats for the median (quantile 0.5)
// - aprender::stats::hypothesis::ttest_ind (Welch variant) to ask whether
//   the overlapping group's errors differ from the non-overlapping group's
//
// Errors are stored as f64 percentages; the vector libraries work in f32,
// which is plenty for two-decimal values in [-30, 30].

use anyhow::{Context, Result};
use aprender::stats::DescriptiveStats;
use serde::Serialize;
use trueno::Vector;

/// Descriptive statistics of one group of errors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub stddev: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Summarize a group of errors
///
/// # Errors
/// Fails on an empty group.
pub fn summarize(errors: &[f64]) -> Result<GroupSummary> {
    if errors.is_empty() {
        anyhow::bail!("Cannot summarize an empty group");
    }

    let values = to_f32(errors);
    let v = Vector::from_slice(&values);

    let mean = v.mean().context("Failed to compute mean")?;
    let stddev = v.stddev().context("Failed to compute standard deviation")?;
    let min = v.min().context("Failed to compute minimum")?;
    let max = v.max().context("Failed to compute maximum")?;
    let median = DescriptiveStats::new(&v)
        .quantile(0.5)
        .map_err(|e| anyhow::anyhow!("Failed to compute median: {}", e))?;

    Ok(GroupSummary {
        count: errors.len(),
        mean: f64::from(mean),
        stddev: f64::from(stddev),
        median: f64::from(median),
        min: f64::from(min),
        max: f64::from(max),
    })
}

/// Outcome of Welch's t-test between the two groups
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupComparison {
    /// t-statistic (overlapping minus non-overlapping)
    pub statistic: f64,
    /// Two-tailed p-value
    pub pvalue: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub df: f64,
    pub alpha: f64,
    /// `pvalue < alpha`
    pub significant: bool,
}

/// Default significance level
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Compare the overlapping group's errors with the non-overlapping group's
///
/// # Errors
/// Needs at least 2 samples per group.
///
/// # Example
/// ```
/// use subset_lab::analysis::compare_groups;
///
/// let overlapping = [18.0, 22.0, 20.0, 25.0, 19.0];
/// let non_overlapping = [-2.0, 1.0, 0.5, -1.0, 2.0];
/// let result = compare_groups(&overlapping, &non_overlapping, 0.05).unwrap();
/// assert!(result.significant);
/// ```
pub fn compare_groups(overlapping: &[f64], non_overlapping: &[f64], alpha: f64) -> Result<GroupComparison> {
    if overlapping.len() < 2 || non_overlapping.len() < 2 {
        anyhow::bail!(
            "Need at least 2 samples per group for t-test (got {} overlapping, {} non-overlapping)",
            overlapping.len(),
            non_overlapping.len()
        );
    }

    let a = to_f32(overlapping);
    let b = to_f32(non_overlapping);
    let ttest = aprender::stats::hypothesis::ttest_ind(&a, &b, false).context("Failed to compute t-test")?;

    let pvalue = f64::from(ttest.pvalue);
    Ok(GroupComparison {
        statistic: f64::from(ttest.statistic),
        pvalue,
        df: f64::from(ttest.df),
        alpha,
        significant: pvalue < alpha,
    })
}

fn to_f32(values: &[f64]) -> Vec<f32> {
    values.iter().map(|&v| v as f32).collect()
}

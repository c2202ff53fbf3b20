//! Prediction error observations
//!
//! One observation is produced per completed prediction round and appended
//! to the record store. The sign convention is fixed: `error_in_accuracy` is
//! always `predicted - actual`, rounded to two decimals.

use crate::selection::SubsetSelection;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Signed prediction error (`predicted - actual`, two decimals)
///
/// # Example
/// ```
/// use subset_lab::observation::prediction_error;
///
/// assert_eq!(prediction_error(72.0, 65.43), 6.57);
/// assert_eq!(prediction_error(50.0, 80.0), -30.0);
/// ```
pub fn prediction_error(predicted: f64, actual: f64) -> f64 {
    round2(predicted - actual)
}

/// Current UTC time as ISO-8601 with millisecond precision
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single user's prediction against the actual out-of-sample performance
///
/// Field names are the record store's wire names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObservation {
    /// User's guess, percent (0-100)
    pub predicted_performance: f64,
    /// Out-of-sample performance, percent (0-100)
    pub actual_performance: f64,
    /// `predicted - actual`, two decimals
    pub error_in_accuracy: f64,
    /// ISO-8601 creation time
    pub timestamp: String,
    /// Selection the round was played with
    pub selected_subsets: SubsetSelection,
}

impl ErrorObservation {
    /// Build an observation with an explicit timestamp
    pub fn new(
        predicted: f64,
        actual: f64,
        selection: SubsetSelection,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            predicted_performance: predicted,
            actual_performance: actual,
            error_in_accuracy: prediction_error(predicted, actual),
            timestamp: timestamp.into(),
            selected_subsets: selection,
        }
    }

    /// Build an observation stamped with the current time
    pub fn now(predicted: f64, actual: f64, selection: SubsetSelection) -> Self {
        Self::new(predicted, actual, selection, timestamp_now())
    }
}

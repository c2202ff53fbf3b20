// Append-only record store for error observations
//
// The store is an external collaborator reached through a two-call contract:
// append one observation, query a bounded snapshot. Every backend applies
// the same `ObservationQuery` (error range filter, newest first, limit) and
// strips whatever identifier it assigns internally before handing records
// back.
//
// Backends:
// - `MemoryStore`: in-process, for tests and single-run sessions
// - `JsonlStore`: append-only JSON-lines file
// - `HttpStore`: the hosted lesson endpoints (`/api/saveUserData`,
//   `/api/getAllUserErrors`)

mod http;
mod jsonl;
mod memory;

pub use http::HttpStore;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;

use crate::observation::ErrorObservation;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Errors raised by record store backends
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record store transport error: {0}")]
    Transport(String),

    #[error("Record store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Record store lock poisoned")]
    Poisoned,
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Server-side filter applied to every query
///
/// # Example
/// ```
/// use subset_lab::store::ObservationQuery;
///
/// let query = ObservationQuery::default();
/// assert_eq!(query.limit, 1000);
/// assert!(query.accepts(30.0));
/// assert!(!query.accepts(30.01));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservationQuery {
    /// Maximum number of observations returned
    pub limit: usize,
    /// Inclusive lower bound on `error_in_accuracy`
    pub min_error: f64,
    /// Inclusive upper bound on `error_in_accuracy`
    pub max_error: f64,
}

impl Default for ObservationQuery {
    fn default() -> Self {
        Self {
            limit: 1000,
            min_error: -30.0,
            max_error: 30.0,
        }
    }
}

impl ObservationQuery {
    /// True when an error value passes the range filter
    pub fn accepts(&self, error: f64) -> bool {
        error >= self.min_error && error <= self.max_error
    }

    /// Filter, sort newest first and truncate
    pub fn apply<I>(&self, observations: I) -> Vec<ErrorObservation>
    where
        I: IntoIterator<Item = ErrorObservation>,
    {
        let mut selected: Vec<ErrorObservation> = observations
            .into_iter()
            .filter(|o| self.accepts(o.error_in_accuracy))
            .collect();
        // Stable sort keeps append order among equal timestamps
        selected.sort_by(|a, b| newest_first(&a.timestamp, &b.timestamp));
        selected.truncate(self.limit);
        selected
    }
}

/// Descending timestamp order
///
/// RFC 3339 stamps are compared as instants and sort ahead of anything
/// unparseable, which falls back to string order.
fn newest_first(a: &str, b: &str) -> Ordering {
    sort_key(b).cmp(&sort_key(a))
}

fn sort_key(timestamp: &str) -> (bool, i64, &str) {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(instant) => (true, instant.timestamp_micros(), timestamp),
        Err(_) => (false, 0, timestamp),
    }
}

/// Append/query contract of the external record store
///
/// Implementations must be shareable across threads: appends run on a
/// background thread while the caller keeps querying.
pub trait RecordStore: Send + Sync {
    /// Append one observation (at most once, no retry)
    fn append(&self, observation: &ErrorObservation) -> Result<()>;

    /// Snapshot of stored observations matching `query`, newest first
    fn query(&self, query: &ObservationQuery) -> Result<Vec<ErrorObservation>>;

    /// Short backend name for log lines
    fn name(&self) -> &'static str;
}

/// Stored form with the backend-assigned identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredObservation {
    id: u64,
    #[serde(flatten)]
    observation: ErrorObservation,
}

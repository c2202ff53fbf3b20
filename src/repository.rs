//! Error repository
//!
//! Read side of the record store. Every fetch is an independent snapshot of
//! at most `limit` observations, newest first, with `error_in_accuracy`
//! inside the configured range (default `[-30, 30]`). Out-of-range values
//! never reach the analytics.

use crate::observation::ErrorObservation;
use crate::store::{ObservationQuery, RecordStore, Result};
use std::sync::Arc;

/// Fetches historical observations for analysis
#[derive(Clone)]
pub struct ErrorRepository {
    store: Arc<dyn RecordStore>,
    query: ObservationQuery,
}

impl ErrorRepository {
    pub fn new(store: Arc<dyn RecordStore>, query: ObservationQuery) -> Self {
        Self { store, query }
    }

    pub fn query(&self) -> &ObservationQuery {
        &self.query
    }

    /// Fetch the current population snapshot
    pub fn fetch_all(&self) -> Result<Vec<ErrorObservation>> {
        let observations = self.store.query(&self.query)?;
        tracing::debug!(
            "Fetched {} observations from {} store",
            observations.len(),
            self.store.name()
        );
        Ok(observations)
    }

    /// Fetch the population, degrading to an empty one on failure
    ///
    /// Display code treats "no data yet" and "fetch failed" the same way.
    pub fn fetch_or_empty(&self) -> Vec<ErrorObservation> {
        self.fetch_all().unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch observations from {} store: {}", self.store.name(), e);
            Vec::new()
        })
    }
}

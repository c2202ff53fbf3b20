use super::{ObservationQuery, RecordStore, Result, StoreError, StoredObservation};
use crate::observation::ErrorObservation;
use std::sync::Mutex;

/// In-process record store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<StoredObservation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of appended records, including ones outside any query range
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn append(&self, observation: &ErrorObservation) -> Result<()> {
        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        let id = records.len() as u64 + 1;
        records.push(StoredObservation {
            id,
            observation: observation.clone(),
        });
        Ok(())
    }

    fn query(&self, query: &ObservationQuery) -> Result<Vec<ErrorObservation>> {
        let records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(query.apply(records.iter().map(|r| r.observation.clone())))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

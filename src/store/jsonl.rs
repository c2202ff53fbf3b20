use super::{ObservationQuery, RecordStore, Result, StoreError, StoredObservation};
use crate::observation::ErrorObservation;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only JSON-lines record store
///
/// Each line is one observation plus a sequence `id`:
///
/// ```text
/// {"id":1,"predicted_performance":72.0,"actual_performance":65.43,...}
/// ```
///
/// Lines that fail to parse are skipped on query, so a torn write never
/// hides the rest of the population.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    /// Serializes appends and holds the next id
    next_id: Mutex<u64>,
}

impl JsonlStore {
    /// Open (or lazily create) a store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let existing = if path.exists() {
            let file = fs::File::open(&path)?;
            BufReader::new(file).split(b'\n').count() as u64
        } else {
            0
        };

        Ok(Self {
            path,
            next_id: Mutex::new(existing + 1),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<ErrorObservation>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut observations = Vec::new();
        for (line_no, bytes) in reader.split(b'\n').enumerate() {
            // Invalid UTF-8 is a malformed record, not a read error
            let bytes = bytes?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            match serde_json::from_slice::<StoredObservation>(&bytes) {
                Ok(stored) => observations.push(stored.observation),
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed record at {}:{}: {}",
                        self.path.display(),
                        line_no + 1,
                        e
                    );
                }
            }
        }
        Ok(observations)
    }
}

impl RecordStore for JsonlStore {
    fn append(&self, observation: &ErrorObservation) -> Result<()> {
        let mut next_id = self.next_id.lock().map_err(|_| StoreError::Poisoned)?;

        let stored = StoredObservation {
            id: *next_id,
            observation: observation.clone(),
        };
        let mut line = serde_json::to_string(&stored)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;

        *next_id += 1;
        Ok(())
    }

    fn query(&self, query: &ObservationQuery) -> Result<Vec<ErrorObservation>> {
        Ok(query.apply(self.read_all()?))
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}

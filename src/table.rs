//! Precomputed performance table
//!
//! The table holds one record per realizable subset combination, loaded once
//! from a static JSON source and read-only afterwards. The source keeps the
//! flattened record shape the lesson data has always shipped with:
//!
//! ```json
//! [
//!   {
//!     "training_1": 1, "training_2": 1, "training_3": 0, "training_4": 0,
//!     "testing_1": 0, "testing_2": 0, "testing_3": 1, "testing_4": 0,
//!     "test_performance": 0.71, "out_of_sample_performance": 0.6543
//!   }
//! ]
//! ```
//!
//! Flags may be `0`/`1` or `false`/`true`. Performance values are fractions
//! in `[0, 1]`; lookups report them as percentages rounded to two decimals.
//!
//! A key with no record resolves to a fixed sentinel pair (50% test, 80%
//! out-of-sample) instead of failing, so the lesson keeps moving even with an
//! incomplete table.

use crate::key::LookupKey;
use crate::observation::round2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading a performance table
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to read performance table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid performance table JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Performance table must be a JSON array of objects")]
    NotAnArray,

    #[error("Record {index}: field '{field}' is missing")]
    MissingField { index: usize, field: String },

    #[error("Record {index}: field '{field}' must be 0, 1, true or false")]
    InvalidFlag { index: usize, field: String },

    #[error("Record {index}: field '{field}' must be a number in [0, 1], got {value}")]
    OutOfRange {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Record {index}: expected {expected} subsets, found {found}")]
    SubsetCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Result type for table operations
pub type Result<T> = std::result::Result<T, TableError>;

/// Test/out-of-sample pair in percent (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformancePair {
    pub test_performance: f64,
    pub out_of_sample_performance: f64,
}

impl Default for PerformancePair {
    fn default() -> Self {
        SENTINEL_FALLBACK
    }
}

/// Pair returned when no record matches a key
pub const SENTINEL_FALLBACK: PerformancePair = PerformancePair {
    test_performance: 50.0,
    out_of_sample_performance: 80.0,
};

/// One precomputed result
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRecord {
    pub key: LookupKey,
    /// Fraction in [0, 1]
    pub test_performance: f64,
    /// Fraction in [0, 1]
    pub out_of_sample_performance: f64,
}

impl PerformanceRecord {
    /// Performance as percentages rounded to two decimals
    pub fn percentages(&self) -> PerformancePair {
        PerformancePair {
            test_performance: round2(self.test_performance * 100.0),
            out_of_sample_performance: round2(self.out_of_sample_performance * 100.0),
        }
    }
}

/// Where a lookup result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupSource {
    Matched,
    Fallback,
}

/// Result of a table lookup, never an error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lookup {
    #[serde(flatten)]
    pub performance: PerformancePair,
    pub source: LookupSource,
}

/// Immutable key → performance table
#[derive(Debug, Clone)]
pub struct PerformanceTable {
    records: Vec<PerformanceRecord>,
    /// Key → index of the first record with that key
    index: HashMap<LookupKey, usize>,
    fallback: PerformancePair,
}

impl PerformanceTable {
    /// Build a table from already decoded records
    pub fn from_records(records: Vec<PerformanceRecord>) -> Self {
        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            if let Some(&first) = index.get(&record.key) {
                tracing::warn!(
                    "Duplicate performance record for key {} (records {} and {}), keeping the first",
                    record.key,
                    first,
                    i
                );
                continue;
            }
            index.insert(record.key.clone(), i);
        }

        Self {
            records,
            index,
            fallback: SENTINEL_FALLBACK,
        }
    }

    /// Empty table; every lookup falls back
    pub fn empty() -> Self {
        Self::from_records(Vec::new())
    }

    /// Replace the sentinel pair used on a miss
    pub fn with_fallback(mut self, fallback: PerformancePair) -> Self {
        self.fallback = fallback;
        self
    }

    /// Load a table from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| TableError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        let table = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded {} performance records ({} subsets) from {}",
            table.len(),
            table.subset_count().unwrap_or(0),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Parse a table from JSON text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        let Value::Array(entries) = value else {
            return Err(TableError::NotAnArray);
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut expected_subsets = None;

        for (index, entry) in entries.iter().enumerate() {
            let Value::Object(fields) = entry else {
                return Err(TableError::NotAnArray);
            };

            let found = count_subsets(fields);
            let expected = *expected_subsets.get_or_insert(found);
            if found != expected {
                return Err(TableError::SubsetCountMismatch {
                    index,
                    expected,
                    found,
                });
            }

            records.push(parse_record(index, fields, expected)?);
        }

        Ok(Self::from_records(records))
    }

    /// Exact-match search; `None` is a lookup miss
    pub fn find(&self, key: &LookupKey) -> Option<&PerformanceRecord> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Look up a key, substituting the fallback pair on a miss
    pub fn lookup(&self, key: &LookupKey) -> Lookup {
        match self.find(key) {
            Some(record) => {
                tracing::debug!("Performance lookup hit for key {}", key);
                Lookup {
                    performance: record.percentages(),
                    source: LookupSource::Matched,
                }
            }
            None => {
                tracing::debug!("Performance lookup miss for key {}, using fallback", key);
                Lookup {
                    performance: self.fallback,
                    source: LookupSource::Fallback,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Subset count of the stored keys (`None` for an empty table)
    pub fn subset_count(&self) -> Option<usize> {
        self.records.first().map(|r| r.key.subset_count())
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    pub fn fallback(&self) -> PerformancePair {
        self.fallback
    }
}

fn count_subsets(fields: &Map<String, Value>) -> usize {
    fields
        .keys()
        .filter(|k| {
            k.strip_prefix("training_")
                .is_some_and(|n| n.parse::<usize>().is_ok())
        })
        .count()
}

fn parse_record(
    index: usize,
    fields: &Map<String, Value>,
    subsets: usize,
) -> Result<PerformanceRecord> {
    let flags = |prefix: &str| -> Result<Vec<bool>> {
        (1..=subsets)
            .map(|n| parse_flag(index, fields, &format!("{}_{}", prefix, n)))
            .collect()
    };
    let training = flags("training")?;
    let testing = flags("testing")?;

    Ok(PerformanceRecord {
        key: LookupKey::from_parts(&training, &testing),
        test_performance: parse_fraction(index, fields, "test_performance")?,
        out_of_sample_performance: parse_fraction(index, fields, "out_of_sample_performance")?,
    })
}

fn parse_flag(index: usize, fields: &Map<String, Value>, field: &str) -> Result<bool> {
    let value = fields.get(field).ok_or_else(|| TableError::MissingField {
        index,
        field: field.to_string(),
    })?;

    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        _ => Err(TableError::InvalidFlag {
            index,
            field: field.to_string(),
        }),
    }
}

fn parse_fraction(index: usize, fields: &Map<String, Value>, field: &'static str) -> Result<f64> {
    let value = fields.get(field).ok_or_else(|| TableError::MissingField {
        index,
        field: field.to_string(),
    })?;

    match value.as_f64() {
        Some(v) if (0.0..=1.0).contains(&v) => Ok(v),
        _ => Err(TableError::OutOfRange {
            index,
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::encode;
    use crate::selection::SubsetSelection;

    const TABLE: &str = r#"[
        {
            "training_1": 1, "training_2": 1, "training_3": 0, "training_4": 0,
            "testing_1": 0, "testing_2": 0, "testing_3": 1, "testing_4": 0,
            "test_performance": 0.71, "out_of_sample_performance": 0.6543
        },
        {
            "training_1": true, "training_2": false, "training_3": false, "training_4": false,
            "testing_1": true, "testing_2": false, "testing_3": false, "testing_4": false,
            "test_performance": 0.98, "out_of_sample_performance": 0.55
        }
    ]"#;

    fn key(training: &[usize], testing: &[usize]) -> LookupKey {
        encode(&SubsetSelection::from_assignments(4, training, testing).unwrap())
    }

    #[test]
    fn test_parse_integer_and_boolean_flags() {
        let table = PerformanceTable::from_json_str(TABLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.subset_count(), Some(4));

        assert!(table.find(&key(&[1, 2], &[3])).is_some());
        assert!(table.find(&key(&[1], &[1])).is_some());
    }

    #[test]
    fn test_lookup_hit_reports_percentages() {
        let table = PerformanceTable::from_json_str(TABLE).unwrap();
        let lookup = table.lookup(&key(&[1, 2], &[3]));

        assert_eq!(lookup.source, LookupSource::Matched);
        assert_eq!(lookup.performance.test_performance, 71.0);
        assert_eq!(lookup.performance.out_of_sample_performance, 65.43);
    }

    #[test]
    fn test_lookup_miss_returns_sentinel_exactly() {
        let table = PerformanceTable::from_json_str(TABLE).unwrap();
        let lookup = table.lookup(&key(&[4], &[4]));

        assert_eq!(lookup.source, LookupSource::Fallback);
        assert_eq!(lookup.performance.test_performance, 50.0);
        assert_eq!(lookup.performance.out_of_sample_performance, 80.0);
        assert!(table.find(&key(&[4], &[4])).is_none());
    }

    #[test]
    fn test_empty_table_always_falls_back() {
        let table = PerformanceTable::empty();
        assert_eq!(table.subset_count(), None);
        assert_eq!(table.lookup(&key(&[1], &[2])).performance, SENTINEL_FALLBACK);
    }

    #[test]
    fn test_custom_fallback() {
        let fallback = PerformancePair {
            test_performance: 60.0,
            out_of_sample_performance: 70.0,
        };
        let table = PerformanceTable::empty().with_fallback(fallback);
        assert_eq!(table.lookup(&key(&[1], &[2])).performance, fallback);
    }

    #[test]
    fn test_key_width_mismatch_is_a_miss() {
        let table = PerformanceTable::from_json_str(TABLE).unwrap();
        let three = encode(&SubsetSelection::from_assignments(3, &[1, 2], &[3]).unwrap());
        assert_eq!(table.lookup(&three).source, LookupSource::Fallback);
    }

    #[test]
    fn test_duplicate_key_keeps_first() {
        let json = r#"[
            {"training_1": 1, "testing_1": 1, "test_performance": 0.1, "out_of_sample_performance": 0.2},
            {"training_1": 1, "testing_1": 1, "test_performance": 0.9, "out_of_sample_performance": 0.9}
        ]"#;
        let table = PerformanceTable::from_json_str(json).unwrap();
        let record = table
            .find(&LookupKey::from_parts(&[true], &[true]))
            .unwrap();
        assert_eq!(record.test_performance, 0.1);
    }

    #[test]
    fn test_missing_flag_field() {
        let json = r#"[{"training_1": 1, "test_performance": 0.1, "out_of_sample_performance": 0.2}]"#;
        match PerformanceTable::from_json_str(json) {
            Err(TableError::MissingField { field, .. }) => assert_eq!(field, "testing_1"),
            other => panic!("Expected MissingField, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_flag_value() {
        let json = r#"[{"training_1": 2, "testing_1": 1, "test_performance": 0.1, "out_of_sample_performance": 0.2}]"#;
        assert!(matches!(
            PerformanceTable::from_json_str(json),
            Err(TableError::InvalidFlag { .. })
        ));
    }

    #[test]
    fn test_performance_out_of_range() {
        let json = r#"[{"training_1": 1, "testing_1": 1, "test_performance": 71, "out_of_sample_performance": 0.2}]"#;
        assert!(matches!(
            PerformanceTable::from_json_str(json),
            Err(TableError::OutOfRange {
                field: "test_performance",
                ..
            })
        ));
    }

    #[test]
    fn test_inconsistent_subset_count() {
        let json = r#"[
            {"training_1": 1, "testing_1": 1, "test_performance": 0.1, "out_of_sample_performance": 0.2},
            {"training_1": 1, "training_2": 0, "testing_1": 1, "testing_2": 0, "test_performance": 0.1, "out_of_sample_performance": 0.2}
        ]"#;
        assert!(matches!(
            PerformanceTable::from_json_str(json),
            Err(TableError::SubsetCountMismatch {
                index: 1,
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(
            PerformanceTable::from_json_str(r#"{"records": []}"#),
            Err(TableError::NotAnArray)
        ));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("table.json");
        std::fs::write(&path, TABLE).unwrap();

        let table = PerformanceTable::from_json_file(&path).unwrap();
        assert_eq!(table.len(), 2);

        let missing = PerformanceTable::from_json_file(dir.path().join("nope.json"));
        assert!(matches!(missing, Err(TableError::Io { .. })));
    }
}

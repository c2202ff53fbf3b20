// Engine configuration
//
// Every knob has a default that reproduces the lesson's behavior; the
// embedded lab-default.toml spells those defaults out and is kept equal to
// `EngineConfig::default()` by a unit test.

use crate::analysis::DEFAULT_ALPHA;
use crate::histogram::Binning;
use crate::selection::DEFAULT_SUBSET_COUNT;
use crate::store::{HttpStore, JsonlStore, MemoryStore, ObservationQuery, RecordStore};
use crate::table::PerformancePair;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_TOML: &str = include_str!("../lab-default.toml");

/// Top-level configuration
///
/// # Example
/// ```
/// use subset_lab::config::EngineConfig;
///
/// let config = EngineConfig::from_toml_str("[session]\nmin_runs_before_prediction = 0\n").unwrap();
/// assert_eq!(config.session.min_runs_before_prediction, 0);
/// assert_eq!(config.subsets.count, 4); // untouched sections keep defaults
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub subsets: SubsetsConfig,
    /// Pair reported when no record matches (percent)
    pub fallback: PerformancePair,
    /// Range filter and limit applied to every population fetch
    pub query: ObservationQuery,
    pub histogram: Binning,
    pub session: SessionConfig,
    pub analysis: AnalysisConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubsetsConfig {
    /// Number of subsets the dataset is split into
    pub count: usize,
}

impl Default for SubsetsConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_SUBSET_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Model runs required before the prediction step unlocks
    pub min_runs_before_prediction: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_runs_before_prediction: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Alpha for the overlap group comparison
    pub significance_level: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_level: DEFAULT_ALPHA,
        }
    }
}

/// Record store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Jsonl,
    Http,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// File for the `jsonl` backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Base URL for the `http` backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl StoreConfig {
    /// Open the configured backend
    pub fn open(&self) -> Result<Arc<dyn RecordStore>> {
        let store: Arc<dyn RecordStore> = match self.kind {
            StoreKind::Memory => Arc::new(MemoryStore::new()),
            StoreKind::Jsonl => {
                let path = self
                    .path
                    .as_ref()
                    .context("store.path is required for the jsonl store")?;
                Arc::new(
                    JsonlStore::open(path)
                        .with_context(|| format!("Failed to open record store {}", path.display()))?,
                )
            }
            StoreKind::Http => {
                let url = self.url.as_ref().context("store.url is required for the http store")?;
                Arc::new(HttpStore::new(url.as_str()).context("Failed to create HTTP record store client")?)
            }
        };
        tracing::debug!("Using {} record store", store.name());
        Ok(store)
    }
}

impl EngineConfig {
    /// Load and validate a TOML file
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).context("Failed to parse TOML config")?;
        config.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(config)
    }

    /// The documented defaults shipped with the crate
    pub fn embedded_default() -> Result<Self> {
        Self::from_toml_str(DEFAULT_TOML).context("Embedded default config is invalid")
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.subsets.count == 0 {
            return Err("subsets.count must be at least 1".to_string());
        }

        for (name, value) in [
            ("fallback.test_performance", self.fallback.test_performance),
            ("fallback.out_of_sample_performance", self.fallback.out_of_sample_performance),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be between 0 and 100, got {}", name, value));
            }
        }

        if self.query.limit == 0 {
            return Err("query.limit must be at least 1".to_string());
        }
        if self.query.min_error.is_nan() || self.query.max_error.is_nan() || self.query.min_error > self.query.max_error {
            return Err(format!(
                "query range must satisfy min_error <= max_error, got [{}, {}]",
                self.query.min_error, self.query.max_error
            ));
        }

        self.histogram.validate().map_err(|e| format!("histogram: {}", e))?;

        let alpha = self.analysis.significance_level;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(format!(
                "analysis.significance_level must be in (0, 1), got {}",
                alpha
            ));
        }

        match self.store.kind {
            StoreKind::Jsonl if self.store.path.is_none() => {
                Err("store.path is required for the jsonl store".to_string())
            }
            StoreKind::Http if self.store.url.is_none() => {
                Err("store.url is required for the http store".to_string())
            }
            _ => Ok(()),
        }
    }
}

//! CLI argument parsing for subset-lab

use crate::config::{EngineConfig, StoreKind};
use crate::histogram::{Binning, DataDrivenBins, FixedBins};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the round report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

/// Histogram layout selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BinningMode {
    /// 27 bins of width 3 starting at -35
    Fixed,
    /// [min, max] of the population split into --bins bins
    DataDriven,
}

#[derive(Parser, Debug)]
#[command(name = "subset-lab")]
#[command(version)]
#[command(
    about = "Predict out-of-sample performance for a training/testing subset split and compare your error with everyone else's",
    long_about = None
)]
pub struct Cli {
    /// Precomputed performance table (JSON array of flattened records)
    #[arg(long = "table", value_name = "FILE")]
    pub table: Option<PathBuf>,

    /// Subsets used for training (e.g., --train 1,2)
    #[arg(long = "train", value_name = "IDS", value_delimiter = ',')]
    pub train: Vec<usize>,

    /// Subsets used for testing (e.g., --test 3)
    #[arg(long = "test", value_name = "IDS", value_delimiter = ',')]
    pub test: Vec<usize>,

    /// Predicted out-of-sample performance in percent (default: the test performance)
    #[arg(long = "predict", value_name = "PERCENT")]
    pub predict: Option<f64>,

    /// Append observations to a JSON-lines file
    #[arg(long = "store", value_name = "FILE", conflicts_with = "store_url")]
    pub store: Option<PathBuf>,

    /// Use the hosted record store at this base URL
    #[arg(long = "store-url", value_name = "URL")]
    pub store_url: Option<String>,

    /// Histogram layout
    #[arg(long = "binning", value_enum)]
    pub binning: Option<BinningMode>,

    /// Number of histogram bins
    #[arg(long = "bins", value_name = "N")]
    pub bins: Option<usize>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (TOML, see lab-default.toml)
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Layer command-line overrides on top of a loaded configuration
    pub fn apply_overrides(&self, config: &mut EngineConfig) {
        if let Some(path) = &self.store {
            config.store.kind = StoreKind::Jsonl;
            config.store.path = Some(path.clone());
        }
        if let Some(url) = &self.store_url {
            config.store.kind = StoreKind::Http;
            config.store.url = Some(url.clone());
        }

        // Switching modes resets to that mode's defaults
        let switched = match self.binning {
            Some(BinningMode::Fixed) if !matches!(config.histogram, Binning::Fixed(_)) => {
                Some(Binning::Fixed(FixedBins::default()))
            }
            Some(BinningMode::DataDriven) if !matches!(config.histogram, Binning::DataDriven(_)) => {
                Some(Binning::DataDriven(DataDrivenBins::default()))
            }
            _ => None,
        };
        if let Some(binning) = switched {
            config.histogram = binning;
        }

        if let Some(bins) = self.bins {
            match &mut config.histogram {
                Binning::Fixed(fixed) => fixed.bins = bins,
                Binning::DataDriven(data) => data.bins = bins,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_round() {
        let cli = Cli::parse_from([
            "subset-lab",
            "--table",
            "table.json",
            "--train",
            "1,2",
            "--test",
            "3",
            "--predict",
            "72",
        ]);
        assert_eq!(cli.table, Some(PathBuf::from("table.json")));
        assert_eq!(cli.train, vec![1, 2]);
        assert_eq!(cli.test, vec![3]);
        assert_eq!(cli.predict, Some(72.0));
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["subset-lab"]);
        assert!(cli.train.is_empty());
        assert!(cli.test.is_empty());
        assert!(cli.predict.is_none());
        assert!(cli.binning.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_repeated_role_flags() {
        let cli = Cli::parse_from(["subset-lab", "--train", "1", "--train", "4", "--test", "4"]);
        assert_eq!(cli.train, vec![1, 4]);
    }

    #[test]
    fn test_cli_format_and_binning() {
        let cli = Cli::parse_from([
            "subset-lab",
            "--format",
            "json",
            "--binning",
            "data-driven",
            "--bins",
            "12",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.binning, Some(BinningMode::DataDriven));
        assert_eq!(cli.bins, Some(12));
    }

    #[test]
    fn test_cli_store_flags_conflict() {
        let result = Cli::try_parse_from([
            "subset-lab",
            "--store",
            "errors.jsonl",
            "--store-url",
            "http://localhost:3000",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides_store() {
        let cli = Cli::parse_from(["subset-lab", "--store", "errors.jsonl"]);
        let mut config = EngineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.store.kind, StoreKind::Jsonl);
        assert_eq!(config.store.path, Some(PathBuf::from("errors.jsonl")));

        let cli = Cli::parse_from(["subset-lab", "--store-url", "http://localhost:3000"]);
        let mut config = EngineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.store.kind, StoreKind::Http);
    }

    #[test]
    fn test_overrides_binning() {
        let cli = Cli::parse_from(["subset-lab", "--binning", "data-driven"]);
        let mut config = EngineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.histogram, Binning::data_driven(20));

        let cli = Cli::parse_from(["subset-lab", "--bins", "30"]);
        let mut config = EngineConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(
            config.histogram,
            Binning::Fixed(FixedBins {
                bins: 30,
                ..FixedBins::default()
            })
        );
    }

    #[test]
    fn test_overrides_keep_configured_layout() {
        // Same mode as the config: configured parameters survive
        let cli = Cli::parse_from(["subset-lab", "--binning", "data-driven"]);
        let mut config = EngineConfig {
            histogram: Binning::data_driven(8),
            ..EngineConfig::default()
        };
        cli.apply_overrides(&mut config);
        assert_eq!(config.histogram, Binning::data_driven(8));
    }
}

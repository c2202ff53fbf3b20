//! Round report output (text and JSON)
//!
//! A report bundles one evaluated round with the population view fetched
//! right after it: the two overlap-group histograms on shared edges, group
//! statistics and the user's standing.

use crate::analysis::{self, PopulationAnalysis};
use crate::histogram::{aggregate_grouped, Binning, GroupedHistogram};
use crate::observation::ErrorObservation;
use crate::overlap::{GroupedErrors, OverlapGroup};
use crate::recorder::AppendOutcome;
use crate::session::ModelRun;
use crate::table::LookupSource;
use serde::Serialize;

const BAR_WIDTH: u64 = 24;

/// Model run as reported
#[derive(Debug, Clone, Serialize)]
pub struct JsonRun {
    pub selection: crate::selection::SubsetSelection,
    /// Display form of the lookup key (`1100|0010`)
    pub key: String,
    pub test_performance: f64,
    pub out_of_sample_performance: f64,
    pub source: LookupSource,
    /// Model runs made in the session, rehearsals included
    pub runs: usize,
}

/// Population view
#[derive(Debug, Clone, Serialize)]
pub struct JsonPopulation {
    pub size: usize,
    /// Fraction of the population with a strictly larger absolute error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standing: Option<f64>,
    pub binning: Binning,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_width: Option<f64>,
    pub histograms: GroupedHistogram,
    pub analysis: PopulationAnalysis,
}

/// Everything printed after one round
#[derive(Debug, Clone, Serialize)]
pub struct RoundReport {
    pub run: JsonRun,
    pub observation: ErrorObservation,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_error: Option<String>,
    pub population: JsonPopulation,
}

impl RoundReport {
    /// Assemble the report for a round and the population fetched after it
    pub fn new(
        run: &ModelRun,
        runs: usize,
        observation: ErrorObservation,
        outcome: AppendOutcome,
        population: &[ErrorObservation],
        binning: &Binning,
        alpha: f64,
    ) -> Self {
        let errors: Vec<f64> = population.iter().map(|o| o.error_in_accuracy).collect();
        let grouped = GroupedErrors::from_observations(population);
        let histograms = aggregate_grouped(population, binning);
        let bin_width = binning.edges(&errors).map(|e| e.width());

        let (persisted, persist_error) = match outcome {
            AppendOutcome::Persisted => (true, None),
            AppendOutcome::Failed(reason) => (false, Some(reason)),
        };

        Self {
            run: JsonRun {
                selection: run.selection.clone(),
                key: run.key.to_string(),
                test_performance: run.lookup.performance.test_performance,
                out_of_sample_performance: run.lookup.performance.out_of_sample_performance,
                source: run.lookup.source,
                runs,
            },
            population: JsonPopulation {
                size: population.len(),
                standing: analysis::standing(&errors, observation.error_in_accuracy),
                binning: *binning,
                bin_width,
                histograms,
                analysis: analysis::analyze(&grouped, alpha),
            },
            observation,
            persisted,
            persist_error,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable rendering
    pub fn to_text(&self) -> String {
        let run = &self.run;
        let obs = &self.observation;
        let source = match run.source {
            LookupSource::Matched => "matched",
            LookupSource::Fallback => "no record, default values",
        };
        let saved = match &self.persist_error {
            None => "yes".to_string(),
            Some(reason) => format!("no ({})", reason),
        };

        let mut lines = vec![
            format!("Selection:                 {}", run.selection),
            format!("Lookup key:                {} ({})", run.key, source),
            format!("Test performance:          {:.2}%", run.test_performance),
            format!("Out-of-sample performance: {:.2}%", run.out_of_sample_performance),
            format!("Your prediction:           {:.2}%", obs.predicted_performance),
            format!("Error in accuracy:         {:+.2}", obs.error_in_accuracy),
            format!("Saved:                     {}", saved),
            String::new(),
        ];

        let population = &self.population;
        lines.push(match population.standing {
            Some(standing) => format!(
                "Population: {} observations, you beat {:.1}% of them",
                population.size,
                standing * 100.0
            ),
            None => "Population: no observations yet".to_string(),
        });

        if !population.histograms.is_empty() {
            lines.push(String::new());
            lines.extend(self.histogram_lines());
        }
        lines.extend(self.analysis_lines());

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn histogram_lines(&self) -> Vec<String> {
        let population = &self.population;
        let histograms = &population.histograms;
        let mode = match population.binning {
            Binning::Fixed(_) => "fixed",
            Binning::DataDriven(_) => "data-driven",
        };

        let mut lines = vec![
            format!(
                "Error distribution ({}, bin width {:.2})",
                mode,
                population.bin_width.unwrap_or(0.0)
            ),
            format!(
                "  {:>8}  {:<w$}  {:<w$}",
                "bin",
                OverlapGroup::NonOverlapping.label(),
                OverlapGroup::Overlapping.label(),
                w = BAR_WIDTH as usize + 6
            ),
        ];

        let scale = histograms
            .non_overlapping
            .max_count()
            .max(histograms.overlapping.max_count())
            .max(1);
        let bar = |count: u64| {
            let len = (count * BAR_WIDTH).div_ceil(scale);
            format!("{:<w$} {:>4}", "#".repeat(len as usize), count, w = BAR_WIDTH as usize + 1)
        };

        lines.extend(
            histograms
                .non_overlapping
                .bins
                .iter()
                .zip(histograms.overlapping.bins.iter())
                .map(|(non, over)| {
                    format!("  {:>8.2}  {}  {}", non.lower_bound, bar(non.count), bar(over.count))
                }),
        );
        lines
    }

    fn analysis_lines(&self) -> Vec<String> {
        let analysis = &self.population.analysis;
        let groups = [
            (OverlapGroup::NonOverlapping, &analysis.non_overlapping),
            (OverlapGroup::Overlapping, &analysis.overlapping),
        ];
        if groups.iter().all(|(_, s)| s.is_none()) {
            return Vec::new();
        }

        let mut lines = vec![String::new(), "Group statistics".to_string()];
        for (group, summary) in groups {
            if let Some(s) = summary {
                lines.push(format!(
                    "  {:<22} n={:<5} mean={:+.2} median={:+.2} sd={:.2} range=[{:+.2}, {:+.2}]",
                    group.label(),
                    s.count,
                    s.mean,
                    s.median,
                    s.stddev,
                    s.min,
                    s.max
                ));
            }
        }
        if let Some(c) = &analysis.comparison {
            let verdict = if c.significant {
                "groups differ"
            } else {
                "no significant difference"
            };
            lines.push(format!(
                "  Welch t-test: t={:.3} df={:.1} p={:.4} ({} at alpha {})",
                c.statistic, c.df, c.pvalue, verdict, c.alpha
            ));
        }
        lines
    }
}

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use subset_lab::cli::{Cli, OutputFormat};
use subset_lab::config::EngineConfig;
use subset_lab::recorder::{AppendOutcome, ErrorRecorder};
use subset_lab::repository::ErrorRepository;
use subset_lab::report::RoundReport;
use subset_lab::selection::Role;
use subset_lab::session::Session;
use subset_lab::table::PerformanceTable;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Configuration file (or defaults) with command-line overrides applied
fn load_config(args: &Cli) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_toml(path)?,
        None => EngineConfig::default(),
    };
    args.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

fn load_table(args: &Cli, config: &EngineConfig) -> Result<PerformanceTable> {
    let table = match &args.table {
        Some(path) => PerformanceTable::from_json_file(path)
            .with_context(|| format!("Failed to load performance table {}", path.display()))?,
        None => {
            tracing::warn!("No performance table given, every lookup uses the fallback values");
            PerformanceTable::empty()
        }
    };

    if let Some(count) = table.subset_count() {
        if count != config.subsets.count {
            tracing::warn!(
                "Performance table has {} subsets but {} are configured, lookups will miss",
                count,
                config.subsets.count
            );
        }
    }
    Ok(table.with_fallback(config.fallback))
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let config = load_config(&args)?;
    let table = load_table(&args, &config)?;
    let store = config.store.open()?;

    let mut session = Session::new(
        config.subsets.count,
        config.session.min_runs_before_prediction,
    );
    // Toggling twice would undo a flag
    let training: BTreeSet<usize> = args.train.iter().copied().collect();
    let testing: BTreeSet<usize> = args.test.iter().copied().collect();
    for id in training {
        session.toggle(id, Role::Training)?;
    }
    for id in testing {
        session.toggle(id, Role::Testing)?;
    }

    // Rehearsal runs unlock the prediction step
    let rehearsals = config.session.min_runs_before_prediction.max(1);
    for _ in 0..rehearsals {
        session.run_model(&table)?;
    }

    session.begin_prediction()?;
    if let Some(predicted) = args.predict {
        session.set_prediction(predicted)?;
    }

    let recorder = ErrorRecorder::new(store.clone());
    let recorded = session.evaluate(&recorder)?;
    let outcome = recorded.pending.wait();
    if let AppendOutcome::Failed(reason) = &outcome {
        tracing::warn!("Observation was not saved: {}", reason);
    }

    let repository = ErrorRepository::new(store, config.query);
    let population = repository.fetch_or_empty();

    let run = session
        .last_run()
        .context("Session has no model run after evaluation")?;
    let report = RoundReport::new(
        run,
        session.runs(),
        recorded.observation,
        outcome,
        &population,
        &config.histogram,
        config.analysis.significance_level,
    );

    match args.format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }

    Ok(())
}

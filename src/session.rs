//! Prediction round state machine
//!
//! One session walks a user through rounds of:
//!
//! ```text
//! Selecting ──run_model──► Built ──begin_prediction──► Predicting ──evaluate──► Evaluated
//!     ▲                      │                                                     │
//!     └──────toggle──────────┘◄─────────────────────next_round─────────────────────┘
//! ```
//!
//! `run_model` snapshots the selection; everything after it (the prediction
//! seed, the actual value, the recorded selection) comes from that snapshot,
//! never from the live selection. Predictions unlock only after a few
//! rehearsal runs so the user has seen how test performance moves.

use crate::key::{encode, LookupKey};
use crate::observation::ErrorObservation;
use crate::recorder::{ErrorRecorder, Recorded};
use crate::selection::{Role, SelectionError, SubsetId, SubsetSelection};
use crate::table::{Lookup, PerformanceTable};
use std::fmt;
use thiserror::Error;

/// Where the current round is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Selecting,
    Built,
    Predicting,
    Evaluated,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Selecting => "selecting",
            Stage::Built => "built",
            Stage::Predicting => "predicting",
            Stage::Evaluated => "evaluated",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("cannot {operation} while {stage}")]
    InvalidStage { operation: &'static str, stage: Stage },

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("run the model {required} times before predicting (runs so far: {runs})")]
    NotEnoughRuns { runs: usize, required: usize },

    #[error("prediction must be between 0 and 100, got {0}")]
    PredictionOutOfRange(f64),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// Selection frozen by `run_model` together with its lookup
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRun {
    pub selection: SubsetSelection,
    pub key: LookupKey,
    pub lookup: Lookup,
}

/// Session state for one user
#[derive(Debug, Clone)]
pub struct Session {
    selection: SubsetSelection,
    stage: Stage,
    runs: usize,
    min_runs_before_prediction: usize,
    last_run: Option<ModelRun>,
    prediction: Option<f64>,
    last_observation: Option<ErrorObservation>,
}

impl Session {
    /// Fresh session with nothing selected
    pub fn new(subset_count: usize, min_runs_before_prediction: usize) -> Self {
        Self {
            selection: SubsetSelection::new(subset_count),
            stage: Stage::Selecting,
            runs: 0,
            min_runs_before_prediction,
            last_run: None,
            prediction: None,
            last_observation: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn selection(&self) -> &SubsetSelection {
        &self.selection
    }

    /// Model runs so far, across rounds
    pub fn runs(&self) -> usize {
        self.runs
    }

    pub fn last_run(&self) -> Option<&ModelRun> {
        self.last_run.as_ref()
    }

    pub fn prediction(&self) -> Option<f64> {
        self.prediction
    }

    pub fn last_observation(&self) -> Option<&ErrorObservation> {
        self.last_observation.as_ref()
    }

    /// Flip one flag of the live selection
    ///
    /// Toggling after a run drops back to `Selecting`; the previous run stays
    /// visible but cannot be predicted on.
    pub fn toggle(&mut self, subset: usize, role: Role) -> Result<()> {
        self.expect_stage("change the selection", &[Stage::Selecting, Stage::Built])?;
        self.selection.toggle(SubsetId::new(subset)?, role)?;
        self.stage = Stage::Selecting;
        Ok(())
    }

    /// Snapshot the selection and look it up
    ///
    /// An incomplete selection is rejected and leaves the session untouched.
    pub fn run_model(&mut self, table: &PerformanceTable) -> Result<&ModelRun> {
        self.expect_stage("run the model", &[Stage::Selecting, Stage::Built])?;
        self.selection.ensure_complete()?;

        let selection = self.selection.clone();
        let key = encode(&selection);
        let lookup = table.lookup(&key);
        self.runs += 1;
        tracing::debug!(
            "Model run {} for {}: test {:.2}, out-of-sample {:.2} ({:?})",
            self.runs,
            key,
            lookup.performance.test_performance,
            lookup.performance.out_of_sample_performance,
            lookup.source
        );

        self.stage = Stage::Built;
        Ok(self.last_run.insert(ModelRun {
            selection,
            key,
            lookup,
        }))
    }

    /// True when `begin_prediction` would succeed
    pub fn can_predict(&self) -> bool {
        self.stage == Stage::Built && self.runs >= self.min_runs_before_prediction
    }

    /// Open the prediction step, seeded with the run's test performance
    pub fn begin_prediction(&mut self) -> Result<f64> {
        self.expect_stage("begin a prediction", &[Stage::Built])?;
        if self.runs < self.min_runs_before_prediction {
            return Err(SessionError::NotEnoughRuns {
                runs: self.runs,
                required: self.min_runs_before_prediction,
            });
        }
        let seed = self.current_run()?.lookup.performance.test_performance;
        self.prediction = Some(seed);
        self.stage = Stage::Predicting;
        Ok(seed)
    }

    /// Move the prediction slider
    pub fn set_prediction(&mut self, value: f64) -> Result<()> {
        self.expect_stage("set a prediction", &[Stage::Predicting])?;
        if !(0.0..=100.0).contains(&value) {
            return Err(SessionError::PredictionOutOfRange(value));
        }
        self.prediction = Some(value);
        Ok(())
    }

    /// Score the prediction against the run's out-of-sample performance
    ///
    /// The observation is appended in the background; the round is
    /// evaluated whether or not the append succeeds.
    pub fn evaluate(&mut self, recorder: &ErrorRecorder) -> Result<Recorded> {
        self.expect_stage("evaluate", &[Stage::Predicting])?;
        let run = self.current_run()?;
        let actual = run.lookup.performance.out_of_sample_performance;
        let predicted = self
            .prediction
            .unwrap_or(run.lookup.performance.test_performance);

        let recorded = recorder.record(predicted, actual, &run.selection);
        self.last_observation = Some(recorded.observation.clone());
        self.stage = Stage::Evaluated;
        Ok(recorded)
    }

    /// Start another round, keeping the selection and run count
    pub fn next_round(&mut self) -> Result<()> {
        self.expect_stage("start a new round", &[Stage::Evaluated])?;
        self.prediction = None;
        self.stage = Stage::Selecting;
        Ok(())
    }

    fn current_run(&self) -> Result<&ModelRun> {
        self.last_run.as_ref().ok_or(SessionError::InvalidStage {
            operation: "use a model run",
            stage: self.stage,
        })
    }

    fn expect_stage(&self, operation: &'static str, allowed: &[Stage]) -> Result<()> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(SessionError::InvalidStage {
                operation,
                stage: self.stage,
            })
        }
    }
}

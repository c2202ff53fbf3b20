//! Subset Lab - training/testing split lookup and prediction error analytics
//!
//! A learner assigns dataset subsets to training and testing, looks up the
//! precomputed performance of that split, predicts its out-of-sample
//! performance and compares the prediction error with everyone else's,
//! grouped by whether training and testing overlapped.
//!
//! Flow: [`selection`] → [`key::encode`] → [`table::PerformanceTable::lookup`]
//! → [`recorder::ErrorRecorder`] → [`store`] → [`repository::ErrorRepository`]
//! → [`overlap`] → [`histogram`] / [`analysis`].

pub mod analysis;
pub mod cli;
pub mod config;
pub mod histogram;
pub mod key;
pub mod observation;
pub mod overlap;
pub mod recorder;
pub mod report;
pub mod repository;
pub mod selection;
pub mod session;
pub mod store;
pub mod table;

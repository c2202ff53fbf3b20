use super::{ObservationQuery, RecordStore, Result, StoreError};
use crate::observation::ErrorObservation;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;

const SAVE_PATH: &str = "/api/saveUserData";
const FETCH_PATH: &str = "/api/getAllUserErrors";

/// Response body of the fetch endpoint
#[derive(Debug, Deserialize)]
struct ErrorsEnvelope {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// Client for the hosted lesson record store
///
/// The server already filters to the default range, newest first, 1000
/// records. The query is applied again locally so a narrower configured
/// query still holds.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    client: Client,
}

impl HttpStore {
    /// Create a client for `base_url` (e.g. `https://lesson.example.org`)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn save_url(&self) -> String {
        format!("{}{}", self.base_url, SAVE_PATH)
    }

    pub fn fetch_url(&self) -> String {
        format!("{}{}", self.base_url, FETCH_PATH)
    }

    fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Decode the fetch endpoint's `{"errors": [...]}` body
///
/// Records that do not fit the observation schema are skipped one by one.
fn decode_envelope(body: &str) -> Result<Vec<ErrorObservation>> {
    let envelope: ErrorsEnvelope = serde_json::from_str(body)?;
    let mut observations = Vec::with_capacity(envelope.errors.len());
    for (index, value) in envelope.errors.into_iter().enumerate() {
        match serde_json::from_value::<ErrorObservation>(value) {
            Ok(observation) => observations.push(observation),
            Err(e) => {
                tracing::warn!("Skipping malformed record at {}[{}]: {}", FETCH_PATH, index, e);
            }
        }
    }
    Ok(observations)
}

impl RecordStore for HttpStore {
    fn append(&self, observation: &ErrorObservation) -> Result<()> {
        let response = self
            .client
            .post(self.save_url())
            .json(observation)
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Self::check_status(response)?;
        Ok(())
    }

    fn query(&self, query: &ObservationQuery) -> Result<Vec<ErrorObservation>> {
        let response = self
            .client
            .get(self.fetch_url())
            .send()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let body = Self::check_status(response)?
            .text()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(query.apply(decode_envelope(&body)?))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// Port for the water-quality prediction service
use crate::domain::telemetry::{Channel, MetricsBatch};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Readings the prediction model is fed with, one per channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionRequest {
    pub temp: f64,
    pub ph: f64,
    pub orp: f64,
}

impl PredictionRequest {
    /// Builds a request from the first sample of every channel, if each has one
    pub fn from_batch(batch: &MetricsBatch) -> Option<Self> {
        Some(Self {
            temp: batch.first(Channel::Temperature)?,
            ph: batch.first(Channel::Ph)?,
            orp: batch.first(Channel::Orp)?,
        })
    }

    /// Builds a request from one reading per channel, indexed by `Channel::index`
    pub fn from_readouts(readouts: &[Option<f64>; 3]) -> Option<Self> {
        Some(Self {
            temp: readouts[Channel::Temperature.index()]?,
            ph: readouts[Channel::Ph.index()]?,
            orp: readouts[Channel::Orp.index()]?,
        })
    }
}

/// Body of the prediction endpoint. The server expects readings as strings.
#[derive(Debug, Serialize)]
pub struct PredictionPayload {
    pub temp: String,
    pub ph: String,
    pub orp: String,
}

impl From<&PredictionRequest> for PredictionPayload {
    fn from(request: &PredictionRequest) -> Self {
        Self {
            temp: request.temp.to_string(),
            ph: request.ph.to_string(),
            orp: request.orp.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Prediction {
    #[serde(rename = "wq")]
    pub water_quality: String,
    #[serde(rename = "cl")]
    pub chlorine: String,
}

/// Alerts produced by the HTTP helper for failed requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionError {
    #[error("the request was rejected as malformed, try again later")]
    BadRequest,
    #[error("the session has expired")]
    Unauthorized,
    #[error("the server failed while predicting, try again later")]
    Internal,
    #[error("unexpected response status {0}, contact the service provider")]
    Unexpected(u16),
    #[error("the server could not be reached: {0}")]
    Unreachable(String),
    #[error("the prediction response could not be read: {0}")]
    InvalidResponse(String),
}

impl PredictionError {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => PredictionError::BadRequest,
            401 => PredictionError::Unauthorized,
            500 => PredictionError::Internal,
            other => PredictionError::Unexpected(other),
        }
    }

    /// An expired session ends the working session like a lost connection does
    pub fn ends_session(&self) -> bool {
        matches!(self, PredictionError::Unauthorized)
    }
}

#[async_trait]
pub trait PredictionClient: Send + Sync {
    /// Requests water quality and chlorine predictions for one set of readings
    async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PredictionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_needs_every_channel() {
        let partial = MetricsBatch::new()
            .with_channel(Channel::Temperature, vec![20.1, 20.2])
            .with_channel(Channel::Ph, vec![7.1]);
        assert_eq!(PredictionRequest::from_batch(&partial), None);

        let full = partial.with_channel(Channel::Orp, vec![650.0, 651.0]);
        assert_eq!(
            PredictionRequest::from_batch(&full),
            Some(PredictionRequest {
                temp: 20.1,
                ph: 7.1,
                orp: 650.0
            })
        );
    }

    #[test]
    fn test_payload_sends_readings_as_strings() {
        let request = PredictionRequest {
            temp: 21.5,
            ph: 7.0,
            orp: 700.0,
        };
        let json = serde_json::to_value(PredictionPayload::from(&request)).unwrap();
        assert_eq!(json, serde_json::json!({"temp": "21.5", "ph": "7", "orp": "700"}));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(PredictionError::from_status(400), PredictionError::BadRequest);
        assert_eq!(PredictionError::from_status(401), PredictionError::Unauthorized);
        assert_eq!(PredictionError::from_status(500), PredictionError::Internal);
        assert_eq!(PredictionError::from_status(404), PredictionError::Unexpected(404));
        assert!(PredictionError::Unauthorized.ends_session());
        assert!(!PredictionError::Internal.ends_session());
    }
}

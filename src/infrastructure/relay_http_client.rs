// HTTP client for the relay's prediction and session endpoints
use crate::application::frame_transport::SessionTeardown;
use crate::application::prediction_client::{
    Prediction, PredictionClient, PredictionError, PredictionPayload, PredictionRequest,
};
use crate::infrastructure::config::ServerSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::COOKIE;

#[derive(Debug, Clone)]
pub struct RelayHttpClient {
    client: reqwest::Client,
    server: ServerSettings,
}

impl RelayHttpClient {
    pub fn new(server: ServerSettings) -> Self {
        Self::with_client(reqwest::Client::new(), server)
    }

    pub fn with_client(client: reqwest::Client, server: ServerSettings) -> Self {
        Self { client, server }
    }

    fn with_session(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.server.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }
}

#[async_trait]
impl PredictionClient for RelayHttpClient {
    async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PredictionError> {
        let url = self.server.prediction_url();
        let payload = PredictionPayload::from(request);

        let response = self
            .with_session(self.client.post(&url))
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| PredictionError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Prediction failed with status {}: {}", status, body);
            return Err(PredictionError::from_status(status.as_u16()));
        }

        response
            .json::<Prediction>()
            .await
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl SessionTeardown for RelayHttpClient {
    async fn logoff(&self) -> Result<()> {
        let url = self.server.logout_url();

        let response = self
            .with_session(self.client.get(&url))
            .send()
            .await
            .context("Failed to send logoff request")?;

        if !response.status().is_success() {
            anyhow::bail!("Logoff failed with status {}", response.status());
        }

        tracing::info!("Logged off from {}", url);
        Ok(())
    }
}

// HTTP collector client - Uploads location batches to the remote collector
use crate::application::ports::{DeliveryError, LocationCollector};
use crate::domain::credentials::Credentials;
use crate::domain::position::{TelemetryRecord, UploadPayload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    upload_path: String,
}

impl HttpCollector {
    pub fn new(upload_path: impl Into<String>, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .context("Failed to build collector HTTP client")?;

        Ok(Self {
            client,
            upload_path: upload_path.into(),
        })
    }

    fn build_upload_url(&self, collector_url: &str) -> String {
        format!(
            "{}/{}",
            collector_url.trim_end_matches('/'),
            self.upload_path.trim_start_matches('/')
        )
    }
}

fn classify(error: reqwest::Error) -> DeliveryError {
    if error.is_timeout() {
        DeliveryError::Timeout
    } else {
        DeliveryError::Transport(error.to_string())
    }
}

#[async_trait]
impl LocationCollector for HttpCollector {
    async fn upload(&self, credentials: &Credentials, records: &[TelemetryRecord]) -> Result<(), DeliveryError> {
        let token = credentials.token().ok_or(DeliveryError::MissingCredential)?;
        let url = self.build_upload_url(&credentials.collector_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&UploadPayload { locations: records })
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(%status, body = %body, "Collector rejected batch");
            return Err(DeliveryError::Rejected(status.as_u16()));
        }

        Ok(())
    }
}

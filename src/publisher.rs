use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::error::PublishError;
use crate::models::CheckResult;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(20);

/// Pushes a cycle's batch to whatever holds the latest snapshot.
#[async_trait]
pub trait StatusPublisher: Send + Sync {
    async fn publish(&self, batch: &[CheckResult]) -> Result<(), PublishError>;
}

/// POSTs the batch as a JSON array to the status update endpoint.
pub struct HttpPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPublisher {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, PublishError> {
        let client = reqwest::Client::builder().timeout(PUBLISH_TIMEOUT).build()?;
        Ok(Self { client, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl StatusPublisher for HttpPublisher {
    async fn publish(&self, batch: &[CheckResult]) -> Result<(), PublishError> {
        let response = self.client.post(&self.endpoint).json(batch).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(status.as_u16()));
        }
        info!(endpoint = %self.endpoint, sites = batch.len(), "Status published");
        Ok(())
    }
}

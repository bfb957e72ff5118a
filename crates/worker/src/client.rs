//! HTTP client for the dispatch REST API.
//!
//! Speaks the `{ "data": ... }` envelope the API wraps every success in.
//! A `204 No Content` from `next-job` means the queue is empty.

use async_trait::async_trait;
use dispatch_core::job::Job;
use dispatch_core::types::{JobId, WorkerId};
use dispatch_core::worker::Worker;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::WorkerError;
use crate::source::WorkSource;

/// Errors from the dispatch HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("Dispatch API error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Client for one dispatch API deployment.
#[derive(Debug, Clone)]
pub struct DispatchClient {
    client: reqwest::Client,
    base_url: String,
}

impl DispatchClient {
    /// * `base_url` - API root without the `/api/v1` prefix, e.g. `http://host:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// `POST /workers`
    pub async fn register_worker(&self, name: Option<String>) -> Result<Worker, ClientError> {
        let response = self
            .client
            .post(self.url("/workers"))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `POST /workers/{id}/next-job`
    pub async fn request_job(&self, worker_id: &str) -> Result<Option<Job>, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/workers/{worker_id}/next-job")))
            .send()
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Self::parse_data(response).await.map(Some)
    }

    /// `POST /jobs/{id}/complete`
    pub async fn complete_job(&self, job_id: JobId) -> Result<Job, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{job_id}/complete")))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    /// `POST /jobs/{id}/fail`
    pub async fn fail_job(&self, job_id: JobId, reason: &str) -> Result<Job, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{job_id}/fail")))
            .json(&serde_json::json!({ "reason": reason }))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    // ---- private helpers ----

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_data<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let envelope: Envelope<T> = Self::ensure_success(response).await?.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl WorkSource for DispatchClient {
    async fn register(&self, name: Option<String>) -> Result<WorkerId, WorkerError> {
        Ok(self.register_worker(name).await?.id)
    }

    async fn next_job(&self, worker_id: &str) -> Result<Option<Job>, WorkerError> {
        Ok(self.request_job(worker_id).await?)
    }

    async fn complete(&self, job_id: JobId) -> Result<(), WorkerError> {
        self.complete_job(job_id).await?;
        Ok(())
    }

    async fn fail(&self, job_id: JobId, reason: &str) -> Result<(), WorkerError> {
        self.fail_job(job_id, reason).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_strips_trailing_slash() {
        let client = DispatchClient::new("http://localhost:3000/");
        assert_eq!(
            client.url("/workers"),
            "http://localhost:3000/api/v1/workers"
        );
    }

    #[test]
    fn envelope_unwraps_job() {
        let job = Job::new(serde_json::json!({"command": "true"}));
        let body = serde_json::json!({ "data": job }).to_string();
        let parsed: Envelope<Job> = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed.data, job);
    }
}

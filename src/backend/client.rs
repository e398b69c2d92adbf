use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::credentials::CredentialProvider;
use super::errors::ClientError;
use crate::core::config::{EndpointSettings, Settings};
use crate::schemas::execution::{CodeExecutionRequest, CodeExecutionResponse};
use crate::schemas::results::GradeBreakdownDto;
use crate::schemas::submission::{DraftRequest, SubmissionRequest, SubmitResponseDto};
use crate::schemas::test::TestDto;

/// Every remote call the session engine makes. Each call resolves to data
/// or a typed `ClientError`; nothing panics across this boundary.
#[async_trait]
pub trait AssessmentBackend: Send + Sync {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDto, ClientError>;

    async fn submit(
        &self,
        test_id: &str,
        request: &SubmissionRequest,
    ) -> Result<SubmitResponseDto, ClientError>;

    async fn fetch_results(&self, submission_id: &str) -> Result<GradeBreakdownDto, ClientError>;

    async fn execute_code(
        &self,
        request: &CodeExecutionRequest,
    ) -> Result<CodeExecutionResponse, ClientError>;

    async fn save_draft(&self, test_id: &str, draft: &DraftRequest) -> Result<(), ClientError>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    endpoints: EndpointSettings,
    execution_timeout: Duration,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpBackend {
    pub fn from_settings(
        settings: &Settings,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(settings.api().connect_timeout_seconds))
            .timeout(Duration::from_secs(settings.api().request_timeout_seconds))
            .build()
            .context("Failed to build assessment HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.api().base_url.trim_end_matches('/').to_string(),
            endpoints: settings.endpoints().clone(),
            execution_timeout: Duration::from_secs(settings.api().execution_timeout_seconds),
            credentials,
        })
    }

    fn url(&self, template: &str, id: Option<&str>) -> String {
        let path = match id {
            Some(id) => template.replace("{id}", &urlencoding::encode(id)),
            None => template.to_string(),
        };
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, builder: RequestBuilder, operation: &'static str) -> Result<String, ClientError> {
        let Some(token) = self.credentials.bearer_token() else {
            tracing::warn!(operation, "No bearer token available; refusing to call assessment API");
            return Err(ClientError::NotAuthenticated);
        };

        let timer = Instant::now();
        let response = builder
            .bearer_auth(token)
            .send()
            .await
            .map_err(ClientError::from_transport)
            .inspect_err(|err| {
                tracing::warn!(operation, error = %err, "Assessment API transport failure");
            })?;

        let status = response.status();
        let raw_body = response.text().await.map_err(ClientError::from_transport)?;
        let elapsed_ms = timer.elapsed().as_millis() as u64;

        if !status.is_success() {
            let parsed = serde_json::from_str::<Value>(&raw_body)
                .unwrap_or_else(|_| json!({ "detail": raw_body }));
            let err = ClientError::from_status(status, &parsed);
            tracing::warn!(
                operation,
                status = status.as_u16(),
                elapsed_ms,
                error = %err,
                "Assessment API request failed"
            );
            return Err(err);
        }

        tracing::debug!(operation, status = status.as_u16(), elapsed_ms, "Assessment API request ok");
        Ok(raw_body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &'static str,
    ) -> Result<T, ClientError> {
        let raw_body = self.send(builder, operation).await?;
        serde_json::from_str(&raw_body)
            .map_err(|err| ClientError::Decode(format!("{operation}: {err}")))
    }
}

#[async_trait]
impl AssessmentBackend for HttpBackend {
    async fn fetch_test(&self, test_id: &str) -> Result<TestDto, ClientError> {
        let url = self.url(&self.endpoints.test_path, Some(test_id));
        self.send_json(self.client.get(url), "fetch_test").await
    }

    async fn submit(
        &self,
        test_id: &str,
        request: &SubmissionRequest,
    ) -> Result<SubmitResponseDto, ClientError> {
        let url = self.url(&self.endpoints.submit_path, Some(test_id));
        self.send_json(self.client.post(url).json(request), "submit").await
    }

    async fn fetch_results(&self, submission_id: &str) -> Result<GradeBreakdownDto, ClientError> {
        let url = self.url(&self.endpoints.results_path, Some(submission_id));
        self.send_json(self.client.get(url), "fetch_results").await
    }

    async fn execute_code(
        &self,
        request: &CodeExecutionRequest,
    ) -> Result<CodeExecutionResponse, ClientError> {
        let url = self.url(&self.endpoints.execute_path, None);
        let builder = self.client.post(url).timeout(self.execution_timeout).json(request);
        self.send_json(builder, "execute_code").await
    }

    async fn save_draft(&self, test_id: &str, draft: &DraftRequest) -> Result<(), ClientError> {
        let url = self.url(&self.endpoints.draft_path, Some(test_id));
        self.send(self.client.put(url).json(draft), "save_draft").await.map(|_| ())
    }
}

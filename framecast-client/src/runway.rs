//! Runway adapter
//!
//! Uses the Runway task API: `image_to_video` creates a task, `tasks/{id}`
//! reports its status and, once finished, a list of output URLs.

use async_trait::async_trait;
use framecast_core::dto::job::JobRequest;
use framecast_core::{ProviderKind, ResultLocator};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::http::{REQUEST_TIMEOUT, decode, download, merge_extra, read_json};
use crate::stream::ArtifactStream;
use crate::{ProviderAdapter, ProviderErrorDetail, StatusReport};

pub const DEFAULT_BASE_URL: &str = "https://api.dev.runwayml.com";
pub const API_VERSION: &str = "2024-11-06";
pub const DEFAULT_MODEL: &str = "gen3a_turbo";
pub const DEFAULT_DURATION_SECS: u32 = 5;
pub const DEFAULT_RATIO: &str = "1280:768";

/// Adapter for the Runway image-to-video API
#[derive(Debug, Clone)]
pub struct RunwayAdapter {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Vec<String>,
    failure: Option<String>,
    failure_code: Option<String>,
    progress: Option<f64>,
}

impl RunwayAdapter {
    /// Create an adapter against the public Runway endpoint
    ///
    /// # Arguments
    /// * `api_key` - Runway API secret, sent as a bearer token
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    /// Point the adapter at a different base URL (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Use a preconfigured HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_payload(request: &JobRequest) -> Result<Value> {
        let image = request.image.as_ref().ok_or_else(|| {
            AdapterError::invalid_request("Runway image-to-video requires a prompt image")
        })?;
        let options = &request.options;

        let mut payload = json!({
            "promptImage": image.to_reference(),
            "promptText": request.prompt,
            "model": options.model.as_deref().unwrap_or(DEFAULT_MODEL),
            "duration": options.duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
            "ratio": options.aspect_ratio.as_deref().unwrap_or(DEFAULT_RATIO),
        });
        if let Some(object) = payload.as_object_mut() {
            merge_extra(object, &options.extra);
        }

        Ok(payload)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("X-Runway-Version", API_VERSION)
            .timeout(REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl ProviderAdapter for RunwayAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Runway
    }

    async fn submit(&self, request: &JobRequest) -> Result<String> {
        let payload = Self::build_payload(request)?;
        let url = format!("{}/v1/image_to_video", self.base_url);

        debug!(model = %payload["model"], "Submitting Runway task");

        let response = self
            .authorized(self.client.post(&url))
            .json(&payload)
            .send()
            .await?;

        let raw = read_json(response).await?;
        let body: CreateResponse = decode(&raw)?;
        let task_id = body
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AdapterError::unexpected("No task id in API response", Some(raw)))?;

        info!(task_id = %task_id, "Runway task submitted");
        Ok(task_id)
    }

    async fn query_status(&self, job_id: &str) -> Result<StatusReport> {
        let url = format!("{}/v1/tasks/{}", self.base_url, job_id);
        let response = self.authorized(self.client.get(&url)).send().await?;

        let raw = read_json(response).await?;
        let body: TaskResponse = decode(&raw)?;

        if body.status.trim().is_empty() {
            return Err(AdapterError::unexpected(
                "No status in task response",
                Some(raw),
            ));
        }

        let error_detail = match (body.failure, body.failure_code) {
            (None, None) => None,
            (failure, code) => Some(ProviderErrorDetail {
                code,
                message: failure.unwrap_or_default(),
            }),
        };
        let locator = body.output.into_iter().find_map(ResultLocator::new);
        let progress = body.progress.map(|p| format!("{:.0}%", p * 100.0));

        Ok(StatusReport {
            raw_status: body.status,
            locator,
            error_detail,
            progress,
            raw,
        })
    }

    async fn resolve_and_fetch(&self, locator: &ResultLocator) -> Result<ArtifactStream> {
        download(&self.client, locator.as_str()).await
    }
}

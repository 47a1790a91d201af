//! MiniMax Hailuo adapter
//!
//! Submission returns a `task_id`; a successful status query returns a
//! `file_id`, which must be exchanged for a download URL through the files
//! endpoint before the video can be fetched.

use async_trait::async_trait;
use framecast_core::dto::job::JobRequest;
use framecast_core::{ProviderKind, ResultLocator};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::http::{REQUEST_TIMEOUT, decode, download, merge_extra, read_json, scalar_to_string};
use crate::stream::ArtifactStream;
use crate::{ProviderAdapter, ProviderErrorDetail, StatusReport};

pub const DEFAULT_BASE_URL: &str = "https://api.minimaxi.chat";
pub const DEFAULT_MODEL: &str = "I2V-01-Director";

/// Adapter for the MiniMax video generation API
#[derive(Debug, Clone)]
pub struct MiniMaxAdapter {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    task_id: Option<Value>,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    status: String,
    file_id: Option<Value>,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct RetrieveResponse {
    file: Option<FileObject>,
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct FileObject {
    download_url: Option<String>,
}

impl MiniMaxAdapter {
    /// Create an adapter against the public MiniMax endpoint
    ///
    /// # Arguments
    /// * `api_key` - MiniMax API key, sent as a bearer token
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

    /// Use a preconfigured HTTP client (proxies, TLS settings)
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_payload(request: &JobRequest) -> Result<Value> {
        let image = request.image.as_ref().ok_or_else(|| {
            AdapterError::invalid_request("MiniMax image-to-video requires a first frame image")
        })?;

        let mut payload = json!({
            "model": request.options.model.as_deref().unwrap_or(DEFAULT_MODEL),
            "prompt": request.prompt,
            "first_frame_image": image.to_reference(),
        });
        if let Some(object) = payload.as_object_mut() {
            merge_extra(object, &request.options.extra);
        }

        Ok(payload)
    }
}

/// Maps a non-zero `base_resp.status_code` onto the error taxonomy
fn classify_base_resp(base: &BaseResp, raw: &Value) -> AdapterError {
    let message = if base.status_msg.is_empty() {
        format!("MiniMax status code {}", base.status_code)
    } else {
        format!("{} (code {})", base.status_msg, base.status_code)
    };
    let raw = Some(raw.clone());

    match base.status_code {
        1004 => AdapterError::Authentication {
            status: None,
            message,
            raw,
        },
        // unknown error, timeout, rate limit, internal error
        1000 | 1001 | 1002 | 1013 => AdapterError::Transient {
            status: None,
            message,
            raw,
        },
        _ => AdapterError::InvalidRequest {
            status: None,
            message,
            raw,
        },
    }
}

fn failed_base_resp(base: &Option<BaseResp>) -> Option<&BaseResp> {
    base.as_ref().filter(|b| b.status_code != 0)
}

#[async_trait]
impl ProviderAdapter for MiniMaxAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::MiniMax
    }

    async fn submit(&self, request: &JobRequest) -> Result<String> {
        let payload = Self::build_payload(request)?;
        let url = format!("{}/v1/video_generation", self.base_url);

        debug!(model = %payload["model"], "Submitting MiniMax generation task");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let raw = read_json(response).await?;
        let body: SubmitResponse = decode(&raw)?;

        if let Some(base) = failed_base_resp(&body.base_resp) {
            return Err(classify_base_resp(base, &raw));
        }

        let task_id = body
            .task_id
            .as_ref()
            .and_then(scalar_to_string)
            .ok_or_else(|| {
                AdapterError::unexpected("No task_id in API response", Some(raw.clone()))
            })?;

        info!(task_id = %task_id, "MiniMax task submitted");
        Ok(task_id)
    }

    async fn query_status(&self, job_id: &str) -> Result<StatusReport> {
        let url = format!("{}/v1/query/video_generation", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("task_id", job_id)])
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let raw = read_json(response).await?;
        let body: QueryResponse = decode(&raw)?;
        let failed = failed_base_resp(&body.base_resp);

        if body.status.trim().is_empty() {
            return match failed {
                Some(base) => Err(classify_base_resp(base, &raw)),
                None => Err(AdapterError::unexpected(
                    "No status in query response",
                    Some(raw),
                )),
            };
        }

        let error_detail = failed.map(|base| ProviderErrorDetail {
            code: Some(base.status_code.to_string()),
            message: base.status_msg.clone(),
        });
        let locator = body
            .file_id
            .as_ref()
            .and_then(scalar_to_string)
            .and_then(ResultLocator::new);

        Ok(StatusReport {
            raw_status: body.status,
            locator,
            error_detail,
            progress: None,
            raw,
        })
    }

    async fn resolve_and_fetch(&self, locator: &ResultLocator) -> Result<ArtifactStream> {
        let url = format!("{}/v1/files/retrieve", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("file_id", locator.as_str())])
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(AdapterError::from)?;

        let raw = read_json(response)
            .await
            .map_err(AdapterError::into_delivery_error)?;
        let body: RetrieveResponse = decode(&raw).map_err(AdapterError::into_delivery_error)?;

        if let Some(base) = failed_base_resp(&body.base_resp) {
            return Err(classify_base_resp(base, &raw).into_delivery_error());
        }

        let download_url = body
            .file
            .and_then(|f| f.download_url)
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| AdapterError::ResultUnavailable {
                message: "No download URL found in file retrieval response".to_string(),
                raw: Some(raw.clone()),
            })?;

        debug!(file_id = %locator, "Resolved MiniMax file to download URL");
        download(&self.client, &download_url).await
    }
}

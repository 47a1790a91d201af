//! PiAPI Kling adapter
//!
//! PiAPI wraps every response in a `{code, message, data}` envelope where
//! `code` mirrors an HTTP status. The finished task exposes a direct
//! `video_url`, so no locator exchange is needed before downloading.

use async_trait::async_trait;
use framecast_core::dto::job::{ImageInput, JobRequest};
use framecast_core::{ProviderKind, ResultLocator};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{AdapterError, Result};
use crate::http::{REQUEST_TIMEOUT, decode, download, merge_extra, read_json, scalar_to_string};
use crate::stream::ArtifactStream;
use crate::{ProviderAdapter, ProviderErrorDetail, StatusReport};

pub const DEFAULT_BASE_URL: &str = "https://api.piapi.ai";
pub const DEFAULT_VERSION: &str = "2.0";
pub const DEFAULT_MODE: &str = "std";
pub const DEFAULT_DURATION_SECS: u32 = 5;
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";
const CFG_SCALE: f64 = 0.5;

/// Adapter for Kling video generation through PiAPI
#[derive(Debug, Clone)]
pub struct KlingAdapter {
    base_url: String,
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<TaskData>,
}

#[derive(Debug, Default, Deserialize)]
struct TaskData {
    task_id: Option<String>,
    #[serde(default)]
    status: String,
    output: Option<TaskOutput>,
    error: Option<TaskError>,
    #[serde(default)]
    logs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TaskOutput {
    video_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskError {
    code: Option<Value>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    raw_message: String,
    #[serde(default)]
    detail: Option<Value>,
}

impl TaskError {
    fn into_detail(self) -> Option<ProviderErrorDetail> {
        let code = self
            .code
            .as_ref()
            .and_then(scalar_to_string)
            .filter(|c| c != "0");
        let message = [
            Some(self.message),
            Some(self.raw_message),
            self.detail.map(|d| match d {
                Value::String(s) => s,
                other => other.to_string(),
            }),
        ]
        .into_iter()
        .flatten()
        .find(|m| !m.trim().is_empty());

        match (code, message) {
            (None, None) => None,
            (code, message) => Some(ProviderErrorDetail {
                code,
                message: message.unwrap_or_default(),
            }),
        }
    }
}

impl KlingAdapter {
    /// Create an adapter against the public PiAPI endpoint
    ///
    /// # Arguments
    /// * `api_key` - PiAPI key, sent in the `x-api-key` header
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
        let image_url = match &request.image {
            Some(ImageInput::Url(url)) => url.clone(),
            Some(ImageInput::Inline { .. }) => {
                return Err(AdapterError::invalid_request(
                    "PiAPI Kling requires a hosted image URL; inline images are not accepted",
                ));
            }
            None => {
                return Err(AdapterError::invalid_request(
                    "PiAPI Kling image-to-video requires an image URL",
                ));
            }
        };
        let options = &request.options;

        let mut input = json!({
            "prompt": request.prompt,
            "negative_prompt": options.negative_prompt.as_deref().unwrap_or(""),
            "cfg_scale": CFG_SCALE,
            "duration": options.duration_secs.unwrap_or(DEFAULT_DURATION_SECS),
            "aspect_ratio": options.aspect_ratio.as_deref().unwrap_or(DEFAULT_ASPECT_RATIO),
            "mode": options.mode.as_deref().unwrap_or(DEFAULT_MODE),
            "version": options.model.as_deref().unwrap_or(DEFAULT_VERSION),
            "image_url": image_url,
        });
        if let Some(object) = input.as_object_mut() {
            merge_extra(object, &options.extra);
        }

        Ok(json!({
            "model": "kling",
            "task_type": "video_generation",
            "input": input,
        }))
    }

    /// Reads the envelope and turns a non-200 `code` into an error
    async fn read_envelope(response: reqwest::Response) -> Result<(Envelope, Value)> {
        let raw = read_json(response).await?;
        let envelope: Envelope = decode(&raw)?;

        if envelope.code != 200 {
            let status = u16::try_from(envelope.code).unwrap_or(500);
            let message = if envelope.message.is_empty() {
                format!("PiAPI error code {}", envelope.code)
            } else {
                envelope.message.clone()
            };
            return Err(AdapterError::classify(status, message, Some(raw)));
        }

        Ok((envelope, raw))
    }
}

/// Most recent progress value found in the task logs
fn latest_progress(logs: &[Value]) -> Option<String> {
    logs.iter()
        .rev()
        .filter_map(|log| log.get("progress"))
        .find_map(|p| match p {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[async_trait]
impl ProviderAdapter for KlingAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::PiApiKling
    }

    async fn submit(&self, request: &JobRequest) -> Result<String> {
        let payload = Self::build_payload(request)?;
        let url = format!("{}/api/v1/task", self.base_url);

        debug!(version = %payload["input"]["version"], "Submitting PiAPI Kling task");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&payload)
            .send()
            .await?;

        let (envelope, raw) = Self::read_envelope(response).await?;
        let task_id = envelope
            .data
            .and_then(|d| d.task_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                AdapterError::unexpected("No task ID received in API response", Some(raw))
            })?;

        info!(task_id = %task_id, "PiAPI Kling task submitted");
        Ok(task_id)
    }

    async fn query_status(&self, job_id: &str) -> Result<StatusReport> {
        let url = format!("{}/api/v1/task/{}", self.base_url, job_id);
        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let (envelope, raw) = Self::read_envelope(response).await?;
        let data = envelope.data.unwrap_or_default();

        if data.status.trim().is_empty() {
            return Err(AdapterError::unexpected(
                "No status in task response",
                Some(raw),
            ));
        }

        let progress = latest_progress(&data.logs);
        let locator = data
            .output
            .and_then(|o| o.video_url)
            .and_then(ResultLocator::new);
        let error_detail = data.error.and_then(TaskError::into_detail);

        Ok(StatusReport {
            raw_status: data.status,
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

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> JobRequest {
        JobRequest::new("a fox in the snow", "out.mp4")
            .with_image(ImageInput::Url("https://example.com/fox.jpg".to_string()))
    }

    fn adapter(server: &MockServer) -> KlingAdapter {
        KlingAdapter::new("piapi-key").with_base_url(server.uri())
    }

    #[test]
    fn test_payload_defaults() {
        let payload = KlingAdapter::build_payload(&request()).unwrap();
        assert_eq!(payload["model"], "kling");
        assert_eq!(payload["task_type"], "video_generation");
        assert_eq!(payload["input"]["version"], "2.0");
        assert_eq!(payload["input"]["mode"], "std");
        assert_eq!(payload["input"]["duration"], 5);
        assert_eq!(payload["input"]["aspect_ratio"], "16:9");
        assert_eq!(payload["input"]["negative_prompt"], "");
        assert_eq!(payload["input"]["cfg_scale"], 0.5);
        assert_eq!(payload["input"]["image_url"], "https://example.com/fox.jpg");
    }

    #[test]
    fn test_inline_image_is_rejected() {
        let request = JobRequest::new("p", "out.mp4").with_image(ImageInput::Inline {
            mime_type: "image/png".to_string(),
            base64_data: "AAAA".to_string(),
        });
        let err = KlingAdapter::build_payload(&request).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn test_latest_progress() {
        let logs = vec![json!({"progress": 10}), json!({"msg": "x"}), json!({"progress": "55%"})];
        assert_eq!(latest_progress(&logs), Some("55%".to_string()));
        assert_eq!(latest_progress(&[]), None);
    }

    #[tokio::test]
    async fn test_submit_returns_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/task"))
            .and(header("x-api-key", "piapi-key"))
            .and(body_partial_json(json!({"input": {"image_url": "https://example.com/fox.jpg"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "message": "success",
                "data": {"task_id": "task-77", "status": "pending"}
            })))
            .mount(&server)
            .await;

        assert_eq!(adapter(&server).submit(&request()).await.unwrap(), "task-77");
    }

    #[tokio::test]
    async fn test_envelope_error_code_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/task"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 401,
                "message": "invalid api key",
                "data": {}
            })))
            .mount(&server)
            .await;

        let err = adapter(&server).submit(&request()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Authentication { .. }));
        assert!(err.raw().is_some());
    }

    #[tokio::test]
    async fn test_query_completed_exposes_video_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/task/task-77"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {
                    "task_id": "task-77",
                    "status": "Completed",
                    "output": {"video_url": "https://cdn.example.com/v.mp4"},
                    "error": {"code": 0, "message": ""}
                }
            })))
            .mount(&server)
            .await;

        let report = adapter(&server).query_status("task-77").await.unwrap();
        assert_eq!(report.raw_status, "Completed");
        assert_eq!(
            report.locator.unwrap().as_str(),
            "https://cdn.example.com/v.mp4"
        );
        assert!(report.error_detail.is_none());
    }

    #[tokio::test]
    async fn test_query_failed_keeps_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/task/task-77"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "data": {
                    "task_id": "task-77",
                    "status": "failed",
                    "error": {
                        "code": 10000,
                        "message": "",
                        "raw_message": "content policy violation"
                    },
                    "logs": [{"progress": 40}]
                }
            })))
            .mount(&server)
            .await;

        let report = adapter(&server).query_status("task-77").await.unwrap();
        assert_eq!(report.raw_status, "failed");
        assert_eq!(report.progress.as_deref(), Some("40"));
        let detail = report.error_detail.unwrap();
        assert_eq!(detail.code.as_deref(), Some("10000"));
        assert_eq!(detail.message, "content policy violation");
    }

    #[tokio::test]
    async fn test_query_http_500_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/task/task-77"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let err = adapter(&server).query_status("task-77").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_fetch_downloads_locator_directly() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 32]))
            .mount(&server)
            .await;

        let locator = ResultLocator::new(format!("{}/v.mp4", server.uri())).unwrap();
        let mut stream = adapter(&server).resolve_and_fetch(&locator).await.unwrap();

        let mut total = 0;
        while let Some(chunk) = stream.next_chunk().await.unwrap() {
            total += chunk.len();
        }
        assert_eq!(total, 32);
    }
}

//! Response handling shared by the provider adapters

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::stream::ArtifactStream;

/// Upper bound for a single API round trip (not applied to artifact downloads)
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Checks the status code and parses the body as JSON
///
/// Non-success statuses are classified into the adapter error taxonomy.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<Value> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(AdapterError::from_status(status.as_u16(), error_text));
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        AdapterError::unexpected(
            format!("Failed to parse JSON response: {}", e),
            Some(Value::String(text)),
        )
    })
}

/// Deserializes a typed view of an already-parsed payload
pub(crate) fn decode<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        AdapterError::unexpected(
            format!("Response did not match the expected shape: {}", e),
            Some(value.clone()),
        )
    })
}

/// Starts downloading an artifact from a resolved URL
pub(crate) async fn download(client: &Client, url: &str) -> Result<ArtifactStream> {
    debug!(url = %url, "Requesting artifact");

    let response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(AdapterError::from_status(status.as_u16(), error_text).into_delivery_error());
    }

    Ok(ArtifactStream::from_response(response))
}

/// Renders a JSON string or number as text; providers are not consistent about ids
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Copies caller-supplied extra fields into a payload object
pub(crate) fn merge_extra(target: &mut Map<String, Value>, extra: &Map<String, Value>) {
    for (key, value) in extra {
        target.insert(key.clone(), value.clone());
    }
}

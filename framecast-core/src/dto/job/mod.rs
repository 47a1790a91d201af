//! Job request DTOs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Source image for a generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageInput {
    /// Publicly reachable image URL
    Url(String),
    /// Image bytes already base64-encoded by the caller
    Inline {
        mime_type: String,
        base64_data: String,
    },
}

impl ImageInput {
    /// Renders the image as a URL, using a `data:` URI for inline images
    pub fn to_reference(&self) -> String {
        match self {
            ImageInput::Url(url) => url.clone(),
            ImageInput::Inline {
                mime_type,
                base64_data,
            } => format!("data:{};base64,{}", mime_type, base64_data),
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, ImageInput::Inline { .. })
    }
}

/// Provider-specific generation parameters
///
/// Adapters read the fields they understand and fall back to their own
/// defaults for the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model or model version (e.g. "I2V-01-Director", "2.0", "gen3a_turbo")
    pub model: Option<String>,
    /// Clip length in seconds
    pub duration_secs: Option<u32>,
    /// Aspect ratio or resolution string (e.g. "16:9", "1280:768")
    pub aspect_ratio: Option<String>,
    /// Quality mode (e.g. "std", "pro")
    pub mode: Option<String>,
    pub negative_prompt: Option<String>,
    /// Extra fields merged verbatim into the provider payload
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A request to generate one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    pub image: Option<ImageInput>,
    pub prompt: String,
    /// Destination of the artifact; must be unique per job
    pub output_path: PathBuf,
    pub options: GenerationOptions,
}

impl JobRequest {
    pub fn new(prompt: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            image: None,
            prompt: prompt.into(),
            output_path: output_path.into(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }
}

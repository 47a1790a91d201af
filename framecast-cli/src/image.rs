//! Input image handling
//!
//! Local images are sent inline as base64 data URIs; remote images are passed
//! through by URL.

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Args;
use framecast_core::dto::job::ImageInput;
use std::path::{Path, PathBuf};

/// Image source flags shared by the provider commands
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct ImageArgs {
    /// Path to a local image file
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// URL of an image reachable by the provider
    #[arg(long)]
    pub image_url: Option<String>,
}

impl ImageArgs {
    /// Loads the selected image source
    pub fn load(&self) -> Result<ImageInput> {
        match (&self.image, &self.image_url) {
            (Some(path), _) => encode_file(path),
            (None, Some(url)) => Ok(ImageInput::Url(url.clone())),
            (None, None) => bail!("Either --image or --image-url is required"),
        }
    }
}

/// Mime type for the common image extensions
fn mime_type(path: &Path) -> Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "png" => Ok("image/png"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        "bmp" => Ok("image/bmp"),
        other => bail!(
            "Unsupported image type '{}' for {} (use jpg, png, webp, gif or bmp)",
            other,
            path.display()
        ),
    }
}

/// Reads a local file and base64-encodes it
pub fn encode_file(path: &Path) -> Result<ImageInput> {
    let mime_type = mime_type(path)?;
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    if bytes.is_empty() {
        bail!("Image file {} is empty", path.display());
    }

    Ok(ImageInput::Inline {
        mime_type: mime_type.to_string(),
        base64_data: STANDARD.encode(bytes),
    })
}

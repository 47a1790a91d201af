//! Result fetcher
//!
//! Streams a finished artifact onto disk. The destination either receives the
//! complete file or is left untouched: bytes go to a hidden `.part` sibling
//! that is only renamed into place after the transfer has been verified.

use framecast_client::{AdapterError, ArtifactStream, ProviderAdapter};
use framecast_core::ResultLocator;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::retry::IsRetryable;

/// Errors while retrieving or writing an artifact
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transfer truncated: expected {expected} bytes, received {received}")]
    LengthMismatch { expected: u64, received: u64 },

    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Adapter(e) => e.is_transient(),
            FetchError::LengthMismatch { .. } => true,
            FetchError::Io { .. } | FetchError::DestinationExists(_) => false,
        }
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> FetchError + '_ {
    move |source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Temporary file removed on drop unless it was committed
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl PartFile {
    fn beside(destination: &Path) -> Self {
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact".to_string());
        let part_name = format!(".{}.{}.part", name, Uuid::new_v4());

        Self {
            path: destination.with_file_name(part_name),
            committed: false,
        }
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove partial download")
            }
        }
    }
}

/// Downloads artifacts through a provider adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultFetcher;

impl ResultFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Resolves `locator` and writes the artifact to `destination`
    ///
    /// # Returns
    /// Number of bytes written
    pub async fn fetch(
        &self,
        adapter: &dyn ProviderAdapter,
        locator: &ResultLocator,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        Self::ensure_vacant(destination).await?;

        let stream = adapter
            .resolve_and_fetch(locator)
            .await
            .map_err(AdapterError::into_delivery_error)?;

        self.write(stream, destination).await
    }

    /// Fails if something already exists at `destination`
    pub async fn ensure_vacant(destination: &Path) -> Result<(), FetchError> {
        let exists = fs::try_exists(destination)
            .await
            .map_err(io_error(destination))?;
        if exists {
            return Err(FetchError::DestinationExists(destination.to_path_buf()));
        }
        Ok(())
    }

    /// Writes a stream to `destination` all-or-nothing
    pub async fn write(
        &self,
        mut stream: ArtifactStream,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }

        let mut part = PartFile::beside(destination);
        let mut file = File::create(&part.path)
            .await
            .map_err(io_error(&part.path))?;

        let mut received: u64 = 0;
        while let Some(chunk) = stream
            .next_chunk()
            .await
            .map_err(AdapterError::into_delivery_error)?
        {
            file.write_all(&chunk).await.map_err(io_error(&part.path))?;
            received += chunk.len() as u64;
        }

        match stream.content_length() {
            Some(expected) if expected != received => {
                return Err(FetchError::LengthMismatch { expected, received });
            }
            _ => {}
        }

        file.flush().await.map_err(io_error(&part.path))?;
        file.sync_all().await.map_err(io_error(&part.path))?;
        drop(file);

        // Re-check right before the rename; rename would silently replace it
        Self::ensure_vacant(destination).await?;
        fs::rename(&part.path, destination)
            .await
            .map_err(io_error(destination))?;
        part.committed = true;

        debug!(path = %destination.display(), bytes = received, "Artifact written");
        Ok(received)
    }
}

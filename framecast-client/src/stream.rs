//! Artifact byte stream
//!
//! The body of a finished artifact, read chunk by chunk so the caller can
//! write it out without buffering the whole video in memory.

use std::collections::VecDeque;

use crate::error::{AdapterError, Result};

/// Chunked artifact body with an optional advertised length
#[derive(Debug)]
pub struct ArtifactStream {
    content_length: Option<u64>,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Http(reqwest::Response),
    Memory(VecDeque<Result<Vec<u8>>>),
}

impl ArtifactStream {
    /// Wraps a successful HTTP response
    pub fn from_response(response: reqwest::Response) -> Self {
        Self {
            content_length: response.content_length(),
            body: Body::Http(response),
        }
    }

    /// Builds a stream from pre-computed chunks
    ///
    /// Useful for providers that return the artifact inline and for tests
    /// that need a transfer failing midway.
    pub fn from_chunks(
        chunks: impl IntoIterator<Item = Result<Vec<u8>>>,
        content_length: Option<u64>,
    ) -> Self {
        Self {
            content_length,
            body: Body::Memory(chunks.into_iter().collect()),
        }
    }

    /// Length advertised by the provider, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Returns the next chunk, or `None` once the body is exhausted
    pub async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        match &mut self.body {
            Body::Http(response) => {
                let chunk = response.chunk().await.map_err(AdapterError::from)?;
                Ok(chunk.map(|bytes| bytes.to_vec()))
            }
            Body::Memory(chunks) => chunks.pop_front().transpose(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_stream_yields_chunks_in_order() {
        let mut stream =
            ArtifactStream::from_chunks(vec![Ok(b"ab".to_vec()), Ok(b"cd".to_vec())], Some(4));

        assert_eq!(stream.content_length(), Some(4));
        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"ab".to_vec()));
        assert_eq!(stream.next_chunk().await.unwrap(), Some(b"cd".to_vec()));
        assert_eq!(stream.next_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_stream_surfaces_errors() {
        let mut stream = ArtifactStream::from_chunks(
            vec![
                Ok(b"ab".to_vec()),
                Err(AdapterError::from_status(502, "reset")),
            ],
            None,
        );

        assert!(stream.next_chunk().await.unwrap().is_some());
        assert!(stream.next_chunk().await.is_err());
    }
}

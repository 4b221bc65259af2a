use super::{Emitter, encode_head, finish_chunks, write_chunk};
use crate::logging::{trace, warn};
use crate::{Error, HttpResponse, ResponseBody, Result};
use async_trait::async_trait;
use bytes::BytesMut;
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Chunked emitter for stream-backed bodies.
///
/// Stream items are coalesced and written as chunks of exactly
/// `chunk_size` bytes; only the final chunk may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct BufferedStreamEmitter {
    chunk_size: usize,
}

impl BufferedStreamEmitter {
    /// A zero chunk size is raised to one byte.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for BufferedStreamEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

#[async_trait]
impl Emitter for BufferedStreamEmitter {
    fn can_emit(&self, response: &HttpResponse) -> bool {
        matches!(response.body, ResponseBody::Stream(_))
    }

    async fn emit(
        &self,
        response: HttpResponse,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        let HttpResponse {
            status,
            headers,
            body,
        } = response;
        let ResponseBody::Stream(mut stream) = body else {
            return Err(Error::Internal(
                "buffered emitter given a non-stream body".to_string(),
            ));
        };

        let extra = [("Transfer-Encoding", "chunked".to_string())];
        writer.write_all(&encode_head(status, &headers, &extra)).await?;

        let mut buffer = BytesMut::with_capacity(self.chunk_size);
        let mut chunks = 0usize;
        while let Some(item) = stream.next().await {
            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => {
                    // Headers are out; the only signal left is an unterminated body.
                    warn!(error = %e, chunks, "Body stream failed mid-response");
                    writer.flush().await?;
                    return Err(e);
                }
            };

            buffer.extend_from_slice(&bytes);
            while buffer.len() >= self.chunk_size {
                let chunk = buffer.split_to(self.chunk_size);
                write_chunk(&mut *writer, &chunk).await?;
                chunks += 1;
            }
        }

        if !buffer.is_empty() {
            write_chunk(&mut *writer, &buffer).await?;
            chunks += 1;
        }
        finish_chunks(&mut *writer).await?;

        trace!(status, chunks, "Emitted streamed response");
        Ok(())
    }
}

use super::{Emitter, encode_head, is_bodyless};
use crate::logging::trace;
use crate::{Error, HttpResponse, ResponseBody, Result};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Single-shot emitter for fully buffered bodies.
///
/// Writes `Content-Length` and the whole body at once. Statuses that cannot
/// carry a body (1xx, 204, 304) are written head-only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SapiEmitter;

#[async_trait]
impl Emitter for SapiEmitter {
    fn can_emit(&self, response: &HttpResponse) -> bool {
        matches!(response.body, ResponseBody::Full(_))
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
        let ResponseBody::Full(bytes) = body else {
            return Err(Error::Internal(
                "single-shot emitter given a streamed body".to_string(),
            ));
        };

        let bodyless = is_bodyless(status);
        let extra = if bodyless {
            Vec::new()
        } else {
            vec![("Content-Length", bytes.len().to_string())]
        };

        writer.write_all(&encode_head(status, &headers, &extra)).await?;
        if !bodyless {
            writer.write_all(&bytes).await?;
        }
        writer.flush().await?;

        trace!(status, bytes = bytes.len(), "Emitted response");
        Ok(())
    }
}

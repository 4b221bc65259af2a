//! Stream-backed response bodies.
//!
//! A [`ByteStream`] is the body of a response that is produced incrementally
//! (large downloads, proxied bodies, generated reports). Responses carrying
//! one are written by the
//! [`BufferedStreamEmitter`](crate::emitter::BufferedStreamEmitter), which
//! coalesces items into fixed-size chunks.
//!
//! ```ignore
//! use girder_core::{HttpResponse, streaming::ByteStream};
//!
//! let (stream, sender) = ByteStream::new();
//! tokio::spawn(async move {
//!     for i in 0..100 {
//!         if sender.send(format!("line {}\n", i)).await.is_err() {
//!             break;
//!         }
//!     }
//! });
//! let response = HttpResponse::stream(stream).content_type("text/plain");
//! ```

use crate::Error;
use bytes::Bytes;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A stream of raw bytes for streaming responses.
///
/// The stream ends when every [`ByteStreamSender`] has been dropped.
pub struct ByteStream {
    receiver: mpsc::Receiver<Result<Bytes, Error>>,
}

/// Sender half of a byte stream.
#[derive(Clone)]
pub struct ByteStreamSender {
    sender: mpsc::Sender<Result<Bytes, Error>>,
    bytes_sent: Arc<AtomicU64>,
}

impl ByteStream {
    /// Create a new byte stream with default buffer size (64).
    pub fn new() -> (Self, ByteStreamSender) {
        Self::with_buffer_size(64)
    }

    /// Create a new byte stream with custom buffer size.
    pub fn with_buffer_size(size: usize) -> (Self, ByteStreamSender) {
        let (sender, receiver) = mpsc::channel(size.max(1));
        (
            Self { receiver },
            ByteStreamSender {
                sender,
                bytes_sent: Arc::new(AtomicU64::new(0)),
            },
        )
    }

    /// A finished stream yielding `chunks` in order.
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        let chunks: Vec<Bytes> = chunks.into_iter().map(Into::into).collect();
        let (sender, receiver) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk, so this cannot fail.
            let _ = sender.try_send(Ok(chunk));
        }
        Self { receiver }
    }
}

impl Stream for ByteStream {
    type Item = Result<Bytes, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl ByteStreamSender {
    /// Send bytes to the stream.
    pub async fn send(&self, data: impl Into<Bytes>) -> Result<(), Error> {
        let bytes = data.into();
        let len = bytes.len() as u64;
        self.sender
            .send(Ok(bytes))
            .await
            .map_err(|_| Error::Internal("stream receiver dropped".to_string()))?;
        self.bytes_sent.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }

    /// Abort the stream with an error; the emitter stops writing.
    pub async fn send_error(&self, error: Error) -> Result<(), Error> {
        self.sender
            .send(Err(error))
            .await
            .map_err(|_| Error::Internal("stream receiver dropped".to_string()))
    }

    /// Get the total bytes sent so far.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    /// Check if the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Stream data from an async reader (e.g., file, network).
pub fn stream_reader<R>(reader: R, chunk_size: usize) -> (ByteStream, tokio::task::JoinHandle<()>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    use tokio::io::AsyncReadExt;

    let (stream, sender) = ByteStream::new();
    let handle = tokio::spawn(async move {
        let mut reader = reader;
        let mut buffer = vec![0u8; chunk_size.max(1)];

        loop {
            match reader.read(&mut buffer).await {
                Ok(0) => break,
                Ok(n) => {
                    if sender.send(Bytes::copy_from_slice(&buffer[..n])).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = sender.send_error(Error::Io(e)).await;
                    break;
                }
            }
        }
    });
    (stream, handle)
}

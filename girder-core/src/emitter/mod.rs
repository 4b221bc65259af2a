//! Writing responses to the transport.
//!
//! The body variant alone decides how a response is written:
//!
//! - [`ResponseBody::Full`](crate::ResponseBody::Full): [`SapiEmitter`], one
//!   write with `Content-Length`
//! - [`ResponseBody::Stream`](crate::ResponseBody::Stream):
//!   [`BufferedStreamEmitter`], chunked transfer encoding in fixed-size chunks
//! - [`ResponseBody::EventStream`](crate::ResponseBody::EventStream):
//!   [`EventStreamEmitter`], every event flushed as soon as it is produced
//!
//! Output is HTTP/1.1 to any `tokio::io::AsyncWrite`.

mod buffered;
mod event_stream;
mod sapi;

pub use buffered::{BufferedStreamEmitter, DEFAULT_CHUNK_SIZE};
pub use event_stream::EventStreamEmitter;
pub use sapi::SapiEmitter;

use crate::status::reason_phrase;
use crate::{HttpResponse, ResponseBody, Result};
use async_trait::async_trait;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io;
use std::time::SystemTime;
use tokio::io::{AsyncWrite, AsyncWriteExt};

#[async_trait]
pub trait Emitter: Send + Sync {
    /// Whether this emitter writes responses shaped like `response`.
    fn can_emit(&self, response: &HttpResponse) -> bool;

    /// Write `response` to `writer`.
    async fn emit(&self, response: HttpResponse, writer: &mut (dyn AsyncWrite + Unpin + Send))
        -> Result<()>;
}

/// The three emitters, picked per response by body variant.
#[derive(Debug, Clone, Default)]
pub struct EmitterStack {
    sapi: SapiEmitter,
    buffered: BufferedStreamEmitter,
    event_stream: EventStreamEmitter,
}

impl EmitterStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.buffered = BufferedStreamEmitter::new(chunk_size);
        self
    }

    pub fn select(&self, response: &HttpResponse) -> &dyn Emitter {
        match response.body {
            ResponseBody::Full(_) => &self.sapi,
            ResponseBody::Stream(_) => &self.buffered,
            ResponseBody::EventStream(_) => &self.event_stream,
        }
    }

    pub async fn emit(
        &self,
        response: HttpResponse,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        self.select(&response).emit(response, writer).await
    }

    /// Write only the head `emit` would write for `response`, as the answer
    /// to a `HEAD` request. The body is dropped unread.
    pub async fn emit_head(
        &self,
        response: HttpResponse,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        let HttpResponse {
            status,
            headers,
            body,
        } = response;
        let extra = match &body {
            ResponseBody::Full(_) if is_bodyless(status) => Vec::new(),
            ResponseBody::Full(bytes) => vec![("Content-Length", bytes.len().to_string())],
            ResponseBody::Stream(_) | ResponseBody::EventStream(_) => {
                vec![("Transfer-Encoding", "chunked".to_string())]
            }
        };
        writer.write_all(&encode_head(status, &headers, &extra)).await?;
        writer.flush().await?;
        Ok(())
    }
}

/// Statuses that never carry a body (1xx, 204, 304).
pub(crate) fn is_bodyless(status: u16) -> bool {
    (100..200).contains(&status) || status == 204 || status == 304
}

/// Headers the emitters manage themselves; a response's own values are
/// dropped.
const FRAMING_HEADERS: [&str; 2] = ["content-length", "transfer-encoding"];

/// Serialize the status line and headers, adding `Date` and `extra`.
pub(crate) fn encode_head(status: u16, headers: &HashMap<String, String>, extra: &[(&str, String)]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {} {}\r\n", status, reason_phrase(status));

    let mut names: Vec<&String> = headers
        .keys()
        .filter(|name| !FRAMING_HEADERS.contains(&name.to_ascii_lowercase().as_str()))
        .filter(|name| !extra.iter().any(|(e, _)| e.eq_ignore_ascii_case(name)))
        .collect();
    names.sort();

    if !headers.keys().any(|name| name.eq_ignore_ascii_case("date")) {
        head.push_str(&format!("Date: {}\r\n", httpdate::fmt_http_date(SystemTime::now())));
    }
    for name in names {
        head.push_str(&format!("{}: {}\r\n", single_line(name), single_line(&headers[name])));
    }
    for (name, value) in extra {
        head.push_str(&format!("{}: {}\r\n", name, single_line(value)));
    }
    head.push_str("\r\n");
    head.into_bytes()
}

/// Header text with CR and LF removed, so a value cannot end its line early.
fn single_line(text: &str) -> Cow<'_, str> {
    if text.contains(['\r', '\n']) {
        Cow::Owned(text.replace(['\r', '\n'], ""))
    } else {
        Cow::Borrowed(text)
    }
}

/// Write one chunk in chunked transfer encoding.
pub(crate) async fn write_chunk<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    if data.is_empty() {
        return Ok(());
    }
    writer.write_all(format!("{:X}\r\n", data.len()).as_bytes()).await?;
    writer.write_all(data).await?;
    writer.write_all(b"\r\n").await
}

/// Terminating zero-length chunk.
pub(crate) async fn finish_chunks<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(b"0\r\n\r\n").await?;
    writer.flush().await
}

/// Write failures that mean the client went away.
pub(crate) fn is_disconnect(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
    )
}

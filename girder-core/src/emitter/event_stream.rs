use super::{Emitter, encode_head, finish_chunks, is_disconnect, write_chunk};
use crate::logging::{debug, trace, warn};
use crate::{Error, HttpResponse, ResponseBody, Result};
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;

/// Unbuffered emitter for server-sent events.
///
/// Each event is written and flushed as soon as the producer sends it. The
/// connection lives until the producer finishes, the client disconnects, or
/// the stream's time-to-live runs out; a stream without a TTL has no limit.
///
/// The TTL bounds every write, the terminating chunk included. A client
/// that stops reading cannot hold the emitter past it: when a write is cut
/// short the message is left incomplete and `emit` fails with
/// `TimedOut`, telling the caller to drop the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventStreamEmitter;

/// `None` and `Duration::MAX` both mean "no limit".
fn time_limit(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|ttl| *ttl != Duration::MAX)
}

/// Run `write` until `deadline`; `None` when the deadline cut it short.
///
/// The write is polled once even past the deadline, so a transport with
/// room still accepts it.
async fn bounded<F>(deadline: Option<Instant>, write: F) -> Option<io::Result<()>>
where
    F: Future<Output = io::Result<()>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, write).await.ok(),
        None => Some(write.await),
    }
}

fn expired(events: usize) -> Error {
    warn!(events, "Event stream time-to-live ran out mid-write, dropping connection");
    Error::Io(io::Error::new(
        io::ErrorKind::TimedOut,
        "event stream time-to-live ran out before the response was complete",
    ))
}

#[async_trait]
impl Emitter for EventStreamEmitter {
    fn can_emit(&self, response: &HttpResponse) -> bool {
        matches!(response.body, ResponseBody::EventStream(_))
    }

    async fn emit(
        &self,
        response: HttpResponse,
        writer: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<()> {
        let HttpResponse {
            status,
            mut headers,
            body,
        } = response;
        let ResponseBody::EventStream(mut stream) = body else {
            return Err(Error::Internal(
                "event stream emitter given a non-event body".to_string(),
            ));
        };
        let deadline = time_limit(stream.ttl()).and_then(|ttl| Instant::now().checked_add(ttl));

        headers.retain(|name, _| {
            !name.eq_ignore_ascii_case("content-type") && !name.eq_ignore_ascii_case("cache-control")
        });
        let extra = [
            ("Content-Type", "text/event-stream".to_string()),
            ("Cache-Control", "no-cache".to_string()),
            ("X-Accel-Buffering", "no".to_string()),
            ("Transfer-Encoding", "chunked".to_string()),
        ];

        let head = encode_head(status, &headers, &extra);
        let opened = bounded(deadline, async {
            writer.write_all(&head).await?;
            writer.flush().await
        })
        .await;
        match opened {
            Some(Ok(())) => {}
            Some(Err(e)) if is_disconnect(&e) => {
                debug!("Client gone before event stream opened");
                return Ok(());
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(expired(0)),
        }

        let mut events = 0usize;
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, stream.next_event()).await {
                    Ok(next) => next,
                    Err(_) => {
                        debug!(events, "Event stream reached its time-to-live");
                        break;
                    }
                },
                None => stream.next_event().await,
            };
            let Some(event) = next else {
                trace!(events, "Event stream finished");
                break;
            };

            let frame = event.encode();
            let written = bounded(deadline, async {
                write_chunk(&mut *writer, frame.as_bytes()).await?;
                writer.flush().await
            })
            .await;
            match written {
                Some(Ok(())) => events += 1,
                Some(Err(e)) if is_disconnect(&e) => {
                    debug!(events, "Client disconnected from event stream");
                    return Ok(());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Err(expired(events)),
            }
        }

        match bounded(deadline, finish_chunks(&mut *writer)).await {
            Some(Ok(())) => Ok(()),
            Some(Err(e)) if is_disconnect(&e) => Ok(()),
            Some(Err(e)) => Err(e.into()),
            None => Err(expired(events)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::test_support::{FailingWriter, dechunk, split_message};
    use crate::sse::{EventStream, ServerSentEvent};

    #[tokio::test]
    async fn test_writes_each_event_as_a_chunk() {
        let (stream, sender) = EventStream::new();
        sender.send(ServerSentEvent::with_event("tick", "1")).await.unwrap();
        sender.send_message("2").await.unwrap();
        drop(sender);

        let mut output = Vec::new();
        EventStreamEmitter
            .emit(HttpResponse::event_stream(stream), &mut output)
            .await
            .unwrap();

        let (head, body) = split_message(&output);
        assert!(head.contains("\r\nContent-Type: text/event-stream"));
        assert!(head.contains("\r\nCache-Control: no-cache"));
        assert!(head.contains("\r\nTransfer-Encoding: chunked"));

        let (sizes, data) = dechunk(&body);
        assert_eq!(sizes.len(), 2);
        assert_eq!(
            String::from_utf8(data).unwrap(),
            "event: tick\ndata: 1\n\ndata: 2\n\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_bounds_an_idle_stream() {
        let (stream, sender) = EventStream::new();
        let stream = stream.with_ttl(Duration::from_secs(30));
        sender.send_message("hello").await.unwrap();

        let mut output = Vec::new();
        EventStreamEmitter
            .emit(HttpResponse::event_stream(stream), &mut output)
            .await
            .unwrap();

        // The producer is still alive; only the TTL ended the emission.
        assert!(sender.is_closed());
        let (_, body) = split_message(&output);
        let (_, data) = dechunk(&body);
        assert_eq!(data, b"data: hello\n\n");
    }

    #[tokio::test]
    async fn test_disconnect_ends_emission_normally() {
        let (stream, sender) = EventStream::new();
        sender.send_message("lost").await.unwrap();

        let mut writer = FailingWriter(io::ErrorKind::BrokenPipe);
        let result = EventStreamEmitter
            .emit(HttpResponse::event_stream(stream), &mut writer)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_other_io_errors_propagate() {
        let (stream, _sender) = EventStream::new();

        let mut writer = FailingWriter(io::ErrorKind::PermissionDenied);
        let result = EventStreamEmitter
            .emit(HttpResponse::event_stream(stream), &mut writer)
            .await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_bounds_a_client_that_stops_reading() {
        let (stream, sender) = EventStream::new();
        let stream = stream.with_ttl(Duration::from_secs(5));
        sender.send_message("x".repeat(1024)).await.unwrap();

        // Room for the head, not for the event; nobody reads the other end.
        let (_client, mut server) = tokio::io::duplex(512);
        let started = Instant::now();
        let result = tokio::time::timeout(
            Duration::from_secs(3600),
            EventStreamEmitter.emit(HttpResponse::event_stream(stream), &mut server),
        )
        .await
        .expect("emitter outlived its time-to-live");

        match result {
            Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("expected a timed-out write, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_secs(5));
        assert!(started.elapsed() < Duration::from_secs(3600));
    }

    #[test]
    fn test_unbounded_ttl() {
        assert_eq!(time_limit(None), None);
        assert_eq!(time_limit(Some(Duration::MAX)), None);
        assert_eq!(time_limit(Some(Duration::from_secs(5))), Some(Duration::from_secs(5)));
    }
}

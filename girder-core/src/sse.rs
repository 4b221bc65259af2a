// Server-Sent Events (SSE) support for Girder

use crate::Error;
use std::time::Duration;
use tokio::sync::mpsc;

/// Server-Sent Event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSentEvent {
    /// Event ID (optional)
    pub id: Option<String>,
    /// Event type (optional)
    pub event: Option<String>,
    /// Event data
    pub data: String,
    /// Retry interval in milliseconds (optional)
    pub retry: Option<u64>,
    /// Comment line, used for keep-alives
    pub comment: Option<String>,
}

impl ServerSentEvent {
    /// Create a new SSE with just data
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Create a new SSE with data and event type
    pub fn with_event(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
            ..Self::default()
        }
    }

    /// A comment-only frame; clients ignore it, proxies see traffic.
    pub fn comment(text: impl Into<String>) -> Self {
        Self {
            comment: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn retry(mut self, millis: u64) -> Self {
        self.retry = Some(millis);
        self
    }

    /// Encode as a `text/event-stream` frame.
    ///
    /// Data is split on every line ending the format knows (`\r\n`, `\r`,
    /// `\n`), and empty data still yields a `data:` line so the client
    /// dispatches the event. Line breaks in the other fields are dropped.
    pub fn encode(&self) -> String {
        let mut output = String::new();

        if let Some(ref comment) = self.comment {
            output.push_str(&format!(": {}\n", single_line(comment)));
        }

        if let Some(ref id) = self.id {
            output.push_str(&format!("id: {}\n", single_line(id)));
        }

        if let Some(ref event) = self.event {
            output.push_str(&format!("event: {}\n", single_line(event)));
        }

        // A bare comment is a keep-alive, not an event.
        if !(self.data.is_empty() && self.comment.is_some()) {
            let data = self.data.replace("\r\n", "\n").replace('\r', "\n");
            for line in data.split('\n') {
                output.push_str(&format!("data: {}\n", line));
            }
        }

        if let Some(retry) = self.retry {
            output.push_str(&format!("retry: {}\n", retry));
        }

        output.push('\n');
        output
    }
}

fn single_line(field: &str) -> String {
    field.replace(['\r', '\n'], "")
}

/// Body of a server-sent-events response.
///
/// `ttl` bounds how long the emitter keeps the connection open; `None` means
/// the stream lives until the producer finishes or the client disconnects.
pub struct EventStream {
    receiver: mpsc::Receiver<ServerSentEvent>,
    ttl: Option<Duration>,
}

/// Producer half of an [`EventStream`].
#[derive(Clone)]
pub struct EventStreamSender {
    sender: mpsc::Sender<ServerSentEvent>,
}

impl EventStream {
    /// Create an unbounded-lifetime event stream.
    pub fn new() -> (Self, EventStreamSender) {
        let (sender, receiver) = mpsc::channel(100);
        (
            Self {
                receiver,
                ttl: None,
            },
            EventStreamSender { sender },
        )
    }

    /// Bound the connection lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Next event, `None` once every sender is gone.
    pub async fn next_event(&mut self) -> Option<ServerSentEvent> {
        self.receiver.recv().await
    }
}

impl EventStreamSender {
    /// Send an event
    pub async fn send(&self, event: ServerSentEvent) -> Result<(), Error> {
        self.sender
            .send(event)
            .await
            .map_err(|e| Error::Internal(format!("Failed to send SSE: {}", e)))
    }

    /// Send a simple message
    pub async fn send_message(&self, data: impl Into<String>) -> Result<(), Error> {
        self.send(ServerSentEvent::new(data)).await
    }

    /// Send JSON data
    pub async fn send_json<T: serde::Serialize>(&self, data: &T) -> Result<(), Error> {
        let json = serde_json::to_string(data).map_err(|e| Error::Serialization(e.to_string()))?;
        self.send_message(json).await
    }

    /// Send a keep-alive comment
    pub async fn send_keep_alive(&self) -> Result<(), Error> {
        self.send(ServerSentEvent::comment("keep-alive")).await
    }

    /// Whether the emitter has stopped reading (client gone or TTL reached).
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

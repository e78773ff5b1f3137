use async_trait::async_trait;
use eventsource_client::{self as es, Client};
use futures_util::stream::{BoxStream, StreamExt};
use std::fmt;

/// One frame off the wire, before JSON parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFrame {
    /// Keep-alive comment; carries nothing.
    Comment,
    /// A `data:` payload.
    Data(String),
}

#[derive(Debug)]
pub enum TransportError {
    Connect(String),
    Stream(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "failed to connect: {msg}"),
            TransportError::Stream(msg) => write!(f, "stream error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Source of raw frames. The production implementation speaks SSE over HTTP;
/// tests script their own sequences.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self) -> Result<BoxStream<'static, Result<RawFrame, TransportError>>, TransportError>;
}

/// SSE transport over `eventsource-client`. The library's own retry loop is
/// disabled; reconnection belongs to the connector's state machine.
pub struct EventSourceTransport {
    url: String,
    token: String,
}

impl EventSourceTransport {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            url: format!("{}/events/stream", base_url.trim_end_matches('/')),
            token: token.to_string(),
        }
    }
}

#[async_trait]
impl Transport for EventSourceTransport {
    async fn open(
        &self,
    ) -> Result<BoxStream<'static, Result<RawFrame, TransportError>>, TransportError> {
        let client = es::ClientBuilder::for_url(&self.url)
            .map_err(|e| TransportError::Connect(e.to_string()))?
            .header("Authorization", &format!("Bearer {}", self.token))
            .map_err(|e| TransportError::Connect(e.to_string()))?
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build();

        let stream = client
            .stream()
            .map(|item| match item {
                Ok(es::SSE::Event(event)) => Ok(RawFrame::Data(event.data)),
                Ok(es::SSE::Comment(_)) => Ok(RawFrame::Comment),
                Err(e) => Err(TransportError::Stream(e.to_string())),
            })
            .boxed();

        Ok(stream)
    }
}

// In-memory host ports backed by tokio channels
//
// Each constructor returns a pair: the port is handed to the dispatcher and
// implements the host traits, the handle stays with whoever plays the host
// (a transport adapter or a test).

use crate::host::{
    BodyChunk, LifespanChannel, LifespanEvent, LifespanReply, RequestChannel, ResponseEvent,
};
use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// Create a connected lifespan port/handle pair.
pub fn lifespan() -> (LifespanPort, LifespanHandle) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (replies_tx, replies_rx) = mpsc::unbounded_channel();
    (
        LifespanPort {
            events: events_rx,
            replies: replies_tx,
        },
        LifespanHandle {
            events: Some(events_tx),
            replies: replies_rx,
        },
    )
}

/// Dispatcher side of a lifespan conversation.
#[derive(Debug)]
pub struct LifespanPort {
    events: mpsc::UnboundedReceiver<LifespanEvent>,
    replies: mpsc::UnboundedSender<LifespanReply>,
}

#[async_trait]
impl LifespanChannel for LifespanPort {
    async fn receive(&mut self) -> Option<LifespanEvent> {
        self.events.recv().await
    }

    async fn send(&mut self, reply: LifespanReply) -> Result<(), Error> {
        self.replies
            .send(reply)
            .map_err(|_| Error::Disconnected("lifespan reply channel closed".into()))
    }
}

/// Host side of a lifespan conversation.
#[derive(Debug)]
pub struct LifespanHandle {
    events: Option<mpsc::UnboundedSender<LifespanEvent>>,
    replies: mpsc::UnboundedReceiver<LifespanReply>,
}

impl LifespanHandle {
    /// Send `Startup` and wait for the dispatcher's answer.
    pub async fn startup(&mut self) -> Result<LifespanReply, Error> {
        self.exchange(LifespanEvent::Startup).await
    }

    /// Send `Shutdown` and wait for the dispatcher's answer.
    pub async fn shutdown(&mut self) -> Result<LifespanReply, Error> {
        self.exchange(LifespanEvent::Shutdown).await
    }

    pub fn send(&self, event: LifespanEvent) -> Result<(), Error> {
        self.events
            .as_ref()
            .ok_or_else(|| Error::Disconnected("lifespan event channel closed".into()))?
            .send(event)
            .map_err(|_| Error::Disconnected("dispatcher stopped listening".into()))
    }

    pub async fn reply(&mut self) -> Result<LifespanReply, Error> {
        self.replies
            .recv()
            .await
            .ok_or_else(|| Error::Disconnected("dispatcher stopped replying".into()))
    }

    /// Stop sending events; the dispatcher's receive loop then ends.
    pub fn close(&mut self) {
        self.events = None;
    }

    async fn exchange(&mut self, event: LifespanEvent) -> Result<LifespanReply, Error> {
        self.send(event)?;
        self.reply().await
    }
}

/// Create a connected request port/handle pair for one connection.
pub fn request() -> (RequestPort, RequestHandle) {
    let (chunks_tx, chunks_rx) = mpsc::unbounded_channel();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    (
        RequestPort {
            chunks: chunks_rx,
            events: events_tx,
        },
        RequestHandle {
            chunks: Some(chunks_tx),
            events: events_rx,
        },
    )
}

/// Dispatcher side of a request conversation.
#[derive(Debug)]
pub struct RequestPort {
    chunks: mpsc::UnboundedReceiver<BodyChunk>,
    events: mpsc::UnboundedSender<ResponseEvent>,
}

#[async_trait]
impl RequestChannel for RequestPort {
    async fn receive(&mut self) -> Result<BodyChunk, Error> {
        self.chunks
            .recv()
            .await
            .ok_or_else(|| Error::Disconnected("request body stream closed".into()))
    }

    async fn send(&mut self, event: ResponseEvent) -> Result<(), Error> {
        self.events
            .send(event)
            .map_err(|_| Error::Disconnected("response channel closed".into()))
    }
}

/// Response collected from a request conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(Bytes, Bytes)>,
    pub body: Bytes,
}

/// Host side of a request conversation.
#[derive(Debug)]
pub struct RequestHandle {
    chunks: Option<mpsc::UnboundedSender<BodyChunk>>,
    events: mpsc::UnboundedReceiver<ResponseEvent>,
}

impl RequestHandle {
    /// Queue a body chunk. Chunks the dispatcher never pulls are dropped.
    pub fn send_chunk(&self, chunk: BodyChunk) -> Result<(), Error> {
        self.chunks
            .as_ref()
            .ok_or_else(|| Error::Disconnected("request body stream closed".into()))?
            .send(chunk)
            .map_err(|_| Error::Disconnected("dispatcher stopped reading".into()))
    }

    /// Queue the whole body as a single final chunk.
    pub fn send_body(&self, body: impl Into<Bytes>) -> Result<(), Error> {
        self.send_chunk(BodyChunk::last(body))
    }

    /// Abort the connection; a pending body pull fails.
    pub fn disconnect(&mut self) {
        self.chunks = None;
    }

    pub async fn next_event(&mut self) -> Option<ResponseEvent> {
        self.events.recv().await
    }

    /// Wait for the `Start` and `Body` events of the response.
    pub async fn response(&mut self) -> Result<WireResponse, Error> {
        let Some(ResponseEvent::Start { status, headers }) = self.next_event().await else {
            return Err(Error::Protocol("expected a response start event".into()));
        };
        let Some(ResponseEvent::Body { body }) = self.next_event().await else {
            return Err(Error::Protocol("expected a response body event".into()));
        };
        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}

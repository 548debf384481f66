//! The contract between the dispatcher and the hosting runtime.
//!
//! A host drives two independent conversations. The lifespan conversation
//! carries `Startup` then `Shutdown` in and the matching completion (or
//! failure) replies out. Each accepted connection gets its own request
//! conversation: the [`Scope`] is handed over once, body chunks are pulled
//! until `more_body` is false, and exactly one `Start` then one `Body`
//! event are sent back.

use crate::Error;
use async_trait::async_trait;
use bytes::Bytes;
use std::net::SocketAddr;

/// Per-connection request metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub method: String,
    /// Decoded path without the query string.
    pub path: String,
    /// Raw query string, without the leading `?`.
    pub query_string: Bytes,
    /// Header name/value pairs exactly as received.
    pub headers: Vec<(Bytes, Bytes)>,
    pub client: Option<SocketAddr>,
}

impl Scope {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<Bytes>) -> Self {
        self.query_string = query.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_client(mut self, client: SocketAddr) -> Self {
        self.client = Some(client);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifespanEvent {
    Startup,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifespanReply {
    StartupComplete,
    StartupFailed { message: String },
    ShutdownComplete,
    ShutdownFailed { message: String },
}

/// One pulled piece of the request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyChunk {
    pub body: Bytes,
    pub more_body: bool,
}

impl BodyChunk {
    pub fn last(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            more_body: false,
        }
    }

    pub fn more(body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            more_body: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    Start {
        status: u16,
        headers: Vec<(Bytes, Bytes)>,
    },
    Body {
        body: Bytes,
    },
}

/// Lifespan side of the host.
#[async_trait]
pub trait LifespanChannel: Send {
    /// Next lifespan event, or `None` once the host has stopped sending.
    async fn receive(&mut self) -> Option<LifespanEvent>;

    async fn send(&mut self, reply: LifespanReply) -> Result<(), Error>;
}

/// Request side of the host, scoped to one connection.
#[async_trait]
pub trait RequestChannel: Send {
    /// Pull the next body chunk. Fails with [`Error::Disconnected`] when the
    /// host aborts the connection.
    async fn receive(&mut self) -> Result<BodyChunk, Error>;

    async fn send(&mut self, event: ResponseEvent) -> Result<(), Error>;
}

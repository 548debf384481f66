// Test client driving an App over in-memory host ports

use bytes::Bytes;
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use tether_core::channel::{self, LifespanHandle, WireResponse};
use tether_core::{App, BodyChunk, Error, LifespanPhase, LifespanReply, MultiMap, Scope};
use tokio::task::JoinHandle;

/// A started application.
///
/// [`TestClient::start`] runs the lifespan startup, requests are then served
/// one at a time with [`TestClient::send`], and [`TestClient::shutdown`]
/// runs the shutdown hooks.
pub struct TestClient {
    app: Arc<App>,
    lifespan: LifespanHandle,
    task: JoinHandle<Result<LifespanPhase, Error>>,
    startup_failure: Option<String>,
}

impl TestClient {
    pub async fn start(app: App) -> Result<Self, Error> {
        Self::start_shared(Arc::new(app)).await
    }

    pub async fn start_shared(app: Arc<App>) -> Result<Self, Error> {
        let (mut port, mut lifespan) = channel::lifespan();
        let task = tokio::spawn({
            let app = Arc::clone(&app);
            async move { app.run_lifespan(&mut port).await }
        });

        let startup_failure = match lifespan.startup().await? {
            LifespanReply::StartupFailed { message } => Some(message),
            _ => None,
        };

        Ok(Self {
            app,
            lifespan,
            task,
            startup_failure,
        })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// The startup failure message, if startup failed.
    pub fn startup_failure(&self) -> Option<&str> {
        self.startup_failure.as_deref()
    }

    /// Serve one request.
    ///
    /// After a failed startup every request answers with the failure message
    /// and status 500, the way a host reports it.
    pub async fn send(&self, request: TestRequest) -> Result<TestResponse, Error> {
        if let Some(message) = &self.startup_failure {
            return Ok(TestResponse::lifespan_failure(message));
        }

        let (mut port, mut handle) = channel::request();
        for chunk in request.chunks() {
            handle.send_chunk(chunk)?;
        }
        self.app.handle(request.into_scope(), &mut port).await?;
        handle.response().await.map(TestResponse::from_wire)
    }

    pub async fn get(&self, path: &str) -> Result<TestResponse, Error> {
        self.send(TestRequest::get(path)).await
    }

    pub async fn post(&self, path: &str, body: impl Into<Bytes>) -> Result<TestResponse, Error> {
        self.send(TestRequest::post(path).body(body)).await
    }

    /// Run the shutdown hooks and wait for the lifespan task.
    ///
    /// After a failed startup no shutdown is sent and the startup failure is
    /// returned instead.
    pub async fn shutdown(mut self) -> Result<LifespanReply, Error> {
        let reply = match self.startup_failure.take() {
            Some(message) => LifespanReply::StartupFailed { message },
            None => self.lifespan.shutdown().await?,
        };
        self.lifespan.close();
        self.task
            .await
            .map_err(|e| Error::Disconnected(format!("lifespan task failed: {}", e)))??;
        Ok(reply)
    }
}

/// Run one full startup, request, shutdown cycle.
///
/// A lifespan failure, at startup or at shutdown, is reported as a 500
/// response whose body is the failure message.
pub async fn request(app: App, request: TestRequest) -> Result<TestResponse, Error> {
    let client = TestClient::start(app).await?;
    let response = client.send(request).await?;

    match client.shutdown().await? {
        LifespanReply::StartupFailed { message } | LifespanReply::ShutdownFailed { message } => {
            Ok(TestResponse::lifespan_failure(&message))
        }
        _ => Ok(response),
    }
}

/// Builder for test requests.
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: String,
    path: String,
    query: Bytes,
    headers: Vec<(Bytes, Bytes)>,
    body: Bytes,
    chunk_size: Option<usize>,
    client: Option<SocketAddr>,
}

impl TestRequest {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            query: Bytes::new(),
            headers: Vec::new(),
            body: Bytes::new(),
            chunk_size: None,
            client: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    /// Raw query string, without the leading `?`.
    pub fn query(mut self, query: impl Into<Bytes>) -> Self {
        self.query = query.into();
        self
    }

    pub fn header(mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body with a matching content type.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header("content-type", "application/json")
            .body(body))
    }

    /// Url-encoded form body with a matching content type.
    pub fn form(self, body: impl Into<Bytes>) -> Self {
        self.header("content-type", "application/x-www-form-urlencoded")
            .body(body)
    }

    /// Deliver the body in chunks of at most `size` bytes.
    pub fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    pub fn client(mut self, addr: SocketAddr) -> Self {
        self.client = Some(addr);
        self
    }

    fn chunks(&self) -> Vec<BodyChunk> {
        let size = match self.chunk_size {
            Some(size) if self.body.len() > size => size,
            _ => return vec![BodyChunk::last(self.body.clone())],
        };

        let mut chunks: Vec<BodyChunk> = (0..self.body.len())
            .step_by(size)
            .map(|start| {
                let end = (start + size).min(self.body.len());
                BodyChunk::more(self.body.slice(start..end))
            })
            .collect();
        if let Some(last) = chunks.last_mut() {
            last.more_body = false;
        }
        chunks
    }

    fn into_scope(self) -> Scope {
        Scope {
            method: self.method,
            path: self.path,
            query_string: self.query,
            headers: self.headers,
            client: self.client,
        }
    }
}

/// Response observed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResponse {
    pub status: u16,
    pub headers: MultiMap,
    pub body: Bytes,
}

impl TestResponse {
    fn from_wire(wire: WireResponse) -> Self {
        let headers = wire
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(name).into_owned(),
                    String::from_utf8_lossy(value).into_owned(),
                )
            })
            .collect();
        Self {
            status: wire.status,
            headers,
            body: wire.body,
        }
    }

    fn lifespan_failure(message: &str) -> Self {
        let mut headers = MultiMap::new();
        headers.insert("content-length", message.len().to_string());
        Self {
            status: 500,
            headers,
            body: Bytes::copy_from_slice(message.as_bytes()),
        }
    }

    /// Last value of a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn header_all(&self, name: &str) -> &[String] {
        self.headers.get_all(name)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

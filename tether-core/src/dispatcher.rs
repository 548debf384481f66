// Request pipeline
//
// Stages run strictly in order: header decode, cookie parse, body
// accumulation, body decode, before-middleware, routing. Any of them may end
// the pipeline early with a response; every response, early or not, then
// passes through the after-middleware and is serialized.

use crate::body::{self, DecodedBody};
use crate::handler::{AfterMiddleware, Handler};
use crate::host::{RequestChannel, ResponseEvent, Scope};
use crate::routing::{CompiledRoutes, Resolution};
use crate::{App, Cookies, Error, MultiMap, Request, Response};
use bytes::{Bytes, BytesMut};
use std::ops::ControlFlow;
use tracing::{debug, error, trace};

/// Unwrap a stage result or return its early response.
macro_rules! proceed {
    ($stage:expr) => {
        match $stage {
            ControlFlow::Continue(value) => value,
            ControlFlow::Break(response) => return Ok(response),
        }
    };
}

impl App {
    /// Serve one request conversation.
    ///
    /// Client errors become 4xx responses. A fault raised by a handler or
    /// before-middleware, or an invalid reply, is returned to the host and
    /// nothing is sent.
    pub async fn handle<C>(&self, scope: Scope, channel: &mut C) -> Result<(), Error>
    where
        C: RequestChannel + ?Sized,
    {
        let routes = self.compiled.get().ok_or(Error::NotStarted)?;

        let mut request = Request::new(&scope.method, scope.path);
        request.args = body::parse_query(&scope.query_string);
        request.client = scope.client;
        request.state = self.state();

        let response = self
            .respond(&mut request, &scope.headers, channel, routes)
            .await?;
        let mut response = self.run_after(&mut request, response).await;

        let (status, headers) = response.to_wire();
        debug!(method = %request.method, path = %request.path, status, "response");
        channel.send(ResponseEvent::Start { status, headers }).await?;
        channel
            .send(ResponseEvent::Body {
                body: Bytes::from(response.body),
            })
            .await
    }

    async fn respond<C>(
        &self,
        request: &mut Request,
        raw_headers: &[(Bytes, Bytes)],
        channel: &mut C,
        routes: &CompiledRoutes,
    ) -> Result<Response, Error>
    where
        C: RequestChannel + ?Sized,
    {
        request.headers = proceed!(decode_headers(raw_headers));
        request.cookies = proceed!(parse_cookies(&request.headers));
        request.body = proceed!(self.read_body(channel).await?);
        proceed!(decode_body(request));
        proceed!(self.run_before(request).await?);
        self.dispatch(request, routes).await
    }

    async fn read_body<C>(&self, channel: &mut C) -> Result<ControlFlow<Response, Bytes>, Error>
    where
        C: RequestChannel + ?Sized,
    {
        let limit = self.config.max_body_size;
        let mut body = BytesMut::new();

        loop {
            let chunk = channel.receive().await?;
            body.extend_from_slice(&chunk.body);
            trace!(received = body.len(), more = chunk.more_body, "body chunk");

            if body.len() > limit {
                debug!(received = body.len(), limit, "request body too large");
                return Ok(ControlFlow::Break(Response::new(413)));
            }
            if !chunk.more_body {
                return Ok(ControlFlow::Continue(body.freeze()));
            }
        }
    }

    async fn run_before(&self, request: &mut Request) -> Result<ControlFlow<Response>, Error> {
        for middleware in &self.before {
            let reply = middleware.call(request).await?;
            if !reply.is_empty() {
                debug!(path = %request.path, "before-middleware responded early");
                return Ok(ControlFlow::Break(reply.into_response()?));
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    async fn dispatch(&self, request: &mut Request, routes: &CompiledRoutes) -> Result<Response, Error> {
        match routes.resolve(&request.method, &request.path) {
            Resolution::Matched { handler, params } => {
                request.params = params;
                handler.call(request).await?.into_response()
            }
            Resolution::NotFound => {
                debug!(path = %request.path, "no route");
                Ok(Response::new(404))
            }
            Resolution::MethodNotAllowed { allow } => {
                debug!(method = %request.method, path = %request.path, %allow, "method not allowed");
                Ok(Response::new(405).with_headers([("allow", allow)]))
            }
        }
    }

    /// Run the after-middleware chain. A fault or invalid reply ends the
    /// chain with a 500 response.
    async fn run_after(&self, request: &mut Request, mut response: Response) -> Response {
        for middleware in &self.after {
            let replacement = match middleware.call(request, &mut response).await {
                Ok(reply) if reply.is_empty() => continue,
                Ok(reply) => reply.into_response(),
                Err(fault) => Err(Error::Fault(fault)),
            };
            match replacement {
                Ok(replacement) => response = replacement,
                Err(err) => {
                    error!(error = %err, path = %request.path, "after-middleware failed");
                    return Response::new(500);
                }
            }
        }
        response
    }
}

fn decode_headers(raw: &[(Bytes, Bytes)]) -> ControlFlow<Response, MultiMap> {
    let mut headers = MultiMap::with_capacity(raw.len());
    for (name, value) in raw {
        let (Ok(name), Ok(value)) = (std::str::from_utf8(name), std::str::from_utf8(value)) else {
            debug!("undecodable request header");
            return ControlFlow::Break(Response::new(400));
        };
        headers.append(name, value);
    }
    ControlFlow::Continue(headers)
}

fn parse_cookies(headers: &MultiMap) -> ControlFlow<Response, Cookies> {
    let raw = headers.get_all("cookie");
    if raw.is_empty() {
        return ControlFlow::Continue(Cookies::new());
    }
    match Cookies::parse(&raw.join("; ")) {
        Ok(cookies) => ControlFlow::Continue(cookies),
        Err(err) => {
            debug!(error = %err, "malformed cookie header");
            ControlFlow::Break(Response::new(400))
        }
    }
}

fn decode_body(request: &mut Request) -> ControlFlow<Response> {
    match body::decode_body(request.content_type(), &request.body) {
        Ok(DecodedBody::Json(value)) => request.json = Some(value),
        Ok(DecodedBody::Form(form)) => request.form = form,
        Ok(DecodedBody::Raw) => {}
        Err(err) => {
            debug!(error = %err, "undecodable request body");
            return ControlFlow::Break(Response::new(400));
        }
    }
    ControlFlow::Continue(())
}

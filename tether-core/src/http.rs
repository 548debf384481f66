// HTTP request and response envelopes

use crate::{Cookie, CookieJar, Cookies, Error, MultiMap, State};
use bytes::Bytes;
use http::StatusCode;
use std::collections::HashMap;
use std::net::SocketAddr;

pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Standard reason phrase for `status`, empty for unregistered codes.
pub fn reason_phrase(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("")
}

/// Inbound request, enriched stage by stage as the pipeline runs.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Upper-cased method token.
    pub method: String,
    /// Decoded path without the query string.
    pub path: String,
    /// Named captures of the matched route pattern.
    pub params: HashMap<String, String>,
    pub args: MultiMap,
    pub headers: MultiMap,
    pub cookies: Cookies,
    pub body: Bytes,
    pub json: Option<serde_json::Value>,
    pub form: MultiMap,
    /// Private shallow copy of the process-wide state.
    pub state: State,
    pub client: Option<SocketAddr>,
}

impl Request {
    pub fn new(method: impl AsRef<str>, path: impl Into<String>) -> Self {
        Self {
            method: method.as_ref().to_ascii_uppercase(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Last query argument value for `name`
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args.get(name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name)
    }

    pub fn content_type(&self) -> &str {
        self.headers.get("content-type").unwrap_or("")
    }
}

/// Outgoing response.
///
/// A response with an empty body and an error status (400..600) carries the
/// status reason phrase as its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: MultiMap,
    pub cookies: CookieJar,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self::with_body(status, Vec::new())
    }

    pub fn with_body(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let mut response = Self {
            status,
            headers: MultiMap::new(),
            cookies: CookieJar::new(),
            body: body.into(),
        };
        response.headers.set_default("content-type", DEFAULT_CONTENT_TYPE);
        response.fill_error_body();
        response
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn no_content() -> Self {
        Self::new(204)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::with_body(200, body.into())
    }

    /// 200 response carrying a JSON document.
    pub fn json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        let body = crate::json::to_vec(value)
            .map_err(|e| Error::InvalidReply(format!("unserializable JSON: {}", e)))?;
        let mut response = Self::with_body(200, body);
        response.headers.insert("content-type", "application/json");
        Ok(response)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.headers.insert(name.as_ref(), value);
        }
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.set(cookie);
        self
    }

    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.cookies.set(cookie);
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    fn fill_error_body(&mut self) {
        if self.body.is_empty() && (400..600).contains(&self.status) {
            self.body = reason_phrase(self.status).as_bytes().to_vec();
        }
    }

    /// Flatten into wire form: the status plus one `(name, value)` pair per
    /// header value, `content-length` recomputed, then one `set-cookie` pair per cookie.
    pub fn to_wire(&mut self) -> (u16, Vec<(Bytes, Bytes)>) {
        self.fill_error_body();
        self.headers
            .insert("content-length", self.body.len().to_string());

        let mut pairs: Vec<(Bytes, Bytes)> = self
            .headers
            .pairs()
            .map(|(name, value)| {
                (
                    Bytes::copy_from_slice(name.to_ascii_lowercase().as_bytes()),
                    Bytes::copy_from_slice(value.as_bytes()),
                )
            })
            .collect();
        pairs.extend(
            self.cookies
                .header_values()
                .map(|value| (Bytes::from_static(b"set-cookie"), Bytes::from(value))),
        );

        (self.status, pairs)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}

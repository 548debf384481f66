//! Normalization of handler and middleware return values.
//!
//! Every callable returns a [`Reply`]; [`Reply::into_response`] maps it onto
//! a canonical [`Response`]:
//!
//! | Reply               | Response                                         |
//! |---------------------|--------------------------------------------------|
//! | `Empty` / `()`      | 204, empty body                                  |
//! | `Json` null or `[]` | 204, empty body                                  |
//! | `Status(n)` / `u16` | status `n`, reason phrase as body                |
//! | `Text` / `&str`     | 200, text body                                   |
//! | `Bytes` / `Vec<u8>` | 200, raw body                                    |
//! | `Json` (an object)  | 200, `content-type: application/json`            |
//! | `Response`          | unchanged                                        |
//!
//! A `Json` reply that is neither an object nor one of the empty values
//! above, or a status outside 100..=999, is a programming error and fails
//! with [`Error::InvalidReply`] / [`Error::InvalidStatus`] instead of being
//! coerced. A reply for which [`Reply::is_empty`] holds never fails.

use crate::http::reason_phrase;
use crate::{Error, Response};
use bytes::Bytes;
use http::StatusCode;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Empty,
    Status(u16),
    Text(String),
    Bytes(Bytes),
    Json(serde_json::Value),
    Response(Response),
}

impl Reply {
    /// Whether a middleware returning this value lets the pipeline continue.
    pub fn is_empty(&self) -> bool {
        match self {
            Reply::Empty => true,
            Reply::Text(text) => text.is_empty(),
            Reply::Bytes(bytes) => bytes.is_empty(),
            Reply::Json(value) => is_empty_json(value),
            Reply::Status(_) | Reply::Response(_) => false,
        }
    }

    pub fn into_response(self) -> Result<Response, Error> {
        match self {
            Reply::Empty => Ok(Response::no_content()),
            Reply::Status(status) => {
                StatusCode::from_u16(status).map_err(|_| Error::InvalidStatus(status))?;
                Ok(Response::with_body(status, reason_phrase(status)))
            }
            Reply::Text(text) => Ok(Response::text(text)),
            Reply::Bytes(bytes) => Ok(Response::with_body(200, bytes.to_vec())),
            Reply::Json(value @ serde_json::Value::Object(_)) => Response::json(&value),
            Reply::Json(value) if is_empty_json(&value) => Ok(Response::no_content()),
            Reply::Json(other) => Err(Error::InvalidReply(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Reply::Response(response) => Ok(response),
        }
    }
}

fn is_empty_json(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Empty
    }
}

impl From<u16> for Reply {
    fn from(status: u16) -> Self {
        Reply::Status(status)
    }
}

impl From<StatusCode> for Reply {
    fn from(status: StatusCode) -> Self {
        Reply::Status(status.as_u16())
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Reply::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for Reply {
    fn from(bytes: &'static [u8]) -> Self {
        Reply::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Reply::Bytes(bytes)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::Json(value)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Reply {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Reply::Json(serde_json::Value::Object(map))
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reply::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_is_no_content() {
        let response = Reply::from(()).into_response().unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_status_uses_reason_phrase() {
        let response = Reply::from(404u16).into_response().unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.body, b"Not Found".to_vec());

        let response = Reply::from(StatusCode::CREATED).into_response().unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.body, b"Created".to_vec());
    }

    #[test]
    fn test_invalid_status_rejected() {
        assert!(matches!(
            Reply::Status(42).into_response(),
            Err(Error::InvalidStatus(42))
        ));
    }

    #[test]
    fn test_text_and_bytes() {
        let response = Reply::from("hello").into_response().unwrap();
        assert_eq!((response.status, response.body), (200, b"hello".to_vec()));

        let response = Reply::from(vec![0u8, 1, 2]).into_response().unwrap();
        assert_eq!((response.status, response.body), (200, vec![0u8, 1, 2]));
    }

    #[test]
    fn test_json_object() {
        let response = Reply::from(json!({"hello": "world"})).into_response().unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.headers.get("content-type"), Some("application/json"));
        assert_eq!(response.body, br#"{"hello": "world"}"#.to_vec());
    }

    #[test]
    fn test_json_non_object_is_programming_error() {
        assert!(matches!(
            Reply::from(json!([1, 2])).into_response(),
            Err(Error::InvalidReply(_))
        ));
    }

    #[test]
    fn test_response_passthrough() {
        let original = Response::with_body(418, "short and stout");
        let response = Reply::from(original.clone()).into_response().unwrap();
        assert_eq!(response, original);
    }

    #[test]
    fn test_option_none_is_empty() {
        assert_eq!(Reply::from(None::<String>), Reply::Empty);
        assert_eq!(Reply::from(Some("x")), Reply::Text("x".into()));
    }

    #[test]
    fn test_is_empty() {
        assert!(Reply::Empty.is_empty());
        assert!(Reply::from("").is_empty());
        assert!(Reply::from(json!({})).is_empty());
        assert!(!Reply::from("early").is_empty());
        assert!(!Reply::from(Response::no_content()).is_empty());
        assert!(!Reply::Status(200).is_empty());
        assert!(!Reply::from(json!([1])).is_empty());
    }

    #[test]
    fn test_json_null_is_no_content() {
        let reply = Reply::from(serde_json::Value::Null);
        assert!(reply.is_empty());

        let response = reply.into_response().unwrap();
        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_empty_json_array_is_no_content() {
        let reply = Reply::from(json!([]));
        assert!(reply.is_empty());
        assert_eq!(reply.into_response().unwrap().status, 204);
    }

    #[test]
    fn test_empty_replies_always_normalize() {
        let replies = [
            Reply::Empty,
            Reply::from(""),
            Reply::from(Bytes::new()),
            Reply::from(json!(null)),
            Reply::from(json!([])),
            Reply::from(json!({})),
            Reply::from("text"),
            Reply::from(json!([1, 2])),
            Reply::from(json!("str")),
            Reply::Status(204),
            Reply::from(Response::ok()),
        ];
        for reply in replies {
            if reply.is_empty() {
                assert!(reply.clone().into_response().is_ok(), "{:?}", reply);
            }
        }
    }
}

//! Query string and request body decoding.
//!
//! Both query strings and url-encoded forms use the same pair rules: `&`
//! separates pairs, `+` is a space, percent-escapes are decoded, and pairs
//! without a value (`flag`, `flag=`) are dropped. Repeated keys are kept in
//! order.

use crate::MultiMap;
use std::borrow::Cow;
use thiserror::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A declared body type that failed to decode.
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("Failed to parse JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse form data: {0}")]
    Form(String),
}

/// Result of decoding a body against its content type.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    Json(serde_json::Value),
    Form(MultiMap),
    /// Any other content type; the body stays raw.
    Raw,
}

/// Decode `body` according to `content_type`.
pub fn decode_body(content_type: &str, body: &[u8]) -> Result<DecodedBody, BodyError> {
    if content_type.contains(JSON_CONTENT_TYPE) {
        let value = serde_json::from_slice(body)?;
        Ok(DecodedBody::Json(value))
    } else if content_type.contains(FORM_CONTENT_TYPE) {
        parse_form(body).map(DecodedBody::Form)
    } else {
        Ok(DecodedBody::Raw)
    }
}

/// Parse a url-encoded form body.
///
/// The body must be UTF-8 text; anything else is a decode failure.
pub fn parse_form(body: &[u8]) -> Result<MultiMap, BodyError> {
    std::str::from_utf8(body)
        .map_err(|e| BodyError::Form(format!("body is not valid UTF-8: {}", e)))?;

    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(body).map_err(|e| BodyError::Form(e.to_string()))?;

    Ok(pairs
        .into_iter()
        .filter(|(key, value)| !key.is_empty() && !value.is_empty())
        .collect())
}

/// Parse a raw query string. Never fails: invalid UTF-8 is replaced.
pub fn parse_query(raw: &[u8]) -> MultiMap {
    let mut args = MultiMap::new();

    for part in raw.split(|&b| b == b'&') {
        let Some(eq) = part.iter().position(|&b| b == b'=') else {
            continue;
        };
        let (key, value) = (&part[..eq], &part[eq + 1..]);
        if key.is_empty() || value.is_empty() {
            continue;
        }
        args.append(&decode_component(key), decode_component(value));
    }

    args
}

fn decode_component(raw: &[u8]) -> String {
    let plus_decoded: Cow<'_, [u8]> = if raw.contains(&b'+') {
        Cow::Owned(
            raw.iter()
                .map(|&b| if b == b'+' { b' ' } else { b })
                .collect(),
        )
    } else {
        Cow::Borrowed(raw)
    };
    let decoded = urlencoding::decode_binary(&plus_decoded);
    String::from_utf8_lossy(&decoded).into_owned()
}

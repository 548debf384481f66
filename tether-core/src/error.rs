// Error types for the Tether dispatcher

use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The host closed a channel, or aborted a pending body pull.
    #[error("Host disconnected: {0}")]
    Disconnected(String),

    #[error("Request received before startup completed")]
    NotStarted,

    #[error("Lifespan protocol violation: {0}")]
    Protocol(String),

    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    #[error("Invalid status code: {0}")]
    InvalidStatus(u16),

    #[error("Invalid route pattern `{pattern}`: {source}")]
    InvalidRoute {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Unhandled fault: {0}")]
    Fault(Fault),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Short name of the variant, used as a fault kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Disconnected(_) => "Disconnected",
            Error::NotStarted => "NotStarted",
            Error::Protocol(_) => "Protocol",
            Error::InvalidReply(_) => "InvalidReply",
            Error::InvalidStatus(_) => "InvalidStatus",
            Error::InvalidRoute { .. } => "InvalidRoute",
            Error::Fault(_) => "Fault",
            Error::Config(_) => "Config",
        }
    }
}

impl From<Fault> for Error {
    fn from(fault: Fault) -> Self {
        Error::Fault(fault)
    }
}

/// A failure raised by application code (a handler, middleware or lifespan hook).
///
/// Any [`std::error::Error`] converts into a `Fault` with `?`. The conversion keeps
/// the short type name of the source error as the fault *kind* and its display text
/// as the *detail*, so a failing hook reports e.g. `ParseIntError: invalid digit found in string`.
pub struct Fault {
    kind: Cow<'static, str>,
    detail: String,
}

impl Fault {
    pub fn new(kind: impl Into<Cow<'static, str>>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .finish()
    }
}

impl<E> From<E> for Fault
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self {
            kind: Cow::Borrowed(short_type_name::<E>()),
            detail: err.to_string(),
        }
    }
}

/// `core::num::error::ParseIntError` -> `ParseIntError`
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

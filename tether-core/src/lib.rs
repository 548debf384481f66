// Core library for the Tether HTTP application framework
// This crate contains the dispatcher, the envelope types and the host contract

pub mod application;
pub mod body;
pub mod channel;
pub mod config;
pub mod cookie;
mod dispatcher;
pub mod error;
pub mod handler;
pub mod host;
pub mod http;
pub mod json;
pub mod lifecycle;
pub mod logging;
pub mod multi_map;
pub mod reply;
pub mod routing;
pub mod state;

// Re-export commonly used types
pub use application::App;
pub use body::{BodyError, DecodedBody};
pub use config::Config;
pub use cookie::{Cookie, CookieJar, Cookies, MalformedCookie, SameSite};
pub use error::{Error, Fault};
pub use handler::{
    after_blocking, after_fn, blocking, from_fn, hook_blocking, hook_fn, AfterMiddleware, Handler,
    LifespanHook,
};
pub use host::{
    BodyChunk, LifespanChannel, LifespanEvent, LifespanReply, RequestChannel, ResponseEvent, Scope,
};
pub use lifecycle::LifespanPhase;
pub use multi_map::MultiMap;
pub use reply::Reply;
pub use routing::{Resolution, RouteTable};
pub use self::http::{reason_phrase, Request, Response, DEFAULT_CONTENT_TYPE};
pub use state::State;

/// `BoxFuture` for writing suspending closures with [`from_fn`] and friends.
pub use futures_util::future::BoxFuture;

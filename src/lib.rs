// Tether - a minimal HTTP application core for Rust
//
// An application registers routes, middleware and lifespan hooks, then a host
// drives it through two channels: one for startup/shutdown, one per request.

// Re-export core functionality
pub use tether_core::*;

// Re-export optional crates
#[cfg(feature = "testing")]
pub use tether_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        after_blocking, after_fn, blocking, from_fn, hook_blocking, hook_fn, App, BoxFuture,
        Config, Cookie, Error, Fault, MultiMap, Reply, Request, Response, SameSite, State,
    };
}

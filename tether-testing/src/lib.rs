//! Testing utilities for Tether applications.
//!
//! [`TestClient`] plays the host: it runs the lifespan startup over an
//! in-memory channel, serves requests through the full pipeline and runs
//! the shutdown hooks. [`request`] does all three for a single request.
//!
//! ```rust
//! use tether_core::{blocking, App, Request};
//! use tether_testing::*;
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new();
//! app.get("/hello", blocking(|_req: &mut Request| Ok("Hello!")));
//!
//! let response = request(app, TestRequest::get("/hello")).await.unwrap();
//! assert_status(&response, 200);
//! assert_body(&response, "Hello!");
//! # });
//! ```

pub mod assertions;
pub mod test_client;

pub use assertions::*;
pub use test_client::{request, TestClient, TestRequest, TestResponse};

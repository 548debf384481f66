// Callable capabilities for handlers, middleware and lifespan hooks
//
// Every registered callable sits behind one of three object-safe traits so
// the dispatcher never needs to know whether it suspends cooperatively or
// blocks. Suspending closures are wrapped with `from_fn` / `after_fn` /
// `hook_fn`; plain closures with `blocking` / `after_blocking` /
// `hook_blocking`, which run them on the blocking pool and move the
// request (or response, or state) back once they return.

use crate::{Fault, Reply, Request, Response, State};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::marker::PhantomData;
use std::sync::Arc;

/// A route handler or before-middleware.
///
/// Returning an empty [`Reply`] from a before-middleware lets the pipeline
/// continue; anything else short-circuits it.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, req: &mut Request) -> Result<Reply, Fault>;
}

/// Middleware run after the response has been produced.
///
/// A non-empty [`Reply`] replaces the current response.
#[async_trait]
pub trait AfterMiddleware: Send + Sync + 'static {
    async fn call(&self, req: &mut Request, res: &mut Response) -> Result<Reply, Fault>;
}

/// Startup or shutdown hook operating on the process-wide state.
#[async_trait]
pub trait LifespanHook: Send + Sync + 'static {
    async fn call(&self, state: &mut State) -> Result<(), Fault>;
}

pub type SharedHandler = Arc<dyn Handler>;
pub type SharedAfterMiddleware = Arc<dyn AfterMiddleware>;
pub type SharedLifespanHook = Arc<dyn LifespanHook>;

#[async_trait]
impl<H: Handler + ?Sized> Handler for Arc<H> {
    async fn call(&self, req: &mut Request) -> Result<Reply, Fault> {
        (**self).call(req).await
    }
}

/// Handler backed by a suspending closure.
pub struct FnHandler<F, R> {
    f: F,
    _reply: PhantomData<fn() -> R>,
}

/// Wrap a closure returning a boxed future.
///
/// ```rust
/// use tether_core::{from_fn, Request};
///
/// let hello = from_fn(|req: &mut Request| {
///     Box::pin(async move { Ok(format!("hello {}", req.path)) })
/// });
/// # let _ = hello;
/// ```
pub fn from_fn<F, R>(f: F) -> FnHandler<F, R>
where
    F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Result<R, Fault>> + Send + Sync + 'static,
    R: Into<Reply> + 'static,
{
    FnHandler {
        f,
        _reply: PhantomData,
    }
}

#[async_trait]
impl<F, R> Handler for FnHandler<F, R>
where
    F: for<'a> Fn(&'a mut Request) -> BoxFuture<'a, Result<R, Fault>> + Send + Sync + 'static,
    R: Into<Reply> + 'static,
{
    async fn call(&self, req: &mut Request) -> Result<Reply, Fault> {
        (self.f)(req).await.map(Into::into)
    }
}

/// Handler backed by a plain closure run on the blocking pool.
pub struct BlockingHandler<F, R> {
    f: Arc<F>,
    _reply: PhantomData<fn() -> R>,
}

pub fn blocking<F, R>(f: F) -> BlockingHandler<F, R>
where
    F: Fn(&mut Request) -> Result<R, Fault> + Send + Sync + 'static,
    R: Into<Reply> + Send + 'static,
{
    BlockingHandler {
        f: Arc::new(f),
        _reply: PhantomData,
    }
}

#[async_trait]
impl<F, R> Handler for BlockingHandler<F, R>
where
    F: Fn(&mut Request) -> Result<R, Fault> + Send + Sync + 'static,
    R: Into<Reply> + Send + 'static,
{
    async fn call(&self, req: &mut Request) -> Result<Reply, Fault> {
        let f = Arc::clone(&self.f);
        let mut owned = std::mem::take(req);
        let (owned, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut owned);
            (owned, result)
        })
        .await?;
        *req = owned;
        result.map(Into::into)
    }
}

/// After-middleware backed by a suspending closure.
pub struct FnAfter<F, R> {
    f: F,
    _reply: PhantomData<fn() -> R>,
}

pub fn after_fn<F, R>(f: F) -> FnAfter<F, R>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<R, Fault>>
        + Send
        + Sync
        + 'static,
    R: Into<Reply> + 'static,
{
    FnAfter {
        f,
        _reply: PhantomData,
    }
}

#[async_trait]
impl<F, R> AfterMiddleware for FnAfter<F, R>
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> BoxFuture<'a, Result<R, Fault>>
        + Send
        + Sync
        + 'static,
    R: Into<Reply> + 'static,
{
    async fn call(&self, req: &mut Request, res: &mut Response) -> Result<Reply, Fault> {
        (self.f)(req, res).await.map(Into::into)
    }
}

/// After-middleware backed by a plain closure run on the blocking pool.
pub struct BlockingAfter<F, R> {
    f: Arc<F>,
    _reply: PhantomData<fn() -> R>,
}

pub fn after_blocking<F, R>(f: F) -> BlockingAfter<F, R>
where
    F: Fn(&mut Request, &mut Response) -> Result<R, Fault> + Send + Sync + 'static,
    R: Into<Reply> + Send + 'static,
{
    BlockingAfter {
        f: Arc::new(f),
        _reply: PhantomData,
    }
}

#[async_trait]
impl<F, R> AfterMiddleware for BlockingAfter<F, R>
where
    F: Fn(&mut Request, &mut Response) -> Result<R, Fault> + Send + Sync + 'static,
    R: Into<Reply> + Send + 'static,
{
    async fn call(&self, req: &mut Request, res: &mut Response) -> Result<Reply, Fault> {
        let f = Arc::clone(&self.f);
        let mut owned_req = std::mem::take(req);
        let mut owned_res = std::mem::take(res);
        let (owned_req, owned_res, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut owned_req, &mut owned_res);
            (owned_req, owned_res, result)
        })
        .await?;
        *req = owned_req;
        *res = owned_res;
        result.map(Into::into)
    }
}

/// Lifespan hook backed by a suspending closure.
pub struct FnHook<F> {
    f: F,
}

pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, Result<(), Fault>> + Send + Sync + 'static,
{
    FnHook { f }
}

#[async_trait]
impl<F> LifespanHook for FnHook<F>
where
    F: for<'a> Fn(&'a mut State) -> BoxFuture<'a, Result<(), Fault>> + Send + Sync + 'static,
{
    async fn call(&self, state: &mut State) -> Result<(), Fault> {
        (self.f)(state).await
    }
}

/// Lifespan hook backed by a plain closure run on the blocking pool.
pub struct BlockingHook<F> {
    f: Arc<F>,
}

pub fn hook_blocking<F>(f: F) -> BlockingHook<F>
where
    F: Fn(&mut State) -> Result<(), Fault> + Send + Sync + 'static,
{
    BlockingHook { f: Arc::new(f) }
}

#[async_trait]
impl<F> LifespanHook for BlockingHook<F>
where
    F: Fn(&mut State) -> Result<(), Fault> + Send + Sync + 'static,
{
    async fn call(&self, state: &mut State) -> Result<(), Fault> {
        let f = Arc::clone(&self.f);
        let mut owned = std::mem::take(state);
        let (owned, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut owned);
            (owned, result)
        })
        .await?;
        *state = owned;
        result
    }
}

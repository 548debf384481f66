// Application registration surface

use crate::handler::{
    AfterMiddleware, Handler, LifespanHook, SharedAfterMiddleware, SharedHandler,
    SharedLifespanHook,
};
use crate::lifecycle::LifespanPhase;
use crate::routing::{CompiledRoutes, RouteTable};
use crate::{Config, State};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// An application: routes, middleware, lifespan hooks and the process-wide
/// state they share.
///
/// Registration takes `&mut self` and happens before the app is shared; once
/// wrapped in an `Arc` the app only serves.
///
/// ```rust
/// use tether_core::{blocking, App, Request};
///
/// let mut app = App::new();
/// app.get("/", blocking(|_req: &mut Request| Ok("Hello, world!")));
/// app.route("/items", &["GET", "POST"], blocking(|req: &mut Request| Ok(req.method.clone())));
/// assert_eq!(app.routes().len(), 2);
/// ```
pub struct App {
    pub(crate) routes: RouteTable,
    pub(crate) startup: Vec<SharedLifespanHook>,
    pub(crate) shutdown: Vec<SharedLifespanHook>,
    pub(crate) before: Vec<SharedHandler>,
    pub(crate) after: Vec<SharedAfterMiddleware>,
    pub(crate) config: Config,
    pub(crate) state: RwLock<State>,
    pub(crate) phase: Mutex<LifespanPhase>,
    pub(crate) compiled: OnceLock<CompiledRoutes>,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            routes: RouteTable::new(),
            startup: Vec::new(),
            shutdown: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            config,
            state: RwLock::new(State::new()),
            phase: Mutex::new(LifespanPhase::WaitingStartup),
            compiled: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn max_body_size(&self) -> usize {
        self.config.max_body_size
    }

    pub fn set_max_body_size(&mut self, bytes: usize) -> &mut Self {
        self.config.max_body_size = bytes;
        self
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Current lifespan phase.
    pub fn phase(&self) -> LifespanPhase {
        *self.phase.lock()
    }

    /// Shallow copy of the process-wide state.
    pub fn state(&self) -> State {
        self.state.read().clone()
    }

    /// Seed the process-wide state before serving.
    pub fn state_mut(&mut self) -> &mut State {
        self.state.get_mut()
    }

    pub fn on_startup(&mut self, hook: impl LifespanHook) -> &mut Self {
        self.startup.push(Arc::new(hook));
        self
    }

    pub fn on_shutdown(&mut self, hook: impl LifespanHook) -> &mut Self {
        self.shutdown.push(Arc::new(hook));
        self
    }

    /// Middleware run before routing; a non-empty reply short-circuits.
    pub fn before(&mut self, middleware: impl Handler) -> &mut Self {
        self.before.push(Arc::new(middleware));
        self
    }

    /// Middleware run on every response; a non-empty reply replaces it.
    pub fn after(&mut self, middleware: impl AfterMiddleware) -> &mut Self {
        self.after.push(Arc::new(middleware));
        self
    }

    /// Register `handler` at `pattern` for each of `methods`.
    pub fn route(&mut self, pattern: impl Into<String>, methods: &[&str], handler: impl Handler) -> &mut Self {
        self.routes.add(pattern, methods, Arc::new(handler));
        self
    }

    pub fn get(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["GET"], handler)
    }

    pub fn post(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["POST"], handler)
    }

    pub fn put(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["PUT"], handler)
    }

    pub fn patch(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["PATCH"], handler)
    }

    pub fn delete(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["DELETE"], handler)
    }

    pub fn head(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["HEAD"], handler)
    }

    pub fn options(&mut self, pattern: impl Into<String>, handler: impl Handler) -> &mut Self {
        self.route(pattern, &["OPTIONS"], handler)
    }

    /// Merge `other` into this app under `prefix`.
    ///
    /// Its hooks and middleware run after this app's own, its routes are
    /// registered at `prefix + pattern`, and the larger of the two body
    /// limits is kept.
    pub fn mount(&mut self, other: App, prefix: &str) -> &mut Self {
        self.startup.extend(other.startup);
        self.shutdown.extend(other.shutdown);
        self.before.extend(other.before);
        self.after.extend(other.after);
        self.routes.merge(other.routes, prefix);
        self.config.max_body_size = self.config.max_body_size.max(other.config.max_body_size);
        self
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("routes", &self.routes)
            .field("startup", &self.startup.len())
            .field("shutdown", &self.shutdown.len())
            .field("before", &self.before.len())
            .field("after", &self.after.len())
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish()
    }
}

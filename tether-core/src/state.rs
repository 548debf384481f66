//! Process-wide application state.
//!
//! Startup and shutdown hooks write into the dispatcher-owned [`State`].
//! Each request receives a shallow copy: inserting or removing keys on the
//! copy never leaks into other requests, while values themselves are held in
//! `Arc`s and stay shared (a connection pool placed here at startup is the
//! same pool in every handler).
//!
//! ```rust
//! use std::sync::Mutex;
//! use tether_core::State;
//!
//! let mut state = State::new();
//! state.insert("greeting", String::from("hi"));
//! state.insert("hits", Mutex::new(0u32));
//!
//! let mut copy = state.clone();
//! copy.insert("greeting", String::from("bye"));
//! *copy.get::<Mutex<u32>>("hits").unwrap().lock().unwrap() += 1;
//!
//! assert_eq!(state.get::<String>("greeting").unwrap(), "hi");
//! assert_eq!(*state.get::<Mutex<u32>>("hits").unwrap().lock().unwrap(), 1);
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct State {
    map: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl State {
    #[inline]
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a value under `key`, replacing any previous value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: T) {
        self.map.insert(key.into(), Arc::new(value));
    }

    /// Insert an already shared value.
    pub fn insert_arc<T: Send + Sync + 'static>(&mut self, key: impl Into<String>, value: Arc<T>) {
        self.map.insert(key.into(), value);
    }

    /// Typed reference to the value under `key`.
    ///
    /// Returns `None` when the key is absent or holds another type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.map.get(key)?.downcast_ref::<T>()
    }

    /// Shared handle to the value under `key`.
    pub fn get_arc<T: Send + Sync + 'static>(&self, key: &str) -> Option<Arc<T>> {
        let value = Arc::clone(self.map.get(key)?);
        value.downcast::<T>().ok()
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.map.remove(key).is_some()
    }

    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.keys().collect();
        keys.sort_unstable();
        f.debug_struct("State").field("keys", &keys).finish()
    }
}

// Routing system for HTTP requests
//
// Routes are regular expressions matched against the whole request path.
// The table keeps declaration order and the first pattern that matches wins,
// whether or not it handles the request method.

use crate::handler::SharedHandler;
use crate::Error;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

/// One pattern and the handlers registered for it, in registration order.
#[derive(Clone)]
pub struct RouteEntry {
    pub pattern: String,
    pub methods: Vec<(String, SharedHandler)>,
}

impl RouteEntry {
    /// Comma-joined methods, as sent in an `allow` header.
    pub fn allow(&self) -> String {
        self.methods
            .iter()
            .map(|(method, _)| method.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn set(&mut self, method: String, handler: SharedHandler) {
        match self.methods.iter_mut().find(|(m, _)| *m == method) {
            Some(slot) => slot.1 = handler,
            None => self.methods.push((method, handler)),
        }
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("pattern", &self.pattern)
            .field("methods", &self.allow())
            .finish()
    }
}

/// Ordered, still mutable route registrations.
#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for each of `methods` at `pattern`.
    ///
    /// A pattern registered earlier keeps its position; the new methods are
    /// merged into it.
    pub fn add(&mut self, pattern: impl Into<String>, methods: &[&str], handler: SharedHandler) {
        let pattern = pattern.into();
        let index = match self.entries.iter().position(|e| e.pattern == pattern) {
            Some(index) => index,
            None => {
                self.entries.push(RouteEntry {
                    pattern,
                    methods: Vec::with_capacity(methods.len()),
                });
                self.entries.len() - 1
            }
        };

        let entry = &mut self.entries[index];
        for method in methods {
            entry.set(method.to_ascii_uppercase(), handler.clone());
        }
    }

    /// Append every entry of `other` under `prefix`.
    pub fn merge(&mut self, other: RouteTable, prefix: &str) {
        for entry in other.entries {
            let pattern = format!("{}{}", prefix, entry.pattern);
            for (method, handler) in entry.methods {
                self.add(pattern.clone(), &[method.as_str()], handler);
            }
        }
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compile every pattern as a full-path match.
    pub fn compile(&self) -> Result<CompiledRoutes, Error> {
        let routes = self
            .entries
            .iter()
            .map(|entry| -> Result<CompiledRoute, Error> {
                let regex = Regex::new(&format!("^(?:{})$", entry.pattern)).map_err(|source| {
                    Error::InvalidRoute {
                        pattern: entry.pattern.clone(),
                        source,
                    }
                })?;
                Ok(CompiledRoute {
                    regex,
                    entry: entry.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledRoutes { routes })
    }
}

struct CompiledRoute {
    regex: Regex,
    entry: RouteEntry,
}

/// Frozen route table used while serving.
pub struct CompiledRoutes {
    routes: Vec<CompiledRoute>,
}

/// Outcome of looking up a method and path.
pub enum Resolution<'a> {
    Matched {
        handler: &'a SharedHandler,
        params: HashMap<String, String>,
    },
    NotFound,
    MethodNotAllowed {
        allow: String,
    },
}

impl fmt::Debug for Resolution<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Matched { params, .. } => {
                f.debug_struct("Matched").field("params", params).finish()
            }
            Resolution::NotFound => f.write_str("NotFound"),
            Resolution::MethodNotAllowed { allow } => f
                .debug_struct("MethodNotAllowed")
                .field("allow", allow)
                .finish(),
        }
    }
}

impl CompiledRoutes {
    pub fn resolve(&self, method: &str, path: &str) -> Resolution<'_> {
        for route in &self.routes {
            let Some(captures) = route.regex.captures(path) else {
                continue;
            };

            let Some((_, handler)) = route.entry.methods.iter().find(|(m, _)| m == method) else {
                return Resolution::MethodNotAllowed {
                    allow: route.entry.allow(),
                };
            };

            let params = route
                .regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.to_string(), m.as_str().to_string()))
                })
                .collect();

            return Resolution::Matched { handler, params };
        }

        Resolution::NotFound
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl fmt::Debug for CompiledRoutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| &r.entry))
            .finish()
    }
}

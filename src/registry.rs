//! Handler registry and route declarations.

use http::Method;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::binder::FieldInfo;
use crate::router::MethodSet;
use crate::typed::ErasedHandler;

/// Separator allowed between several templates given as one string.
pub const TEMPLATE_SEPARATOR: char = ';';

/// A named, invocable route target.
#[derive(Clone)]
pub struct HandlerDescriptor {
    pub name: Arc<str>,
    pub handler: Arc<dyn ErasedHandler>,
}

impl HandlerDescriptor {
    #[must_use]
    pub fn new(name: &str, handler: Arc<dyn ErasedHandler>) -> Self {
        Self {
            name: Arc::from(name),
            handler,
        }
    }

    /// Flattened binding rules of the handler's parameters, in bind order.
    #[must_use]
    pub fn params(&self) -> &[FieldInfo] {
        self.handler.params()
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("params", &self.params().len())
            .finish()
    }
}

impl Serialize for HandlerDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HandlerDescriptor", 2)?;
        state.serialize_field("name", self.name.as_ref())?;
        state.serialize_field("params", self.params())?;
        state.end()
    }
}

/// Route name to descriptor.
#[derive(Default)]
pub struct Registry {
    handlers: HashMap<Arc<str>, HandlerDescriptor>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor. An existing one with the same name is replaced and returned.
    pub fn insert(&mut self, descriptor: HandlerDescriptor) -> Option<HandlerDescriptor> {
        let name = Arc::clone(&descriptor.name);
        let params = descriptor.params().len();
        let previous = self.handlers.insert(Arc::clone(&name), descriptor);
        if previous.is_some() {
            warn!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Replaced existing handler"
            );
        } else {
            info!(
                handler_name = %name,
                params,
                total_handlers = self.handlers.len(),
                "Handler registered"
            );
        }
        previous
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HandlerDescriptor> {
        self.handlers.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Declaration of one route: a name, an optional prefix, one or more
/// templates and the methods it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    name: String,
    prefix: String,
    paths: Vec<String>,
    methods: MethodSet,
}

impl RouteSpec {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            prefix: String::new(),
            paths: Vec::new(),
            methods: MethodSet::new(),
        }
    }

    /// Prefix joined in front of every template with a `/`.
    #[must_use]
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Add a template. `"/a;/b"` adds two.
    #[must_use]
    pub fn path(mut self, template: &str) -> Self {
        self.paths.extend(
            template
                .split(TEMPLATE_SEPARATOR)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        );
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.methods.insert(method);
        self
    }

    #[must_use]
    pub fn methods<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        for method in methods {
            self.methods.insert(method);
        }
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods, `GET` when none were given.
    #[must_use]
    pub fn effective_methods(&self) -> MethodSet {
        self.methods.clone().or_get()
    }

    /// Templates with the prefix applied, not yet normalized.
    #[must_use]
    pub fn templates(&self) -> Vec<String> {
        self.paths
            .iter()
            .map(|path| {
                if self.prefix.is_empty() {
                    path.clone()
                } else {
                    format!("{}/{}", self.prefix, path)
                }
            })
            .collect()
    }
}

/// Introspection record for one registered route.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RouteInfo {
    pub name: String,
    /// Cleaned templates
    pub templates: Vec<String>,
    pub methods: MethodSet,
}

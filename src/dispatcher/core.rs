use anyhow::Context;
use http::Method;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::request::{RequestContext, RequestData};
use super::response::{HandlerResponse, Reply};
use crate::binder::{Bindable, CasterTable, SessionStore, Sources, DEFAULT_CASTERS};
use crate::filter::{Filter, FilterChain, FilterPanic, PreHandle};
use crate::registry::{HandlerDescriptor, Registry, RouteInfo, RouteSpec};
use crate::router::{ParamVec, RouteError, RoutePattern, Router};
use crate::runtime_config::RuntimeConfig;
use crate::typed::{BoundHandler, ErasedHandler, Handler, HandlerFn};

/// Owns every compiled table and runs requests through them.
///
/// Registration takes `&mut self` and must finish before serving; afterwards
/// [`dispatch`](Self::dispatch) only needs `&self`, so one dispatcher can sit
/// behind an `Arc` and serve any number of threads.
pub struct Dispatcher {
    config: RuntimeConfig,
    router: Router<str>,
    registry: Registry,
    routes: Vec<RouteInfo>,
    filters: FilterChain,
    sessions: Option<Arc<dyn SessionStore>>,
    casters: CasterTable,
    fallback: Option<Arc<dyn ErasedHandler>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::with_config(RuntimeConfig::default())
    }
}

impl Dispatcher {
    /// Dispatcher configured from the environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            router: Router::with_policy(config.ambiguity),
            config,
            registry: Registry::new(),
            routes: Vec::new(),
            filters: FilterChain::new(),
            sessions: None,
            casters: DEFAULT_CASTERS.clone(),
            fallback: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn set_session_store(&mut self, store: Arc<dyn SessionStore>) {
        self.sessions = Some(store);
    }

    /// Caster overrides apply to handlers registered afterwards.
    pub fn casters_mut(&mut self) -> &mut CasterTable {
        &mut self.casters
    }

    /// Register a typed handler under every template of `spec`.
    ///
    /// The parameter schema is built here, once.
    ///
    /// # Errors
    ///
    /// Fails when any template does not compile. Nothing is registered in
    /// that case, not even the templates that did compile.
    pub fn register<H: Handler>(&mut self, spec: RouteSpec, handler: H) -> anyhow::Result<()> {
        let name: Arc<str> = Arc::from(spec.name());
        let methods = spec.effective_methods();
        let patterns = spec
            .templates()
            .into_iter()
            .map(|template| {
                RoutePattern::compile(&template)
                    .with_context(|| format!("route '{name}': invalid template '{template}'"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let templates: Vec<String> = patterns
            .into_iter()
            .map(|pattern| {
                self.router
                    .insert(pattern, &methods, Arc::clone(&name))
                    .to_string()
            })
            .collect();
        if templates.is_empty() {
            warn!(route_name = %name, "Route registered without templates");
        }

        let bound: Arc<dyn ErasedHandler> = Arc::new(BoundHandler::new(handler, &self.casters));
        self.registry.insert(HandlerDescriptor::new(&name, bound));
        info!(
            route_name = %name,
            methods = %methods,
            templates = ?templates,
            "Route registered"
        );
        self.routes.push(RouteInfo {
            name: name.to_string(),
            templates,
            methods,
        });
        Ok(())
    }

    /// Register a closure taking a bindable record.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn register_fn<P, R, F>(&mut self, spec: RouteSpec, f: F) -> anyhow::Result<()>
    where
        P: Bindable + Default,
        R: Into<Reply> + 'static,
        F: Fn(P) -> R + Send + Sync + 'static,
    {
        self.register(spec, HandlerFn::new(f))
    }

    /// Append a filter; it runs after every filter added before it.
    ///
    /// # Errors
    ///
    /// Fails when a template does not compile; the filter is not added.
    pub fn add_filter<F: Filter + 'static>(&mut self, spec: RouteSpec, filter: F) -> anyhow::Result<()> {
        self.filters
            .register(&spec, Arc::new(filter))
            .with_context(|| format!("filter '{}': invalid template", spec.name()))
    }

    /// Handler used instead of the 404 response.
    pub fn set_fallback<H: Handler>(&mut self, handler: H) {
        self.fallback = Some(Arc::new(BoundHandler::new(handler, &self.casters)));
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Registered routes, in registration order.
    #[must_use]
    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }

    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Log a summary of the compiled tables.
    pub fn log_summary(&self) {
        self.router.log_summary("routes");
        info!(
            handlers = self.registry.len(),
            filters = self.filters.len(),
            session_store = self.sessions.is_some(),
            "Dispatcher ready"
        );
    }

    /// Resolve `method` + `path` to a descriptor and its bound path variables.
    ///
    /// # Errors
    ///
    /// Routing errors, plus `MissingHandler` when the matched name has no
    /// registered descriptor.
    pub fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(HandlerDescriptor, ParamVec), RouteError> {
        let found = self.router.route(method, path)?;
        let descriptor = self
            .registry
            .get(&found.target)
            .cloned()
            .ok_or_else(|| RouteError::MissingHandler {
                name: Arc::clone(&found.target),
            })?;
        Ok((descriptor, found.path_params))
    }

    /// Run one request through filters, routing, binding and the handler.
    #[must_use]
    pub fn dispatch(&self, request: RequestData) -> HandlerResponse {
        let started = Instant::now();
        let base = RequestContext::new(Arc::new(request));
        let request_id = base.request_id();
        debug!(
            request_id = %request_id,
            method = %base.method(),
            path = %base.path(),
            "Dispatch start"
        );

        let pre = self.filters.run_pre(&base);
        if let Some(failure) = pre.panicked() {
            return filter_panic_response(failure);
        }
        let (ctx, mut response) = match pre.verdict {
            PreHandle::Abort => {
                return HandlerResponse::status_only(500);
            }
            PreHandle::Respond(ref reply) => (base, HandlerResponse::ok(reply.clone())),
            PreHandle::Continue => self.handle(base),
        };
        if let Err(failure) = self.filters.run_post(&pre, &ctx, &response) {
            response = filter_panic_response(&failure);
        }

        debug!(
            request_id = %request_id,
            status = response.status,
            route_name = ctx.route_name().unwrap_or("-"),
            latency_us = started.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        response
    }

    fn handle(&self, base: RequestContext) -> (RequestContext, HandlerResponse) {
        match self.resolve(base.method(), base.path()) {
            Ok((descriptor, params)) => {
                let ctx = base.with_route(Arc::clone(&descriptor.name), params);
                let response = self.invoke(&descriptor.name, descriptor.handler.as_ref(), &ctx);
                (ctx, response)
            }
            Err(err) => {
                if let (RouteError::NotFound { .. }, Some(fallback)) = (&err, &self.fallback) {
                    let response = self.invoke("fallback", fallback.as_ref(), &base);
                    return (base, response);
                }
                if matches!(err, RouteError::MissingHandler { .. }) {
                    error!(request_id = %base.request_id(), error = %err, "Route has no handler");
                }
                let response = HandlerResponse::from_route_error(&err);
                (base, response)
            }
        }
    }

    fn invoke(&self, name: &str, handler: &dyn ErasedHandler, ctx: &RequestContext) -> HandlerResponse {
        let mut sources = Sources::new(ctx);
        if let Some(store) = &self.sessions {
            let session_id = ctx.request().get_cookie(&self.config.session_cookie);
            sources = sources.with_session(store.as_ref(), session_id);
        }

        let started = Instant::now();
        match catch_unwind(AssertUnwindSafe(|| handler.invoke(&sources))) {
            Ok(reply) => {
                debug!(
                    request_id = %ctx.request_id(),
                    handler_name = %name,
                    execution_time_us = started.elapsed().as_micros() as u64,
                    "Handler execution complete"
                );
                HandlerResponse::ok(reply)
            }
            Err(panic) => {
                let panic_message = panic_text(panic.as_ref());
                error!(
                    request_id = %ctx.request_id(),
                    handler_name = %name,
                    panic_message = %panic_message,
                    "Handler panicked"
                );
                HandlerResponse::error(500, &format!("Handler panicked: {panic_message}"))
            }
        }
    }
}

fn filter_panic_response(failure: &FilterPanic) -> HandlerResponse {
    HandlerResponse::error(
        500,
        &format!("Filter '{}' panicked: {}", failure.filter, failure.message),
    )
}

pub(crate) fn panic_text(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MethodSet;
    use serde_json::json;

    #[test]
    fn test_resolve_reports_missing_descriptor() {
        let mut dispatcher = Dispatcher::with_config(RuntimeConfig::default());
        dispatcher
            .router
            .register("/orphan", &MethodSet::new(), Arc::from("orphan"))
            .unwrap();
        let err = dispatcher.resolve(&Method::GET, "/orphan").unwrap_err();
        assert!(matches!(err, RouteError::MissingHandler { .. }));
        let response = dispatcher.dispatch(RequestData::new(Method::GET, "/orphan"));
        assert_eq!(response.status, 500);
    }

    #[test]
    fn test_register_rejects_bad_template() {
        let mut dispatcher = Dispatcher::default();
        let err = dispatcher
            .register_fn(RouteSpec::new("bad").path("/a/*/{b}"), |(): ()| json!({}))
            .unwrap_err();
        assert!(err.to_string().contains("route 'bad'"));
        assert!(dispatcher.registry().is_empty());
    }

    #[test]
    fn test_casters_start_from_shared_table() {
        use crate::binder::{Scalar, ScalarKind};
        let mut dispatcher = Dispatcher::default();
        assert_eq!(
            dispatcher.casters_mut().cast(ScalarKind::Bool, "on"),
            DEFAULT_CASTERS.cast(ScalarKind::Bool, "on")
        );
        dispatcher
            .casters_mut()
            .set(ScalarKind::Bool, |_| Scalar::Bool(false));
        assert_eq!(DEFAULT_CASTERS.cast(ScalarKind::Bool, "on"), Scalar::Bool(true));
    }

    #[test]
    fn test_register_is_all_or_nothing() {
        let mut dispatcher = Dispatcher::default();
        assert!(dispatcher
            .register_fn(RouteSpec::new("r").path("/good;/bad/*/{x}"), |(): ()| json!({}))
            .is_err());
        assert!(dispatcher.router.is_empty());
        assert!(matches!(
            dispatcher.resolve(&Method::GET, "/good"),
            Err(RouteError::NotFound { .. })
        ));
    }

    #[test]
    fn test_panic_text() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_text(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_text(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_text(boxed.as_ref()), "unknown panic");
    }
}

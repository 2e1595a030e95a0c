use http::Method;
use smallvec::SmallVec;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::core::{Filter, PreHandle};
use crate::dispatcher::{panic_text, HandlerResponse, RequestContext};
use crate::registry::RouteSpec;
use crate::router::{RouteError, Router};

struct FilterEntry {
    name: Arc<str>,
    router: Router<str>,
    filter: Arc<dyn Filter>,
}

/// A filter hook that panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPanic {
    pub filter: Arc<str>,
    pub message: String,
}

/// Outcome of the pre phase.
#[derive(Debug)]
pub struct PreRun {
    /// Indices of filters whose pre hook ran, in order
    ran: SmallVec<[usize; 4]>,
    panicked: Option<FilterPanic>,
    pub verdict: PreHandle,
}

impl PreRun {
    /// Number of pre hooks that ran.
    #[must_use]
    pub fn ran(&self) -> usize {
        self.ran.len()
    }

    /// Set when a pre hook panicked; the chain stopped there.
    #[must_use]
    pub fn panicked(&self) -> Option<&FilterPanic> {
        self.panicked.as_ref()
    }
}

/// Registration-ordered filter list. Each filter owns its own compiled router,
/// separate from the handler routes.
#[derive(Default)]
pub struct FilterChain {
    entries: Vec<FilterEntry>,
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every template of `spec` into a router private to this filter.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::InvalidPattern`] for a template that does not compile;
    /// the filter is not added.
    pub fn register(&mut self, spec: &RouteSpec, filter: Arc<dyn Filter>) -> Result<(), RouteError> {
        let name: Arc<str> = Arc::from(spec.name());
        let methods = spec.effective_methods();
        let mut router = Router::new();
        for template in spec.templates() {
            router.register(&template, &methods, Arc::clone(&name))?;
        }
        info!(
            filter = %name,
            templates = router.len(),
            methods = %methods,
            position = self.entries.len(),
            "Filter registered"
        );
        self.entries.push(FilterEntry {
            name,
            router,
            filter,
        });
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the filters that apply to `method` + `path`, in run order.
    #[must_use]
    pub fn matching(&self, method: &Method, path: &str) -> Vec<Arc<str>> {
        self.entries
            .iter()
            .filter(|entry| applies(entry, method, path))
            .map(|entry| Arc::clone(&entry.name))
            .collect()
    }

    /// Run the pre hooks of matching filters until one does not continue.
    ///
    /// A panicking hook stops the chain; the panic is reported through
    /// [`PreRun::panicked`] with an `Abort` verdict.
    #[must_use]
    pub fn run_pre(&self, ctx: &RequestContext) -> PreRun {
        let mut ran = SmallVec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if !applies(entry, ctx.method(), ctx.path()) {
                continue;
            }
            ran.push(index);
            let verdict = match catch_unwind(AssertUnwindSafe(|| entry.filter.pre_handle(ctx))) {
                Ok(verdict) => verdict,
                Err(panic) => {
                    let failure = caught(entry, ctx, "pre", panic.as_ref());
                    return PreRun {
                        ran,
                        panicked: Some(failure),
                        verdict: PreHandle::Abort,
                    };
                }
            };
            match verdict {
                PreHandle::Continue => {}
                PreHandle::Abort => {
                    warn!(
                        request_id = %ctx.request_id(),
                        filter = %entry.name,
                        path = %ctx.path(),
                        "Filter aborted request"
                    );
                    return PreRun {
                        ran,
                        panicked: None,
                        verdict: PreHandle::Abort,
                    };
                }
                PreHandle::Respond(reply) => {
                    debug!(
                        request_id = %ctx.request_id(),
                        filter = %entry.name,
                        "Filter answered request"
                    );
                    return PreRun {
                        ran,
                        panicked: None,
                        verdict: PreHandle::Respond(reply),
                    };
                }
            }
        }
        PreRun {
            ran,
            panicked: None,
            verdict: PreHandle::Continue,
        }
    }

    /// Post hooks of every filter whose pre hook ran, same order.
    ///
    /// # Errors
    ///
    /// Returns the first hook that panicked. Later hooks still run.
    pub fn run_post(
        &self,
        run: &PreRun,
        ctx: &RequestContext,
        response: &HandlerResponse,
    ) -> Result<(), FilterPanic> {
        let mut first = None;
        for &index in &run.ran {
            let Some(entry) = self.entries.get(index) else {
                continue;
            };
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| entry.filter.post_handle(ctx, response))) {
                let failure = caught(entry, ctx, "post", panic.as_ref());
                if first.is_none() {
                    first = Some(failure);
                }
            }
        }
        first.map_or(Ok(()), Err)
    }
}

fn caught(
    entry: &FilterEntry,
    ctx: &RequestContext,
    phase: &'static str,
    panic: &(dyn std::any::Any + Send),
) -> FilterPanic {
    let message = panic_text(panic);
    error!(
        request_id = %ctx.request_id(),
        filter = %entry.name,
        phase,
        panic_message = %message,
        "Filter panicked"
    );
    FilterPanic {
        filter: Arc::clone(&entry.name),
        message,
    }
}

fn applies(entry: &FilterEntry, method: &Method, path: &str) -> bool {
    match entry.router.route(method, path) {
        Ok(_) | Err(RouteError::AmbiguousMatch { .. }) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Reply, RequestData};
    use crate::filter::FnFilter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn ctx(method: Method, uri: &str) -> RequestContext {
        RequestContext::new(Arc::new(RequestData::new(method, uri)))
    }

    #[test]
    fn test_filters_match_independently() {
        let mut chain = FilterChain::new();
        let noop = || Arc::new(FnFilter::new(|_: &RequestContext| PreHandle::Continue, |_: &RequestContext, _: &HandlerResponse| {}));
        chain
            .register(&RouteSpec::new("admin").path("/admin/*"), noop())
            .unwrap();
        chain
            .register(&RouteSpec::new("users").path("/users/{id}").method(Method::POST), noop())
            .unwrap();
        chain
            .register(&RouteSpec::new("all").path("/*"), noop())
            .unwrap();

        let names = chain.matching(&Method::GET, "/admin/settings");
        assert_eq!(names, vec![Arc::from("admin"), Arc::from("all")]);
        assert!(chain.matching(&Method::GET, "/users/1").iter().all(|n| &**n != "users"));
        assert!(chain.matching(&Method::POST, "/users/1").iter().any(|n| &**n == "users"));
    }

    #[test]
    fn test_respond_stops_later_pre_hooks() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = FilterChain::new();
        for (name, verdict) in [
            ("first", PreHandle::Continue),
            ("second", PreHandle::Respond(Reply::redirect("/login"))),
            ("third", PreHandle::Continue),
        ] {
            let pre_log = Arc::clone(&log);
            let post_log = Arc::clone(&log);
            let filter = FnFilter::new(
                move |_: &RequestContext| {
                    pre_log.lock().unwrap().push(format!("pre:{name}"));
                    verdict.clone()
                },
                move |_: &RequestContext, _: &HandlerResponse| {
                    post_log.lock().unwrap().push(format!("post:{name}"));
                },
            );
            chain
                .register(&RouteSpec::new(name).path("/*"), Arc::new(filter))
                .unwrap();
        }

        let ctx = ctx(Method::GET, "/page");
        let run = chain.run_pre(&ctx);
        assert_eq!(run.ran(), 2);
        assert_eq!(run.verdict, PreHandle::Respond(Reply::redirect("/login")));
        chain
            .run_post(&run, &ctx, &HandlerResponse::ok(Reply::Empty))
            .unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["pre:first", "pre:second", "post:first", "post:second"]
        );
    }

    #[test]
    fn test_unmatched_filter_does_not_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut chain = FilterChain::new();
        chain
            .register(
                &RouteSpec::new("api").path("/api/*"),
                Arc::new(FnFilter::new(
                    move |_: &RequestContext| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        PreHandle::Abort
                    },
                    |_: &RequestContext, _: &HandlerResponse| {},
                )),
            )
            .unwrap();
        let run = chain.run_pre(&ctx(Method::GET, "/home"));
        assert_eq!(run.verdict, PreHandle::Continue);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_post_panic_keeps_running_later_hooks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = FilterChain::new();
        chain
            .register(
                &RouteSpec::new("broken").path("/*"),
                Arc::new(FnFilter::new(
                    |_: &RequestContext| PreHandle::Continue,
                    |_: &RequestContext, _: &HandlerResponse| panic!("post failed"),
                )),
            )
            .unwrap();
        let counter = Arc::clone(&calls);
        chain
            .register(
                &RouteSpec::new("counting").path("/*"),
                Arc::new(FnFilter::new(
                    |_: &RequestContext| PreHandle::Continue,
                    move |_: &RequestContext, _: &HandlerResponse| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    },
                )),
            )
            .unwrap();

        let ctx = ctx(Method::GET, "/x");
        let run = chain.run_pre(&ctx);
        assert!(run.panicked().is_none());
        let failure = chain
            .run_post(&run, &ctx, &HandlerResponse::ok(Reply::Empty))
            .unwrap_err();
        assert_eq!(&*failure.filter, "broken");
        assert_eq!(failure.message, "post failed");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_invalid_filter_template() {
        let mut chain = FilterChain::new();
        let err = chain
            .register(
                &RouteSpec::new("bad").path("/a/*/b/*"),
                Arc::new(FnFilter::new(
                    |_: &RequestContext| PreHandle::Continue,
                    |_: &RequestContext, _: &HandlerResponse| {},
                )),
            )
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidPattern { .. }));
        assert!(chain.is_empty());
    }
}

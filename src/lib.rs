//! # routebind
//!
//! **routebind** resolves an HTTP method and path to a named handler, binds the
//! handler's typed parameter record from the request and runs it between the
//! pre and post hooks of any matching filters.
//!
//! ## Overview
//!
//! Everything is compiled once during a registration phase and is read-only
//! afterwards, so a single [`Dispatcher`] can serve requests from any number of
//! threads without locking.
//!
//! ## Architecture
//!
//! - **[`router`]** - Template compiler, exact-match index, progressive-elimination
//!   pattern matcher and the composite [`Router`](router::Router) tying them together
//! - **[`registry`]** - Route declarations and the name to handler registry
//! - **[`binder`]** - Field name resolution, casters and the parameter binder
//! - **[`typed`]** - The [`Handler`](typed::Handler) trait
//! - **[`filter`]** - Pre/post interceptors matched like routes
//! - **[`dispatcher`]** - The request pipeline
//! - **[`runtime_config`]** - Environment-driven configuration
//! - **[`ids`]** - ULID request identifiers
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant Dispatcher
//!     participant Filters as FilterChain
//!     participant Router as Router<br/>(exact, pattern, retry)
//!     participant Binder as RecordSchema
//!     participant Handler
//!
//!     Caller->>Dispatcher: dispatch(RequestData)
//!     Dispatcher->>Filters: run_pre
//!     alt Abort
//!         Filters-->>Caller: 500
//!     end
//!     Dispatcher->>Router: route(method, path)
//!     Router-->>Dispatcher: name + path variables | 404 | 405
//!     Dispatcher->>Binder: bind(Params::default())
//!     Dispatcher->>Handler: handle(params)
//!     Handler-->>Dispatcher: Reply
//!     Dispatcher->>Filters: run_post
//!     Dispatcher-->>Caller: HandlerResponse
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use routebind::binder::Bindable;
//! use routebind::dispatcher::{Dispatcher, Reply, RequestData};
//! use routebind::registry::RouteSpec;
//! use http::Method;
//!
//! #[derive(Default, Bindable)]
//! struct Weather {
//!     day: String,
//!     heavy: String,
//! }
//!
//! let mut dispatcher = Dispatcher::default();
//! dispatcher
//!     .register_fn(
//!         RouteSpec::new("weather").path("/weather/{day}/how-heavy/{heavy}"),
//!         |w: Weather| Reply::view("weather.html", serde_json::json!({ "day": w.day, "heavy": w.heavy })),
//!     )
//!     .unwrap();
//!
//! let response = dispatcher.dispatch(RequestData::new(Method::GET, "/weather/2020-02-01/how-heavy/very"));
//! assert_eq!(response.status, 200);
//!
//! let missing = dispatcher.dispatch(RequestData::new(Method::GET, "/weather"));
//! assert_eq!(missing.status, 404);
//! ```
//!
//! ## Logging
//!
//! All diagnostics are emitted through `tracing`; installing a subscriber is up
//! to the application.

extern crate self as routebind;

pub mod binder;
pub mod dispatcher;
pub mod filter;
pub mod ids;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod typed;

pub use binder::{Bindable, CasterTable, MemorySessionStore, SessionStore, Timestamp};
pub use dispatcher::{Dispatcher, HandlerResponse, Reply, RequestContext, RequestData};
pub use filter::{Filter, PreHandle};
pub use registry::RouteSpec;
pub use router::{AmbiguityPolicy, MethodSet, RouteError};
pub use runtime_config::RuntimeConfig;
pub use typed::Handler;

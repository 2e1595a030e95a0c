//! # Dispatcher Module
//!
//! Runs one request end to end against the tables compiled at registration:
//!
//! 1. Pre hooks of every matching filter, in registration order
//! 2. Route resolution: exact index, then pattern matcher, then one retry on the
//!    normalized path
//! 3. Descriptor lookup in the [`Registry`](crate::registry::Registry)
//! 4. Parameter binding from path variables, form values, cookies, headers and session
//! 5. Handler invocation; a panic becomes a 500
//! 6. Post hooks of every filter whose pre hook ran
//!
//! A panic inside a filter hook is caught as well. In a pre hook it ends the
//! request with a 500 and no post hooks; in a post hook the remaining post
//! hooks still run and the response is replaced by a 500.
//!
//! ```rust
//! use routebind::binder::Bindable;
//! use routebind::dispatcher::{Dispatcher, RequestData};
//! use routebind::registry::RouteSpec;
//! use serde_json::json;
//!
//! #[derive(Default, Bindable)]
//! struct Article {
//!     blog_name: String,
//!     article_id: u32,
//!     page_id: u32,
//! }
//!
//! let mut dispatcher = Dispatcher::default();
//! dispatcher
//!     .register_fn(
//!         RouteSpec::new("article").path("/blog/{blogName}/article/{articleId}-{pageId}"),
//!         |a: Article| json!({ "blog": a.blog_name, "article": a.article_id, "page": a.page_id }),
//!     )
//!     .unwrap();
//!
//! let response = dispatcher.dispatch(RequestData::new(http::Method::GET, "/blog/jack/article/501-3"));
//! assert_eq!(response.status, 200);
//! ```
//!
//! ## Error Handling
//!
//! Nothing here returns an error to the caller. Routing failures map to
//! 404/405/409/500 responses through [`HandlerResponse::from_route_error`],
//! a filter abort is a bare 500, and cast failures never surface at all. A
//! JSON body that fails to decode is logged and ignored.

mod core;
mod request;
mod response;

pub use core::Dispatcher;
pub(crate) use core::panic_text;
pub use request::{parse_cookies, parse_query_params, RequestContext, RequestData};
pub use response::{HandlerResponse, Reply};

//! # Filter Module
//!
//! Filters intercept requests before and after the handler. They are declared
//! with the same [`RouteSpec`](crate::registry::RouteSpec) as routes and
//! compiled by the same router, but every filter gets a table of its own, so
//! several filters can match one request. They run in registration order.
//!
//! A pre hook returns a [`PreHandle`]:
//!
//! - `Continue`: go on with the next filter, then the handler
//! - `Abort`: answer a bare 500; neither the handler nor any post hook runs
//! - `Respond(reply)`: answer with `reply` instead of calling the handler;
//!   post hooks of the filters that ran still run
//!
//! Post hooks only observe the response.
//!
//! A hook that panics is caught and reported as a [`FilterPanic`].

mod chain;
mod core;

pub use chain::{FilterChain, FilterPanic, PreRun};
pub use core::{Filter, FnFilter, PreHandle};

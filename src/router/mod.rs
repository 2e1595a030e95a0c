//! # Router Module
//!
//! Path templates are compiled once at registration and resolved per request by
//! two cooperating strategies:
//!
//! 1. **Exact index** ([`ExactIndex`]): one hash probe on the cleaned literal path.
//! 2. **Pattern matcher** ([`PatternMatcher`]): progressive elimination over
//!    templates containing `{variables}`, composite tokens such as
//!    `{articleId}-{pageId}`, or a single `*` wildcard.
//!
//! [`Router`] tries them in that order and, if both miss, retries once against
//! the normalized path. Paths are split on `/` **and** `.`, so `/feed.json`
//! is the two tokens `feed` and `json`.
//!
//! ## Example
//!
//! ```rust
//! use routebind::router::{MethodSet, Router};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let mut router: Router<str> = Router::new();
//! router
//!     .register("/weather/{day}/how-heavy/{heavy}", &MethodSet::single(Method::GET), Arc::from("weather"))
//!     .unwrap();
//!
//! let found = router.route(&Method::GET, "/weather/2020-02-01/how-heavy/very").unwrap();
//! assert_eq!(&*found.target, "weather");
//! assert_eq!(found.get_path_param("day"), Some("2020-02-01"));
//! ```

mod core;
mod error;
mod exact;
mod matcher;
mod pattern;
#[cfg(test)]
mod tests;

pub use core::{MatchStrategy, MethodSet, ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use error::RouteError;
pub use exact::ExactIndex;
pub use matcher::{AmbiguityPolicy, PatternMatcher};
pub use pattern::{
    normalize_path, tokenize, CompositeSegment, RoutePattern, Segment, TokenVec, WildcardBounds,
    ROOT_TOKEN,
};

//! # Binder Module
//!
//! Populates handler parameter records from the request.
//!
//! Each field of a [`Bindable`] record is bound by one rule:
//!
//! - **Form** (default): path variables override query/form values of the same key
//! - **Cookie**, **Header**, **Session**: opted into with `#[bind(cookie)]` and friends
//! - **Context**: fields of type [`RequestContext`](crate::dispatcher::RequestContext)
//!   receive the live request, before any other rule runs
//!
//! A record marked `#[bind(json)]` additionally gets the request body merged
//! over it when the content type names JSON.
//!
//! Keys are tried in the order produced by [`resolve_keys`]: `userId`, `UserId`,
//! `user_id` for a field declared as `UserId`. The first key that resolves wins.
//!
//! Binding never fails. Values that do not parse become the zero value of the
//! field's type via the [`CasterTable`].
//!
//! ```rust
//! use routebind::binder::{Bindable, CasterTable, RecordSchema, Sources};
//! use routebind::dispatcher::{RequestContext, RequestData};
//! use std::sync::Arc;
//!
//! #[derive(Default, Bindable)]
//! struct Page {
//!     page: u32,
//!     #[bind(header = "x-tenant")]
//!     tenant: String,
//! }
//!
//! let data = RequestData::new(http::Method::GET, "/list?page=3").with_header("X-Tenant", "acme");
//! let ctx = RequestContext::new(Arc::new(data));
//! let schema = RecordSchema::<Page>::of(&CasterTable::builtin());
//!
//! let mut page = Page::default();
//! schema.bind(&mut page, &Sources::new(&ctx));
//! assert_eq!(page.page, 3);
//! assert_eq!(page.tenant, "acme");
//! ```

mod caster;
mod names;
mod schema;
mod session;
mod sources;

pub use caster::{
    parse_bool, Caster, CasterTable, Scalar, ScalarKind, ScalarValue, Timestamp, DATE_FORMAT,
    DATE_TIME_FORMAT, DEFAULT_CASTERS,
};
pub use names::{convention_keys, lower_camel, resolve_keys, snake_case, CONVENTION_MARKER};
pub use schema::{
    BindField, Bindable, FieldInfo, FieldKind, FieldSpec, RecordSchema, SchemaBuilder, Source,
};
pub use session::{new_session_id, MemorySessionStore, SessionStore};
pub use sources::{Found, Sources};

pub use routebind_macros::Bindable;

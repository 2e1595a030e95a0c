//! # Typed Module
//!
//! Handlers declare a parameter record instead of reading the request by hand.
//! The record is built from `Default`, populated by its binding schema and
//! passed by value:
//!
//! ```rust
//! use routebind::binder::Bindable;
//! use routebind::dispatcher::Reply;
//! use routebind::typed::Handler;
//!
//! #[derive(Default, Bindable)]
//! struct GetPet {
//!     pet_id: u64,
//! }
//!
//! struct GetPetHandler;
//!
//! impl Handler for GetPetHandler {
//!     type Params = GetPet;
//!
//!     fn handle(&self, params: GetPet) -> Reply {
//!         serde_json::json!({ "id": params.pet_id }).into()
//!     }
//! }
//! ```
//!
//! Closures work too through [`HandlerFn`] (what
//! [`Dispatcher::register_fn`](crate::dispatcher::Dispatcher::register_fn) uses).
//! A tuple `(A, B)` of records gives a handler several parameter records,
//! bound in order.

mod core;

pub use core::{BoundHandler, ErasedHandler, Handler, HandlerFn};

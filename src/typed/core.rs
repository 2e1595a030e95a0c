use std::marker::PhantomData;

use crate::binder::{Bindable, CasterTable, FieldInfo, RecordSchema, Sources};
use crate::dispatcher::Reply;

/// Trait implemented by typed handlers.
///
/// The dispatcher builds `Self::Params` from `Default`, binds it from the
/// request and passes it by value.
pub trait Handler: Send + Sync + 'static {
    /// Parameter record; use a tuple for several records
    type Params: Bindable + Default;

    fn handle(&self, params: Self::Params) -> Reply;
}

/// Adapter turning a closure `Fn(P) -> R` into a [`Handler`].
pub struct HandlerFn<P, R, F> {
    f: F,
    _marker: PhantomData<fn(P) -> R>,
}

impl<P, R, F> HandlerFn<P, R, F>
where
    F: Fn(P) -> R,
{
    #[must_use]
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<P, R, F> Handler for HandlerFn<P, R, F>
where
    P: Bindable + Default,
    R: Into<Reply> + 'static,
    F: Fn(P) -> R + Send + Sync + 'static,
{
    type Params = P;

    fn handle(&self, params: P) -> Reply {
        (self.f)(params).into()
    }
}

/// Handler with its parameter type erased; what the registry stores.
pub trait ErasedHandler: Send + Sync {
    /// Bind a fresh parameter record and call the handler.
    fn invoke(&self, sources: &Sources<'_>) -> Reply;

    /// Flattened binding rules of the parameter record.
    fn params(&self) -> &[FieldInfo];
}

/// A handler plus the schema of its parameter record, built once.
pub struct BoundHandler<H: Handler> {
    handler: H,
    schema: RecordSchema<H::Params>,
}

impl<H: Handler> BoundHandler<H> {
    #[must_use]
    pub fn new(handler: H, casters: &CasterTable) -> Self {
        Self {
            handler,
            schema: RecordSchema::of(casters),
        }
    }
}

impl<H: Handler> ErasedHandler for BoundHandler<H> {
    fn invoke(&self, sources: &Sources<'_>) -> Reply {
        let mut params = H::Params::default();
        self.schema.bind(&mut params, sources);
        self.handler.handle(params)
    }

    fn params(&self) -> &[FieldInfo] {
        self.schema.fields()
    }
}

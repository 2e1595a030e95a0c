use crate::dispatcher::{HandlerResponse, Reply, RequestContext};

/// Verdict of a pre hook.
#[derive(Debug, Clone, PartialEq)]
pub enum PreHandle {
    /// Keep going
    Continue,
    /// Stop everything and answer a bare 500; no post hooks run
    Abort,
    /// Use this reply instead of calling the handler; post hooks still run
    Respond(Reply),
}

impl From<bool> for PreHandle {
    fn from(proceed: bool) -> Self {
        if proceed {
            PreHandle::Continue
        } else {
            PreHandle::Abort
        }
    }
}

impl From<Reply> for PreHandle {
    fn from(reply: Reply) -> Self {
        PreHandle::Respond(reply)
    }
}

/// Pre/post interceptor matched against the request path like a route.
pub trait Filter: Send + Sync {
    fn pre_handle(&self, _ctx: &RequestContext) -> PreHandle {
        PreHandle::Continue
    }

    /// Side effects only; the response is already decided.
    fn post_handle(&self, _ctx: &RequestContext, _response: &HandlerResponse) {}
}

/// [`Filter`] made of two closures.
pub struct FnFilter<Pre, Post> {
    pre: Pre,
    post: Post,
}

impl<Pre, Post> FnFilter<Pre, Post>
where
    Pre: Fn(&RequestContext) -> PreHandle + Send + Sync,
    Post: Fn(&RequestContext, &HandlerResponse) + Send + Sync,
{
    #[must_use]
    pub fn new(pre: Pre, post: Post) -> Self {
        Self { pre, post }
    }
}

impl<Pre, Post> Filter for FnFilter<Pre, Post>
where
    Pre: Fn(&RequestContext) -> PreHandle + Send + Sync,
    Post: Fn(&RequestContext, &HandlerResponse) + Send + Sync,
{
    fn pre_handle(&self, ctx: &RequestContext) -> PreHandle {
        (self.pre)(ctx)
    }

    fn post_handle(&self, ctx: &RequestContext, response: &HandlerResponse) {
        (self.post)(ctx, response);
    }
}

//! Middleware layer.
//!
//! Middleware intercepts requests and responses: the right place for
//! cross-cutting concerns like access logging, request-id injection, and
//! authentication-header inspection. A wrapper receives the [`Request`] and a
//! [`Next`] continuation, does its before-work, awaits `next.run(req)`, does
//! its after-work, and returns the response.
//!
//! `Next` is consumed by value, so the downstream chain can be invoked at
//! most once; dropping it without calling [`Next::run`] short-circuits the
//! pipeline (useful for auth rejections).
//!
//! Built-in middleware:
//! - [`logging::RequestResponseLogger`] — before/after line per request with
//!   configurable fields and payload truncation

use std::sync::Arc;

use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

pub mod logging;

/// A request/response wrapper in the pipeline.
///
/// The method returns a [`BoxFuture`] rather than using `async fn` because
/// trait objects need a nameable future type. The idiom is a single
/// `Box::pin(async move { … })` around the whole body:
///
/// ```rust
/// use scribe::{Middleware, Next, Request, Response};
/// use scribe::middleware::BoxFuture;
///
/// struct ServerHeader;
///
/// impl Middleware for ServerHeader {
///     fn handle(&self, req: Request, next: Next) -> BoxFuture {
///         Box::pin(async move {
///             let resp = next.run(req).await;
///             // inspect or rebuild resp here
///             resp
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn handle(&self, req: Request, next: Next) -> BoxFuture;
}

pub use crate::handler::BoxFuture;

/// The rest of the pipeline: the middleware registered after the current one,
/// then the matched handler.
///
/// Consumed by [`Next::run`] — ownership makes "invoke downstream exactly
/// once" a compile-time guarantee rather than a runtime check.
pub struct Next {
    router: Arc<Router>,
    index: usize,
    handler: BoxedHandler,
}

impl Next {
    pub(crate) fn new(router: Arc<Router>, handler: BoxedHandler) -> Self {
        Self { router, index: 0, handler }
    }

    /// Runs the remainder of the pipeline and resolves to its response.
    pub async fn run(self, req: Request) -> Response {
        match self.router.middleware_at(self.index) {
            Some(middleware) => {
                let middleware = Arc::clone(middleware);
                let next = Next {
                    router: Arc::clone(&self.router),
                    index: self.index + 1,
                    handler: self.handler,
                };
                middleware.handle(req, next).await
            }
            None => self.handler.call(req).await,
        }
    }
}

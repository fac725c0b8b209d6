//! Radix-tree request router and middleware composition.
//!
//! One tree per HTTP method, O(path-length) lookup. Middleware is an ordered
//! list applied outside-in around the matched handler: the first wrapper
//! registered sees the request first and the response last. Composition is
//! explicit — nothing is registered unless you call [`Router::wrap`].

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each registration call returns `self` so calls chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), middleware: Vec::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use scribe::{Method, Request, Response, Router};
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Append a middleware to the pipeline. Returns `self` for chaining.
    ///
    /// Wrappers run in registration order on the way in and reverse order on
    /// the way out. A request/response logger usually goes first, so it sees
    /// the request untouched and times the whole pipeline:
    ///
    /// ```rust,no_run
    /// # use scribe::{LogOptions, RequestResponseLogger, Router};
    /// Router::new()
    ///     .wrap(RequestResponseLogger::new(LogOptions::default()));
    /// ```
    pub fn wrap(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub(crate) fn middleware_at(&self, index: usize) -> Option<&Arc<dyn Middleware>> {
        self.middleware.get(index)
    }

    /// Routes one request through the middleware chain to its handler.
    /// Unmatched paths get a 404 without entering the chain.
    pub(crate) async fn dispatch(self: Arc<Self>, mut req: Request) -> Response {
        let Some((handler, params)) = self.lookup(req.method(), req.path()) else {
            return Response::status(StatusCode::NOT_FOUND);
        };
        req.params = params;
        Next::new(self, handler).run(req).await
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

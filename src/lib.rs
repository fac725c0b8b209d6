//! # scribe
//!
//! Request/response access logging for a minimal HTTP pipeline.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! nginx handles TLS, rate limiting, slow clients, and body-size limits.
//! scribe does not — by design. The proxy does proxy things. What the proxy
//! cannot tell you is what your handlers saw and answered, with the request
//! body your application actually received. That is scribe's job:
//!
//! - [`RequestResponseLogger`] — one line before the handler runs, one line
//!   after it returns, with configurable fields and payload truncation
//! - Explicit middleware composition — [`Router::wrap`] takes an ordered list
//!   of wrappers; no registration magic, no global filter chain
//! - Immutable configuration — [`LogOptions`] is built once and never mutated
//!   while requests are in flight
//!
//! The pipeline underneath is deliberately small: radix-tree routing via
//! [`matchit`], tokio + hyper I/O, buffered bodies, graceful shutdown.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use scribe::{LogOptions, Method, Request, RequestResponseLogger, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = LogOptions::builder()
//!         .include_client_info(true)
//!         .include_query_string(true)
//!         .include_payload(true)
//!         .max_payload_len(2048)
//!         .build();
//!
//!     let app = Router::new()
//!         .on(Method::GET,  "/users/{id}", get_user)
//!         .on(Method::POST, "/users",      create_user)
//!         .wrap(RequestResponseLogger::new(options));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(scribe::StatusCode::BAD_REQUEST);
//!     }
//!     Response::json(br#"{"id":"99"}"#.to_vec())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use middleware::logging::{
    LogOptions, LogOptionsBuilder, RequestResponseLogger, Sink, TracingSink,
};
pub use middleware::{Middleware, Next};
pub use request::Request;
pub use response::{IntoResponse, Response};
pub use router::Router;
pub use server::Server;

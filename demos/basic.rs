//! Minimal scribe example — JSON endpoints behind the access logger.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl 'http://localhost:3000/users/42?verbose=1' -H 'x-session-id: s-123'
//!   curl -X POST http://localhost:3000/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!
//! Every request produces two lines on stdout, e.g.:
//!   >>> REQUEST >>> POST /users, client=127.0.0.1:51044, payload={"name":"alice"}
//!   <<< RESPONSE <<< status=201, elapsed=0ms

use scribe::{
    LogOptions, Method, Request, RequestResponseLogger, Response, Router, Server, StatusCode,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Headers stay off: they may carry credentials, and redaction is the
    // deployment's call, not the logger's.
    let options = LogOptions::builder()
        .include_client_info(true)
        .include_query_string(true)
        .include_headers(false)
        .include_payload(true)
        .max_payload_len(2048)
        .before_prefix(">>> REQUEST >>> ")
        .before_suffix("")
        .after_prefix("<<< RESPONSE <<< ")
        .after_suffix("")
        .build();

    let app = Router::new()
        .on(Method::GET, "/users/{id}", get_user)
        .on(Method::POST, "/users", create_user)
        .wrap(RequestResponseLogger::new(options));

    Server::bind("0.0.0.0:3000")
        .serve(app)
        .await
        .expect("server error");
}

// GET /users/{id}
async fn get_user(req: Request) -> Response {
    let id = req.param("id").unwrap_or("unknown");
    Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#).into_bytes())
}

// POST /users
//
// req.body() is the same full byte slice whether or not the logger truncated
// its copy for the log line.
async fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#.to_owned().into_bytes())
}

use crate::{AppState, handlers, uploads::MAX_SUBMIT_BODY_BYTES};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints that need no admin token.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /ping
        // Liveness check for monitors and load balancers.
        .route("/ping", get(handlers::ping))
        // POST /submit
        // Enrollment form with an optional image. The body cap sits just above
        // the image cap so oversized uploads are cut off early.
        .route(
            "/submit",
            post(handlers::submit_enrollment).layer(DefaultBodyLimit::max(MAX_SUBMIT_BODY_BYTES)),
        )
}

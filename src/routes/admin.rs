use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// Record inspection and removal. Each handler takes `AdminAccess` as its
/// first argument, so a request without the configured secret is rejected
/// before the path is parsed or the record store is touched.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /api/students
        // All enrollment records, newest first.
        .route("/students", get(handlers::list_students))
        // DELETE /api/students/{id}
        // Deletes one record and its image file.
        .route("/students/{id}", delete(handlers::delete_student))
}

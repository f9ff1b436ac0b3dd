use crate::{
    AppState,
    auth::AdminAccess,
    error::AppResult,
    models::{DeleteResponse, EnrollmentRecord, SubmitResponse},
    uploads::SubmissionForm,
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
};

// --- Handlers ---

/// ping
///
/// [Public Route] Liveness probe.
#[utoipa::path(
    get,
    path = "/ping",
    responses((status = 200, description = "Alive", body = String))
)]
pub async fn ping() -> &'static str {
    "pong"
}

/// submit_enrollment
///
/// [Public Route] Accepts one enrollment form as `multipart/form-data`.
///
/// *Flow*: the whole body is read and validated first, so a rejected image
/// leaves neither a file nor a record behind. The image (if any) is then
/// written to the content directory and the record inserted. If the insert
/// fails, the just-written image is removed again.
#[utoipa::path(
    post,
    path = "/submit",
    request_body(content = String, content_type = "multipart/form-data", description = "Enrollment fields plus optional `image` file"),
    responses(
        (status = 200, description = "Stored", body = SubmitResponse),
        (status = 400, description = "Rejected upload", body = crate::models::ErrorResponse),
        (status = 413, description = "Image larger than 2 MiB", body = crate::models::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::models::ErrorResponse)
    )
)]
pub async fn submit_enrollment(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<SubmitResponse>> {
    let SubmissionForm { mut fields, image } = SubmissionForm::read(multipart).await?;

    if let Some(upload) = &image {
        fields.image_file = Some(state.images.save(upload).await?);
    }
    let stored_image = fields.image_file.clone();

    match state.repo.create_student(fields).await {
        Ok(id) => {
            tracing::info!(id, image = ?stored_image, "Enrollment stored");
            Ok(Json(SubmitResponse { success: true, id }))
        }
        Err(err) => {
            if let Some(filename) = stored_image {
                if let Err(e) = state.images.remove(&filename).await {
                    tracing::warn!(%filename, error = %e, "Failed to remove orphaned image");
                }
            }
            Err(err.into())
        }
    }
}

/// list_students
///
/// [Admin Route] Every stored record, newest first.
#[utoipa::path(
    get,
    path = "/api/students",
    params(
        ("x-admin-token" = Option<String>, Header, description = "Admin secret"),
        ("token" = Option<String>, Query, description = "Admin secret (alternative to the header)")
    ),
    responses(
        (status = 200, description = "All records", body = [EnrollmentRecord]),
        (status = 401, description = "Unauthorized", body = crate::models::ErrorResponse)
    )
)]
pub async fn list_students(
    _admin: AdminAccess,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<EnrollmentRecord>>> {
    let students = state.repo.list_students().await?;
    Ok(Json(students))
}

/// delete_student
///
/// [Admin Route] Removes a record and, best effort, its image.
///
/// *Ordering*: the image name is looked up first, the file is unlinked, then
/// the row is deleted. A missing file is fine; any other filesystem error is
/// logged and does not block the row delete. If the row delete fails after the
/// file is gone, the file is not restored. An unknown id reports `deleted: 0`.
#[utoipa::path(
    delete,
    path = "/api/students/{id}",
    params(
        ("id" = i64, Path, description = "Record ID"),
        ("x-admin-token" = Option<String>, Header, description = "Admin secret"),
        ("token" = Option<String>, Query, description = "Admin secret (alternative to the header)")
    ),
    responses(
        (status = 200, description = "Deleted count (0 or 1)", body = DeleteResponse),
        (status = 401, description = "Unauthorized", body = crate::models::ErrorResponse)
    )
)]
pub async fn delete_student(
    _admin: AdminAccess,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<DeleteResponse>> {
    if let Some(filename) = state.repo.get_image_file(id).await? {
        if let Err(e) = state.images.remove(&filename).await {
            tracing::warn!(id, %filename, error = %e, "Could not delete image file");
        }
    }

    let deleted = state.repo.delete_student(id).await?;
    tracing::info!(id, deleted, "Enrollment delete");

    Ok(Json(DeleteResponse {
        success: true,
        deleted,
    }))
}

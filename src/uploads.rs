use axum::extract::{Multipart, multipart::Field};

use crate::{
    error::{AppError, AppResult},
    models::NewEnrollment,
};

/// Largest accepted image, in bytes (2 MiB).
pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// Request body cap for POST /submit: one maximal image plus room for the
/// text fields and multipart framing. Anything past it fails as too large.
pub const MAX_SUBMIT_BODY_BYTES: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Multipart field that carries the image.
pub const IMAGE_FIELD: &str = "image";

/// ImageUpload
///
/// An image received in a submission, held in memory until every check has
/// passed. Nothing touches the content directory before that.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub original_name: Option<String>,
    pub data: Vec<u8>,
}

impl ImageUpload {
    /// Only the declared media type is checked; the bytes are not sniffed.
    pub fn has_image_type(content_type: Option<&str>) -> bool {
        content_type.is_some_and(|ct| ct.starts_with("image/"))
    }
}

/// SubmissionForm
///
/// A fully read and validated POST /submit body.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub fields: NewEnrollment,
    pub image: Option<ImageUpload>,
}

impl SubmissionForm {
    /// read
    ///
    /// Consumes the multipart stream. Text fields fill the enrollment fields
    /// (unknown names are ignored). At most one file is accepted, and only
    /// under the `image` field; it must declare an `image/*` type and stay
    /// within `MAX_IMAGE_BYTES`. Any violation aborts the whole submission.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = SubmissionForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await?;
                form.fields.set_field(&name, value);
                continue;
            };

            // Browsers send an empty, nameless part when no file was chosen.
            if file_name.is_empty() {
                drain(field).await?;
                continue;
            }

            if name != IMAGE_FIELD {
                return Err(AppError::Validation(format!("Unexpected file field: {name}")));
            }
            if form.image.is_some() {
                return Err(AppError::Validation(
                    "Only one image may be uploaded".to_string(),
                ));
            }

            if !ImageUpload::has_image_type(field.content_type()) {
                return Err(AppError::Validation("Only image files are allowed".to_string()));
            }

            let data = read_capped(field, MAX_IMAGE_BYTES).await?;
            form.image = Some(ImageUpload {
                original_name: Some(file_name),
                data,
            });
        }

        Ok(form)
    }
}

/// Reads a field into memory, failing as soon as it grows past `limit`.
async fn read_capped(mut field: Field<'_>, limit: usize) -> AppResult<Vec<u8>> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > limit {
            return Err(AppError::PayloadTooLarge);
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

async fn drain(mut field: Field<'_>) -> AppResult<()> {
    while field.chunk().await?.is_some() {}
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_type_is_a_prefix_check() {
        assert!(ImageUpload::has_image_type(Some("image/png")));
        assert!(ImageUpload::has_image_type(Some("image/svg+xml")));
        assert!(!ImageUpload::has_image_type(Some("application/pdf")));
        assert!(!ImageUpload::has_image_type(Some("text/image/png")));
        assert!(!ImageUpload::has_image_type(None));
    }
}

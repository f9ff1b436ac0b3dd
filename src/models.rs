use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Stored Record ---

/// EnrollmentRecord
///
/// One row of the `students` table, i.e. one form submission.
/// Business fields are stored exactly as submitted. JSON field names follow the
/// form field names used by the enrollment page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct EnrollmentRecord {
    pub id: i64,
    #[serde(rename = "studentID")]
    pub student_id: Option<String>,
    pub surname: Option<String>,
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub religion: Option<String>,
    /// Filename relative to the content directory; `null` when no image was uploaded.
    #[serde(rename = "imageFile")]
    pub image_file: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NewEnrollment
///
/// Input to `Repository::create_student`: the submitted business fields plus the
/// name of the image stored for this submission, if any.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEnrollment {
    pub student_id: Option<String>,
    pub surname: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<String>,
    pub religion: Option<String>,
    pub image_file: Option<String>,
}

impl NewEnrollment {
    /// Assigns a multipart text field by its form name. Unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) {
        let slot = match name {
            "studentID" => &mut self.student_id,
            "surname" => &mut self.surname,
            "firstName" => &mut self.first_name,
            "lastName" => &mut self.last_name,
            "dob" => &mut self.dob,
            "religion" => &mut self.religion,
            _ => return,
        };
        *slot = Some(value);
    }
}

// --- Response Payloads ---

/// SubmitResponse
///
/// Returned by POST /submit.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SubmitResponse {
    pub success: bool,
    pub id: i64,
}

/// DeleteResponse
///
/// Returned by DELETE /api/students/{id}. `deleted` is 0 when the id did not exist.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: u64,
}

/// ErrorResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

use crate::models::{EnrollmentRecord, NewEnrollment};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{str::FromStr, sync::Arc, time::Duration};

/// DDL for the single enrollment table. Safe to run on every startup.
///
/// AUTOINCREMENT keeps ids strictly increasing; SQLite never reuses an id,
/// even after the newest row is deleted.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS students (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id  TEXT,
    surname     TEXT,
    first_name  TEXT,
    last_name   TEXT,
    dob         TEXT,
    religion    TEXT,
    image_file  TEXT,
    created_at  TEXT NOT NULL
)
"#;

/// Repository Trait
///
/// Persistence contract for enrollment records. Handlers only see this trait,
/// so tests can swap the SQLite store for an in-memory mock.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Inserts a record and returns its assigned id.
    async fn create_student(&self, new: NewEnrollment) -> Result<i64, sqlx::Error>;
    /// All records, newest first; equal timestamps keep insertion order.
    async fn list_students(&self) -> Result<Vec<EnrollmentRecord>, sqlx::Error>;
    /// The image filename of a record. `None` if the id is unknown or has no image.
    async fn get_image_file(&self, id: i64) -> Result<Option<String>, sqlx::Error>;
    /// Deletes a record, returning the number of rows removed (0 or 1).
    async fn delete_student(&self, id: i64) -> Result<u64, sqlx::Error>;
}

/// RepositoryState
///
/// The shared handle to the record store held in the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// SqliteRepository
///
/// The `Repository` implementation backed by a SQLite file (or an in-memory
/// database in tests).
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// connect
    ///
    /// Opens the database at `url`, creating the file if it does not exist.
    /// An in-memory database lives only as long as its connection, so it gets
    /// a single connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(options)
                .await?
        };

        Ok(Self::new(pool))
    }

    /// Creates the `students` table if it is missing.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Repository for SqliteRepository {
    /// create_student
    ///
    /// `created_at` is taken from the server clock at insert time and stored as
    /// fixed-width RFC 3339 text, so ordering the column as text orders it by time.
    async fn create_student(&self, new: NewEnrollment) -> Result<i64, sqlx::Error> {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let result = sqlx::query(
            r#"INSERT INTO students
                (student_id, surname, first_name, last_name, dob, religion, image_file, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(new.student_id)
        .bind(new.surname)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.dob)
        .bind(new.religion)
        .bind(new.image_file)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn list_students(&self) -> Result<Vec<EnrollmentRecord>, sqlx::Error> {
        sqlx::query_as::<_, EnrollmentRecord>(
            r#"SELECT id, student_id, surname, first_name, last_name, dob, religion,
                      image_file, created_at
               FROM students
               ORDER BY created_at DESC, id ASC"#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_image_file(&self, id: i64) -> Result<Option<String>, sqlx::Error> {
        let image: Option<Option<String>> =
            sqlx::query_scalar("SELECT image_file FROM students WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(image.flatten())
    }

    async fn delete_student(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

use std::{env, path::PathBuf, str::FromStr, time::Duration};

/// Placeholder admin secret used when `ADMIN_TOKEN` is not set.
///
/// Any instance left on this value grants administrative access to anyone
/// who knows it. Startup logs a warning whenever it is in effect.
pub const DEFAULT_ADMIN_TOKEN: &str = "changeme";

/// AppConfig
///
/// Holds the service configuration. Loaded once at startup and shared
/// read-only through the application state (pulled into handlers via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log output format.
    pub env: Env,
    // TCP port the HTTP listener binds to.
    pub port: u16,
    // Shared secret gating the /api/students endpoints.
    pub admin_token: String,
    // SQLite connection string for the enrollment table.
    pub db_url: String,
    // Content directory for uploaded images.
    pub upload_dir: PathBuf,
    // Root served as static files under "/".
    pub static_dir: PathBuf,
    // Maximum requests admitted per source address per window.
    pub rate_limit_max: u32,
    // Length of the rate limit window.
    pub rate_limit_window: Duration,
}

/// Env
///
/// Runtime context. `Local` logs human-readable output, `Production` logs JSON.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Test-friendly configuration that needs no environment variables.
    fn default() -> Self {
        Self {
            env: Env::Local,
            port: 3000,
            admin_token: "test-admin-token".to_string(),
            db_url: "sqlite::memory:".to_string(),
            upload_dir: PathBuf::from("uploads"),
            static_dir: PathBuf::from("."),
            rate_limit_max: 100,
            rate_limit_window: Duration::from_secs(15 * 60),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. Every value has a
    /// default, so loading never fails; malformed numbers fall back to their
    /// default with a warning.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        Self {
            env,
            port: parse_or("PORT", 3000),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| DEFAULT_ADMIN_TOKEN.to_string()),
            db_url: env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://students.db".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            rate_limit_max: parse_or("RATE_LIMIT_MAX", 100),
            rate_limit_window: Duration::from_secs(parse_or("RATE_LIMIT_WINDOW_SECS", 15 * 60)),
        }
    }

    /// True when the admin secret was left at the built-in placeholder.
    pub fn uses_default_admin_token(&self) -> bool {
        self.admin_token == DEFAULT_ADMIN_TOKEN
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable configuration value");
            default
        }),
        Err(_) => default,
    }
}

use std::env;
use std::path::{Path, PathBuf};

use dotenvy::dotenv;

pub const DEFAULT_DB_URL: &str = "sqlite:quiz.sqlite3";
pub const DEFAULT_SESSION_DIR: &str = ".quiz-session";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_OWNER: &str = "local";

/// Settings read from the environment (and `.env`), overridable by flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    pub session_dir: PathBuf,
    pub base_url: String,
    pub owner: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            db_url: normalize_sqlite_url(
                get("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into()),
            ),
            session_dir: get("QUIZ_SESSION_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_SESSION_DIR), PathBuf::from),
            base_url: get("QUIZ_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            owner: get("QUIZ_OWNER").unwrap_or_else(|| DEFAULT_OWNER.into()),
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".into()),
        }
    }
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") || raw.starts_with("sqlite:file:") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Create the database file (and parent directories) so `SQLite` can open it.
pub fn prepare_sqlite_file(db_url: &str) -> std::io::Result<()> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid database url: {db_url}"),
        ));
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid database url: {db_url}"),
        ));
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

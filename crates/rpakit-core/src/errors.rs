use std::path::PathBuf;

/// Workspace-wide error type.
///
/// Adapter crates map their library-specific errors into one of these kinds
/// so callers can match on the failure class (auth vs transport vs file
/// operation) without importing every client library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid path: {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("ssh error: {0}")]
    Ssh(String),

    #[error("sftp error: {0}")]
    Sftp(String),

    #[error("mail error: {0}")]
    Mail(String),

    #[error("database error: {0}")]
    Db(String),

    #[error("telegram error: {0}")]
    Telegram(String),

    #[error("webdriver error: {0}")]
    WebDriver(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;

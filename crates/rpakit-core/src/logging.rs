use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::{
    config::{LogConfig, RunEnv},
    errors::Error,
    Result,
};

/// Handles for the background log writers.
///
/// Keep this alive for the lifetime of the process; dropping it flushes and
/// stops the writer threads.
pub struct LogGuards {
    _general: WorkerGuard,
    _errors: WorkerGuard,
}

/// Install the tracing subscriber.
///
/// Three sinks, mirroring the split the toolkit has always used:
/// - console (development only, `RUST_LOG`-overridable, DEBUG and above)
/// - general file (INFO and above, daily rotation)
/// - error file (WARN and above, daily rotation)
pub fn init(cfg: &LogConfig) -> Result<LogGuards> {
    let (general_dir, general_file) = split_log_path(&cfg.general_log_file)?;
    let (error_dir, error_file) = split_log_path(&cfg.error_log_file)?;
    fs::create_dir_all(&general_dir)?;
    fs::create_dir_all(&error_dir)?;

    let (general_writer, general_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::daily(&general_dir, &general_file),
    );
    let (error_writer, error_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&error_dir, &error_file));

    let console = matches!(cfg.run_env, RunEnv::Development).then(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        fmt::layer()
            .with_target(false)
            .with_ansi(true)
            .with_filter(filter)
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(general_writer)
                .with_target(false)
                .with_ansi(false)
                .with_filter(LevelFilter::INFO),
        )
        .with(
            fmt::layer()
                .with_writer(error_writer)
                .with_target(false)
                .with_ansi(false)
                .with_filter(LevelFilter::WARN),
        )
        .with(console)
        .try_init()
        .map_err(|e| Error::Config(format!("logging already initialized: {e}")))?;

    Ok(LogGuards {
        _general: general_guard,
        _errors: error_guard,
    })
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::InvalidPath {
            path: path.to_path_buf(),
            reason: "log path has no file name".to_string(),
        })?
        .to_string();

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    Ok((dir, file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_log_path_separates_dir_and_file() {
        let (dir, file) = split_log_path(Path::new("logs/general.log")).unwrap();
        assert_eq!(dir, PathBuf::from("logs"));
        assert_eq!(file, "general.log");
    }

    #[test]
    fn split_log_path_defaults_to_current_dir() {
        let (dir, file) = split_log_path(Path::new("app.log")).unwrap();
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(file, "app.log");
    }
}

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

/// Which environment the process runs in. Controls console logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnv {
    Development,
    Production,
}

impl RunEnv {
    pub fn parse(value: Option<&str>) -> Result<Self> {
        match value.map(str::trim) {
            None | Some("") | Some("development") => Ok(Self::Development),
            Some("production") => Ok(Self::Production),
            Some(other) => Err(Error::Config(format!(
                "RUN_ENV must be 'development' or 'production', got '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub run_env: RunEnv,
    pub general_log_file: PathBuf,
    pub error_log_file: PathBuf,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub sender: String,
    pub password: String,
    pub server: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct MssqlConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// `None` connects to the login's default database.
    pub database: Option<String>,
}

#[derive(Clone, Debug)]
pub struct OdbcConfig {
    pub driver: String,
    pub server: String,
    pub database: String,
    /// Windows integrated auth (`Trusted_Connection=yes`).
    pub trusted: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
}

#[derive(Clone, Debug)]
pub struct BitrixConfig {
    pub webhook_url: String,
}

#[derive(Clone, Debug)]
pub struct WebDriverConfig {
    pub server_url: String,
    pub download_dir: PathBuf,
    pub browser: String,
    pub headless: bool,
    pub incognito: bool,
}

/// Typed configuration for the whole toolkit.
///
/// Sections for services that are not configured come back as `None`; a
/// partially configured section (e.g. an SMTP sender without a password) is
/// an error naming the missing variable.
#[derive(Clone, Debug)]
pub struct Config {
    pub log: LogConfig,
    pub smtp: Option<SmtpConfig>,
    pub sftp: Option<SftpConfig>,
    pub mssql: Option<MssqlConfig>,
    pub odbc: Option<OdbcConfig>,
    pub telegram: Option<TelegramConfig>,
    pub bitrix: Option<BitrixConfig>,
    pub webdriver: WebDriverConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        Ok(Self {
            log: load_log()?,
            smtp: load_smtp()?,
            sftp: load_sftp()?,
            mssql: load_mssql()?,
            odbc: load_odbc()?,
            telegram: load_telegram()?,
            bitrix: load_bitrix(),
            webdriver: load_webdriver(),
        })
    }
}

fn load_log() -> Result<LogConfig> {
    let run_env = RunEnv::parse(env_str("RUN_ENV").as_deref())?;
    let general_log_file =
        env_path("GENERAL_LOG_FILE").unwrap_or_else(|| PathBuf::from("logs/general.log"));
    let error_log_file =
        env_path("ERROR_LOG_FILE").unwrap_or_else(|| PathBuf::from("logs/errors.log"));
    Ok(LogConfig {
        run_env,
        general_log_file,
        error_log_file,
    })
}

fn load_smtp() -> Result<Option<SmtpConfig>> {
    let Some(sender) = env_str("SMTP_SENDER").and_then(non_empty) else {
        return Ok(None);
    };
    Ok(Some(SmtpConfig {
        sender,
        password: require("SMTP_PASSWORD")?,
        server: require("SMTP_SERVER")?,
        port: env_u16("SMTP_PORT").unwrap_or(587),
    }))
}

fn load_sftp() -> Result<Option<SftpConfig>> {
    let Some(host) = env_str("SFTP_HOST").and_then(non_empty) else {
        return Ok(None);
    };
    Ok(Some(SftpConfig {
        host,
        port: env_u16("SFTP_PORT").unwrap_or(22),
        username: require("SFTP_USERNAME")?,
        password: require("SFTP_PASSWORD")?,
    }))
}

fn load_mssql() -> Result<Option<MssqlConfig>> {
    let Some(server) = env_str("MSSQL_SERVER").and_then(non_empty) else {
        return Ok(None);
    };
    Ok(Some(MssqlConfig {
        server,
        port: env_u16("MSSQL_PORT").unwrap_or(1433),
        username: require("MSSQL_USERNAME")?,
        password: require("MSSQL_PASSWORD")?,
        database: env_str("MSSQL_DATABASE").and_then(non_empty),
    }))
}

fn load_odbc() -> Result<Option<OdbcConfig>> {
    let Some(server) = env_str("ODBC_SERVER").and_then(non_empty) else {
        return Ok(None);
    };
    let trusted = env_bool("ODBC_TRUSTED").unwrap_or(false);
    let username = env_str("ODBC_USERNAME").and_then(non_empty);
    let password = env_str("ODBC_PASSWORD").and_then(non_empty);
    if !trusted && (username.is_none() || password.is_none()) {
        return Err(Error::Config(
            "ODBC_USERNAME and ODBC_PASSWORD are required unless ODBC_TRUSTED is set".to_string(),
        ));
    }
    Ok(Some(OdbcConfig {
        driver: env_str("ODBC_DRIVER")
            .and_then(non_empty)
            .unwrap_or_else(|| "ODBC Driver 17 for SQL Server".to_string()),
        server,
        database: require("ODBC_DATABASE")?,
        trusted,
        username,
        password,
    }))
}

fn load_telegram() -> Result<Option<TelegramConfig>> {
    let Some(bot_token) = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty) else {
        return Ok(None);
    };
    let chat_id = require("TELEGRAM_CHAT_ID")?
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::Config("TELEGRAM_CHAT_ID must be a numeric chat id".to_string()))?;
    Ok(Some(TelegramConfig { bot_token, chat_id }))
}

fn load_bitrix() -> Option<BitrixConfig> {
    env_str("BITRIX24_WEBHOOK_URL")
        .and_then(non_empty)
        .map(|webhook_url| BitrixConfig { webhook_url })
}

fn load_webdriver() -> WebDriverConfig {
    WebDriverConfig {
        server_url: env_str("WEBDRIVER_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "http://localhost:4444".to_string()),
        download_dir: env_path("DOWNLOAD_DIR").unwrap_or_else(|| PathBuf::from("downloads")),
        browser: env_str("BROWSER")
            .and_then(non_empty)
            .unwrap_or_else(|| "chrome".to_string()),
        headless: env_bool("HEADLESS").unwrap_or(false),
        incognito: env_bool("INCOGNITO").unwrap_or(false),
    }
}

/// Minimal `.env` loader. Existing process env always wins.
fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn strip_quotes(val: &str) -> String {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return val[1..val.len() - 1].to_string();
    }
    val.to_string()
}

fn require(key: &str) -> Result<String> {
    env_str(key)
        .and_then(non_empty)
        .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key).map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_env_defaults_to_development() {
        assert_eq!(RunEnv::parse(None).unwrap(), RunEnv::Development);
        assert_eq!(RunEnv::parse(Some("")).unwrap(), RunEnv::Development);
        assert_eq!(
            RunEnv::parse(Some("production")).unwrap(),
            RunEnv::Production
        );
        assert!(RunEnv::parse(Some("staging")).is_err());
    }

    #[test]
    fn strip_quotes_handles_both_quote_styles() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("'abc'"), "abc");
        assert_eq!(strip_quotes("abc"), "abc");
        assert_eq!(strip_quotes("\"abc'"), "\"abc'");
    }

    #[test]
    fn non_empty_rejects_whitespace() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}

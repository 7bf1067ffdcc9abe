use std::{
    fs,
    path::{Path, PathBuf},
};

use serde_json::json;
use thirtyfour::{Capabilities, ChromiumLikeCapabilities, DesiredCapabilities};
use tracing::debug;

use rpakit_core::{config::WebDriverConfig, errors::Error, Result};

/// Which WebDriver-compatible browser to drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrowserKind {
    Chrome,
    Firefox,
    Edge,
}

impl BrowserKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "firefox" => Ok(Self::Firefox),
            "edge" => Ok(Self::Edge),
            other => Err(Error::Config(format!(
                "unknown browser '{other}' (expected chrome, firefox or edge)"
            ))),
        }
    }
}

/// Fixed arguments that keep Chromium quiet and download-friendly in
/// automation runs.
const QUIET_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--start-maximized",
    "--safebrowsing-disable-download-protection",
    "--disable-extensions",
    "--ignore-certificate-errors",
    "--disable-infobars",
    "--log-level=3",
];

/// Capability preset for an automation browser session.
#[derive(Clone, Debug)]
pub struct BrowserOptions {
    pub kind: BrowserKind,
    pub download_dir: PathBuf,
    pub headless: bool,
    pub incognito: bool,
}

impl BrowserOptions {
    pub fn new(kind: BrowserKind) -> Self {
        Self {
            kind,
            download_dir: PathBuf::from("downloads"),
            headless: false,
            incognito: false,
        }
    }

    pub fn from_config(cfg: &WebDriverConfig) -> Result<Self> {
        Ok(Self {
            kind: BrowserKind::parse(&cfg.browser)?,
            download_dir: cfg.download_dir.clone(),
            headless: cfg.headless,
            incognito: cfg.incognito,
        })
    }

    pub fn headless(mut self, on: bool) -> Self {
        self.headless = on;
        self
    }

    pub fn incognito(mut self, on: bool) -> Self {
        self.incognito = on;
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Build the capability payload for `WebDriver::new`.
    ///
    /// The download directory is created (recursively) and resolved to an
    /// absolute path first; the browser silently ignores relative paths in
    /// download prefs.
    pub fn capabilities(&self) -> Result<Capabilities> {
        let download_dir = self.ensure_download_dir()?;
        debug!(kind = ?self.kind, headless = self.headless, "building browser capabilities");

        match self.kind {
            BrowserKind::Chrome => {
                let mut caps = DesiredCapabilities::chrome();
                if self.headless {
                    caps.add_arg("--headless=new").map_err(caps_err)?;
                }
                if self.incognito {
                    caps.add_arg("--incognito").map_err(caps_err)?;
                }
                for arg in QUIET_ARGS {
                    caps.add_arg(arg).map_err(caps_err)?;
                }
                caps.add_experimental_option("prefs", download_prefs(&download_dir))
                    .map_err(caps_err)?;
                Ok(caps.into())
            }
            BrowserKind::Edge => {
                let mut caps = DesiredCapabilities::edge();
                if self.headless {
                    caps.add_arg("--headless=new").map_err(caps_err)?;
                }
                if self.incognito {
                    caps.add_arg("--inprivate").map_err(caps_err)?;
                }
                for arg in QUIET_ARGS {
                    caps.add_arg(arg).map_err(caps_err)?;
                }
                caps.add_experimental_option("prefs", download_prefs(&download_dir))
                    .map_err(caps_err)?;
                Ok(caps.into())
            }
            BrowserKind::Firefox => {
                let mut caps = DesiredCapabilities::firefox();
                if self.headless {
                    caps.add_arg("-headless").map_err(caps_err)?;
                }
                if self.incognito {
                    caps.add_arg("-private").map_err(caps_err)?;
                }
                Ok(caps.into())
            }
        }
    }

    fn ensure_download_dir(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.download_dir)?;
        Ok(fs::canonicalize(&self.download_dir)?)
    }
}

fn download_prefs(download_dir: &Path) -> serde_json::Value {
    json!({
        "download.default_directory": download_dir.to_string_lossy(),
        "download.prompt_for_download": false,
        "download.directory_upgrade": true,
        "safebrowsing.enabled": true,
        "plugins.always_open_pdf_externally": true,
        "pdfjs.disabled": true,
    })
}

fn caps_err(e: thirtyfour::error::WebDriverError) -> Error {
    Error::WebDriver(format!("capability setup failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}"))
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(BrowserKind::parse("Chrome").unwrap(), BrowserKind::Chrome);
        assert_eq!(BrowserKind::parse(" EDGE ").unwrap(), BrowserKind::Edge);
        assert!(BrowserKind::parse("safari").is_err());
    }

    #[test]
    fn chrome_capabilities_carry_flags_and_prefs() {
        let dir = tmp("rpakit-web-dl");
        let caps = BrowserOptions::new(BrowserKind::Chrome)
            .headless(true)
            .incognito(true)
            .download_dir(&dir)
            .capabilities()
            .unwrap();

        assert!(dir.is_dir());

        let raw = serde_json::to_string(&caps).unwrap();
        assert!(raw.contains("--headless=new"));
        assert!(raw.contains("--incognito"));
        assert!(raw.contains("download.default_directory"));
        assert!(raw.contains("plugins.always_open_pdf_externally"));
    }

    #[test]
    fn firefox_capabilities_skip_chromium_prefs() {
        let dir = tmp("rpakit-web-ff");
        let caps = BrowserOptions::new(BrowserKind::Firefox)
            .headless(true)
            .download_dir(&dir)
            .capabilities()
            .unwrap();

        let raw = serde_json::to_string(&caps).unwrap();
        assert!(raw.contains("-headless"));
        assert!(!raw.contains("download.default_directory"));
    }
}

//! Web-automation helpers over a WebDriver client (thirtyfour).
//!
//! Two pieces: [`options::BrowserOptions`] builds capability presets for
//! Chrome/Firefox/Edge (download directory, headless, incognito), and
//! [`helper::WebHelper`] wraps a live `WebDriver` with the wait-then-act
//! element operations the automation scripts use.

pub mod helper;
pub mod options;

pub use helper::{WebHelper, DEFAULT_TIMEOUT};
pub use options::{BrowserKind, BrowserOptions};

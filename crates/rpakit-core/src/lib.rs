//! Shared plumbing for the rpakit utility crates.
//!
//! This crate is intentionally service-agnostic: configuration, the common
//! error type, logging setup and local filesystem housekeeping live here,
//! while Bitrix24 / SFTP / SQL Server / Telegram / WebDriver wrappers live in
//! adapter crates that map their library-specific failures into [`Error`].

pub mod config;
pub mod errors;
pub mod files;
pub mod logging;
pub mod ports;

pub use errors::{Error, Result};

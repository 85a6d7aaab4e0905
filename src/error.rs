// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Message shown to the user when every candidate endpoint failed.
pub const UNREACHABLE_MESSAGE: &str =
    "Could not connect. Please check if the device is powered on and connected to the network.";

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid serial number format '{0}'. Use EMxxxx format.")]
    #[diagnostic(
        code(mosi::serial::invalid_format),
        help("Serial numbers are 'EM' followed by exactly four digits, e.g. EM1234")
    )]
    InvalidFormat(String),

    #[error("Probe of {url} timed out after {timeout_ms}ms")]
    #[diagnostic(code(mosi::probe::timeout))]
    ProbeTimeout { url: String, timeout_ms: u64 },

    #[error("Probe of {url} failed: {reason}")]
    #[diagnostic(code(mosi::probe::failed))]
    ProbeFailed { url: String, reason: String },

    #[error("Could not connect. Please check if the device is powered on and connected to the network.")]
    #[diagnostic(
        code(mosi::connect::unreachable),
        help("Check that the appliance is powered on and on the same network as this machine")
    )]
    DeviceUnreachable(String),

    #[error("Connection to '{0}' was cancelled")]
    Cancelled(String),

    #[error("Cache install failed for version '{version}': {reason}")]
    #[diagnostic(code(mosi::cache::install_failed))]
    CacheInstallFailure { version: String, reason: String },

    #[error("Cache error: {0}")]
    #[diagnostic(code(mosi::cache::error))]
    Cache(String),

    #[error("No cached or network response available for {0}")]
    #[diagnostic(
        code(mosi::cache::offline),
        help("Run `mosi cache install` while online to enable offline use")
    )]
    Offline(String),

    #[error("Stored data under '{key}' is unreadable: {reason}")]
    StorageCorrupt { key: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(mosi::config::validation),
        help("Check the values in your mosi.yaml")
    )]
    Validation(String),

    #[error("A connection attempt is already in progress")]
    ConnectInProgress,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::InvalidFormat(_) => {
                Some("Serial numbers look like EM1234 ('EM' followed by four digits).".to_string())
            }
            Error::DeviceUnreachable(serial) => Some(format!(
                "Make sure {} is powered on and that this machine can resolve '{}.local'.",
                serial,
                serial.to_lowercase()
            )),
            Error::Offline(_) => {
                Some("Install the offline cache while online with: mosi cache install".to_string())
            }
            Error::Config(msg) if msg.contains("Could not find") => None,
            Error::Config(_) | Error::Validation(_) | Error::Yaml(_) => {
                Some("Check the values in your mosi.yaml".to_string())
            }
            Error::Storage(_) => Some(
                "Check permissions on the data directory (default ~/.mosi) or pass --data-dir"
                    .to_string(),
            ),
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }

    /// True for failures that the orchestrator absorbs by moving to the next candidate.
    pub fn is_probe_failure(&self) -> bool {
        matches!(self, Error::ProbeTimeout { .. } | Error::ProbeFailed { .. })
    }
}

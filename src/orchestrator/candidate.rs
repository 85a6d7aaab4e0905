use crate::error::{Error, Result};
use crate::serial::SerialCode;
use serde::Serialize;
use std::fmt;
use tokio::time::{Duration, Instant};
use url::Url;

/// Host suffix under which appliances announce themselves on the local network.
pub const LOCAL_SUFFIX: &str = ".local";

/// Transport scheme of a candidate endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Secure,
    Plain,
}

impl Scheme {
    /// Attempt order: encrypted transport always goes first.
    pub const ORDERED: [Scheme; 2] = [Scheme::Secure, Scheme::Plain];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Secure => "https",
            Scheme::Plain => "http",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (scheme, host) pair a serial may be reachable at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEndpoint {
    pub scheme: Scheme,
    pub host: String,
    url: Url,
}

impl CandidateEndpoint {
    pub fn new(scheme: Scheme, serial: &SerialCode) -> Result<Self> {
        let host = format!("{}{}", serial.host_label(), LOCAL_SUFFIX);
        let url = Url::parse(&format!("{}://{}", scheme, host))
            .map_err(|e| Error::Parse(format!("Invalid endpoint for {}: {}", serial, e)))?;
        Ok(Self { scheme, host, url })
    }

    /// URL probed and navigated to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `scheme://host` with no port or path.
    pub fn address(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

impl fmt::Display for CandidateEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address())
    }
}

/// Ordered candidate endpoints for `serial`, secure before plain.
pub fn candidates(serial: &SerialCode) -> Result<Vec<CandidateEndpoint>> {
    Scheme::ORDERED
        .iter()
        .map(|scheme| CandidateEndpoint::new(*scheme, serial))
        .collect()
}

/// Outcome of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum AttemptOutcome {
    Pending,
    Succeeded,
    TimedOut,
    Failed(String),
    Cancelled,
}

/// A probe of one candidate, bounded by a deadline.
#[derive(Debug, Clone)]
pub struct ConnectionAttempt {
    pub candidate: CandidateEndpoint,
    /// `None` when `now + timeout` does not fit in an `Instant`.
    pub deadline: Option<Instant>,
    pub outcome: AttemptOutcome,
}

impl ConnectionAttempt {
    pub fn start(candidate: CandidateEndpoint, timeout: Duration) -> Self {
        Self {
            candidate,
            deadline: Instant::now().checked_add(timeout),
            outcome: AttemptOutcome::Pending,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Succeeded
    }
}

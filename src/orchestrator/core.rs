use super::candidate::{candidates, AttemptOutcome, CandidateEndpoint, ConnectionAttempt};
use super::navigator::Navigator;
use super::OrchestratorBuilder;
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::probe::Prober;
use crate::serial::SerialCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use url::Url;

/// Fixed per-candidate probe deadline.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Largest probe deadline accepted at construction.
pub const MAX_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Successful resolution of a serial to an appliance URL.
#[derive(Debug, Clone)]
pub struct ConnectOutcome {
    pub serial: SerialCode,
    pub url: Url,
    /// Every probe made, in order. The last one succeeded.
    pub attempts: Vec<ConnectionAttempt>,
}

impl ConnectOutcome {
    /// `scheme://host` form of the resolved URL.
    pub fn address(&self) -> String {
        self.url.origin().ascii_serialization()
    }
}

/// Resolves serial codes to reachable appliance URLs.
///
/// For a validated serial the orchestrator probes the secure endpoint, then
/// the plain one, each under [`PROBE_TIMEOUT`], and stops at the first that
/// answers. Only a success touches the history store.
///
/// # Concurrency Model
///
/// Probes within one `connect` are strictly sequential: the next probe is
/// not started until the previous one answered, failed, or hit its deadline.
/// An expired probe future is dropped, so it cannot report a late success.
/// The orchestrator does not serialize separate `connect` calls; callers
/// (see [`crate::session::ShellSession`]) keep at most one in flight.
pub struct ConnectionOrchestrator {
    pub(super) prober: Arc<dyn Prober>,
    pub(super) history: HistoryStore,
    pub(super) navigator: Option<Arc<dyn Navigator>>,
    pub(super) probe_timeout: Duration,
    pub(super) cancellation_token: CancellationToken,
}

impl ConnectionOrchestrator {
    /// Create a builder for constructing a `ConnectionOrchestrator`.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    /// Cancel the in-progress connect, if any.
    ///
    /// The pending probe is dropped and the connect returns
    /// [`Error::Cancelled`] without touching history. Later connects are
    /// cancelled immediately until [`reset_cancellation`](Self::reset_cancellation).
    pub fn cancel_operations(&self) {
        self.cancellation_token.cancel();
    }

    pub fn reset_cancellation(&mut self) {
        self.cancellation_token = CancellationToken::new();
    }

    /// Validate `raw`, resolve it to a reachable URL, record it, and navigate.
    pub async fn connect(&self, raw: &str) -> Result<ConnectOutcome> {
        // Re-validate here: UI-level gating is not the only enforcement point
        let serial = SerialCode::parse(raw)?;

        let outcome = self
            .resolve(&serial)
            .instrument(tracing::info_span!("connect", serial = %serial))
            .await?;

        self.history.record(&serial)?;
        tracing::info!(serial = %serial, url = %outcome.url, "Connected");

        if let Some(navigator) = &self.navigator {
            if let Err(e) = navigator.navigate(&outcome.url).await {
                tracing::warn!("Failed to navigate to {}: {}", outcome.url, e);
            }
        }

        Ok(outcome)
    }

    /// Probe the candidates for `serial` in order without side effects.
    pub async fn resolve(&self, serial: &SerialCode) -> Result<ConnectOutcome> {
        let mut attempts = Vec::new();

        for candidate in candidates(serial)? {
            let attempt = self.attempt(candidate).await;
            let outcome = attempt.outcome.clone();
            let url = attempt.candidate.url().clone();
            attempts.push(attempt);

            match outcome {
                AttemptOutcome::Succeeded => {
                    return Ok(ConnectOutcome {
                        serial: serial.clone(),
                        url,
                        attempts,
                    });
                }
                AttemptOutcome::Cancelled => {
                    return Err(Error::Cancelled(serial.to_string()));
                }
                AttemptOutcome::TimedOut => {
                    let err = Error::ProbeTimeout {
                        url: url.to_string(),
                        timeout_ms: self.probe_timeout.as_millis() as u64,
                    };
                    tracing::info!("{}", err);
                }
                AttemptOutcome::Failed(reason) => {
                    tracing::info!(url = %url, "Connection attempt failed: {}", reason);
                }
                AttemptOutcome::Pending => {}
            }
        }

        tracing::warn!(serial = %serial, attempts = attempts.len(), "Device unreachable");
        Err(Error::DeviceUnreachable(serial.to_string()))
    }

    /// Run one probe against `candidate`, bounded by its deadline.
    async fn attempt(&self, candidate: CandidateEndpoint) -> ConnectionAttempt {
        let mut attempt = ConnectionAttempt::start(candidate, self.probe_timeout);
        tracing::debug!(url = %attempt.candidate.url(), "Probing candidate");

        let probe = self.prober.probe(attempt.candidate.url());
        let bounded = match attempt.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, probe),
            None => tokio::time::timeout(self.probe_timeout, probe),
        };

        attempt.outcome = tokio::select! {
            biased;

            _ = self.cancellation_token.cancelled() => AttemptOutcome::Cancelled,

            result = bounded => match result {
                Ok(Ok(())) => AttemptOutcome::Succeeded,
                Ok(Err(e)) => {
                    if !e.is_probe_failure() {
                        tracing::warn!(url = %attempt.candidate.url(), "Prober error: {}", e);
                    }
                    AttemptOutcome::Failed(e.to_string())
                }
                Err(_elapsed) => AttemptOutcome::TimedOut,
            },
        };

        attempt
    }
}

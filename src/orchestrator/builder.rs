use super::core::{ConnectionOrchestrator, MAX_PROBE_TIMEOUT, PROBE_TIMEOUT};
use super::navigator::Navigator;
use crate::error::{Error, Result};
use crate::history::HistoryStore;
use crate::probe::{HttpProber, Prober};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Builder for constructing a `ConnectionOrchestrator` with a fluent API.
///
/// # Example
///
/// ```no_run
/// use mosi_controller::{ConnectionOrchestrator, FileStorage, HistoryStore};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), mosi_controller::Error> {
/// let history = HistoryStore::new(Arc::new(FileStorage::new("/tmp/mosi/storage")));
/// let orchestrator = ConnectionOrchestrator::builder()
///     .history(history)
///     .build()?;
/// let outcome = orchestrator.connect("EM1234").await?;
/// println!("{}", outcome.address());
/// # Ok(())
/// # }
/// ```
pub struct OrchestratorBuilder {
    prober: Option<Arc<dyn Prober>>,
    history: Option<HistoryStore>,
    navigator: Option<Arc<dyn Navigator>>,
    probe_timeout: Option<Duration>,
}

impl OrchestratorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            prober: None,
            history: None,
            navigator: None,
            probe_timeout: None,
        }
    }

    /// Set the reachability prober.
    ///
    /// If not set, an [`HttpProber`] on the shared HTTP client is used.
    pub fn prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Set the history store. Required.
    pub fn history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the navigator invoked with the resolved URL after a successful connect.
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Set the per-candidate probe deadline.
    ///
    /// If not set, uses [`PROBE_TIMEOUT`] (5 seconds).
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = Some(timeout);
        self
    }

    /// Build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the history store is not set or the probe
    /// timeout is zero or above [`MAX_PROBE_TIMEOUT`].
    pub fn build(self) -> Result<ConnectionOrchestrator> {
        let history = self
            .history
            .ok_or_else(|| Error::Validation("history store is required".to_string()))?;

        let probe_timeout = self.probe_timeout.unwrap_or(PROBE_TIMEOUT);
        if probe_timeout.is_zero() {
            return Err(Error::Validation(
                "probe timeout must be greater than zero".to_string(),
            ));
        }
        if probe_timeout > MAX_PROBE_TIMEOUT {
            return Err(Error::Validation(format!(
                "probe timeout must be at most {}s",
                MAX_PROBE_TIMEOUT.as_secs()
            )));
        }

        let prober = self
            .prober
            .unwrap_or_else(|| Arc::new(HttpProber::with_shared_client()));

        Ok(ConnectionOrchestrator {
            prober,
            history,
            navigator: self.navigator,
            probe_timeout,
            cancellation_token: CancellationToken::new(),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn history() -> HistoryStore {
        HistoryStore::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_history_is_required() {
        let result = OrchestratorBuilder::new().build();
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_defaults_to_fixed_timeout() {
        let orch = OrchestratorBuilder::new().history(history()).build().unwrap();
        assert_eq!(orch.probe_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let result = OrchestratorBuilder::new()
            .history(history())
            .probe_timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_timeout_above_limit() {
        let result = OrchestratorBuilder::new()
            .history(history())
            .probe_timeout(Duration::from_secs(u64::MAX))
            .build();
        assert!(matches!(result, Err(Error::Validation(_))));

        let orch = OrchestratorBuilder::new()
            .history(history())
            .probe_timeout(MAX_PROBE_TIMEOUT)
            .build()
            .unwrap();
        assert_eq!(orch.probe_timeout(), MAX_PROBE_TIMEOUT);
    }

    #[test]
    fn test_custom_timeout() {
        let orch = OrchestratorBuilder::new()
            .history(history())
            .probe_timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        assert_eq!(orch.probe_timeout(), Duration::from_millis(250));
    }
}

//! Shell session state.
//!
//! [`ShellSession`] holds everything the interactive shell tracks between
//! user events: the status line, the displayed history, the deferred install
//! offer, and whether a connect is already running. Hosts feed it events
//! (input changes, connect requests, online/offline, visibility) and render
//! what it reports back.

use crate::cache::AssetCacheManager;
use crate::error::{Error, Result, UNREACHABLE_MESSAGE};
use crate::orchestrator::{ConnectOutcome, ConnectionOrchestrator};
use crate::serial::{self, SerialCode, Validation};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const STATUS_CONNECTING: &str = "Connecting...";
pub const STATUS_CONNECTED: &str = "Connected! Redirecting...";
pub const STATUS_INVALID_SERIAL: &str = "Invalid serial number format. Use EMxxxx format.";
pub const STATUS_ONLINE: &str = "Network connection restored";
pub const STATUS_OFFLINE: &str = "Network connection lost";

/// How long the "connection restored" notice stays visible.
pub const ONLINE_NOTICE: Duration = Duration::from_secs(3);

/// Deferred offer to install the shell for offline use.
///
/// Moves `None → Captured → Consumed` and never back: once the user has
/// answered the offer it is not shown again for this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallPrompt {
    None,
    Captured { version: String },
    Consumed,
}

/// Result of answering the install offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// No offer was pending.
    NotOffered,
    Installed { assets: usize, removed: Vec<String> },
    /// Install failed; the previous generation keeps serving.
    Failed(String),
}

#[derive(Debug, Default)]
struct StatusLine {
    text: String,
    expires: Option<Instant>,
}

/// Resets the in-flight flag when a connect finishes, however it finishes.
struct ConnectGuard<'a>(&'a AtomicBool);

impl<'a> ConnectGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ConnectGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Per-session state of the controller shell.
pub struct ShellSession {
    orchestrator: Arc<ConnectionOrchestrator>,
    cache: Option<Arc<AssetCacheManager>>,
    install_prompt: Mutex<InstallPrompt>,
    connecting: AtomicBool,
    online: AtomicBool,
    status: Mutex<StatusLine>,
    history: Mutex<Vec<SerialCode>>,
}

impl ShellSession {
    pub fn new(orchestrator: Arc<ConnectionOrchestrator>) -> Self {
        let history = orchestrator.history().list();
        Self {
            orchestrator,
            cache: None,
            install_prompt: Mutex::new(InstallPrompt::None),
            connecting: AtomicBool::new(false),
            online: AtomicBool::new(true),
            status: Mutex::new(StatusLine::default()),
            history: Mutex::new(history),
        }
    }

    pub fn with_cache(mut self, cache: Arc<AssetCacheManager>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Current status line; an expired notice reads as empty.
    pub fn status(&self) -> String {
        let status = self.status.lock();
        match status.expires {
            Some(expires) if Instant::now() >= expires => String::new(),
            _ => status.text.clone(),
        }
    }

    fn set_status(&self, text: &str) {
        *self.status.lock() = StatusLine {
            text: text.to_string(),
            expires: None,
        };
    }

    /// History as last displayed, most recent first.
    pub fn history(&self) -> Vec<SerialCode> {
        self.history.lock().clone()
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.load(Ordering::Acquire)
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Input changed: update the status line and report whether connect is enabled.
    pub fn input_changed(&self, raw: &str) -> (Validation, bool) {
        let validation = serial::validate(raw);
        self.set_status(validation.message().unwrap_or(""));
        let enabled = validation.can_connect() && !self.is_connecting();
        (validation, enabled)
    }

    /// Connect to the appliance named by `raw`.
    ///
    /// Only one connect runs per session; a second request while one is in
    /// flight fails with [`Error::ConnectInProgress`] and changes nothing.
    pub async fn connect(&self, raw: &str) -> Result<ConnectOutcome> {
        let Some(_guard) = ConnectGuard::acquire(&self.connecting) else {
            return Err(Error::ConnectInProgress);
        };

        let validation = serial::validate(raw);
        if !validation.can_connect() {
            self.set_status(STATUS_INVALID_SERIAL);
            return Err(Error::InvalidFormat(validation.normalized));
        }

        self.set_status(STATUS_CONNECTING);
        match self.orchestrator.connect(&validation.normalized).await {
            Ok(outcome) => {
                self.set_status(STATUS_CONNECTED);
                *self.history.lock() = self.orchestrator.history().list();
                Ok(outcome)
            }
            Err(e) => {
                match &e {
                    Error::DeviceUnreachable(_) => self.set_status(UNREACHABLE_MESSAGE),
                    Error::Cancelled(_) => self.set_status(""),
                    other => self.set_status(&other.to_string()),
                }
                Err(e)
            }
        }
    }

    /// Remove `serial` from history and refresh the displayed list.
    pub fn remove_from_history(&self, serial: &SerialCode) -> Result<Vec<SerialCode>> {
        let history = self.orchestrator.history().remove(serial)?;
        *self.history.lock() = history.clone();
        Ok(history)
    }

    /// The surface became visible or hidden. Visible re-reads stored history.
    pub fn visibility_changed(&self, visible: bool) {
        if visible {
            *self.history.lock() = self.orchestrator.history().list();
        }
    }

    pub fn went_online(&self) {
        self.online.store(true, Ordering::Release);
        *self.status.lock() = StatusLine {
            text: STATUS_ONLINE.to_string(),
            expires: Some(Instant::now() + ONLINE_NOTICE),
        };
    }

    pub fn went_offline(&self) {
        self.online.store(false, Ordering::Release);
        self.set_status(STATUS_OFFLINE);
    }

    pub fn install_prompt(&self) -> InstallPrompt {
        self.install_prompt.lock().clone()
    }

    /// Capture the install offer if the current cache generation is not yet active.
    ///
    /// Returns whether an offer is now pending.
    pub fn capture_install_prompt(&self) -> bool {
        let Some(cache) = &self.cache else {
            return false;
        };

        let mut prompt = self.install_prompt.lock();
        match *prompt {
            InstallPrompt::Consumed => false,
            InstallPrompt::Captured { .. } => true,
            InstallPrompt::None => {
                if cache.state() == crate::cache::LifecycleState::Active {
                    return false;
                }
                *prompt = InstallPrompt::Captured {
                    version: cache.manifest().version.clone(),
                };
                true
            }
        }
    }

    /// Answer the pending install offer: install and activate the cache.
    ///
    /// The offer is consumed whatever the outcome. Install failures are
    /// absorbed and reported as [`InstallOutcome::Failed`].
    pub async fn accept_install_prompt(&self) -> InstallOutcome {
        let captured = {
            let mut prompt = self.install_prompt.lock();
            match std::mem::replace(&mut *prompt, InstallPrompt::Consumed) {
                InstallPrompt::Captured { version } => Some(version),
                other => {
                    *prompt = other;
                    None
                }
            }
        };

        let (Some(version), Some(cache)) = (captured, &self.cache) else {
            return InstallOutcome::NotOffered;
        };

        tracing::debug!(version = %version, "Install offer accepted");
        let assets = match cache.install().await {
            Ok(assets) => assets,
            Err(e) => {
                tracing::warn!("Install prompt error: {}", e);
                return InstallOutcome::Failed(e.to_string());
            }
        };

        match cache.activate().await {
            Ok(removed) => InstallOutcome::Installed { assets, removed },
            Err(e) => {
                tracing::warn!("Activation after install failed: {}", e);
                InstallOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{
        AssetFetcher, AssetResponse, LifecycleState, Manifest, MemoryCacheStorage, ResponseKind,
    };
    use crate::history::HistoryStore;
    use crate::probe::Prober;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use url::Url;

    /// Answers only for `https`, after `gate` is notified if one is set.
    struct GatedProber {
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl Prober for GatedProber {
        async fn probe(&self, url: &Url) -> Result<()> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if url.scheme() == "https" {
                Ok(())
            } else {
                Err(Error::ProbeFailed {
                    url: url.to_string(),
                    reason: "refused".to_string(),
                })
            }
        }
    }

    struct RefusingProber;

    #[async_trait]
    impl Prober for RefusingProber {
        async fn probe(&self, url: &Url) -> Result<()> {
            Err(Error::ProbeFailed {
                url: url.to_string(),
                reason: "refused".to_string(),
            })
        }
    }

    fn session_with(prober: Arc<dyn Prober>) -> (ShellSession, HistoryStore) {
        let history = HistoryStore::new(Arc::new(MemoryStorage::new()));
        let orchestrator = ConnectionOrchestrator::builder()
            .prober(prober)
            .history(history.clone())
            .build()
            .unwrap();
        (ShellSession::new(Arc::new(orchestrator)), history)
    }

    fn serial(s: &str) -> SerialCode {
        SerialCode::parse(s).unwrap()
    }

    #[test]
    fn test_input_feedback() {
        let (session, _) = session_with(Arc::new(GatedProber { gate: None }));

        let (validation, enabled) = session.input_changed("em12");
        assert_eq!(validation.normalized, "EM12");
        assert!(!enabled);
        assert_eq!(session.status(), "");

        let (_, enabled) = session.input_changed("EM12A");
        assert!(!enabled);
        assert_eq!(session.status(), "Invalid format. Use EMxxxx format.");

        let (_, enabled) = session.input_changed("em1234");
        assert!(enabled);
        assert_eq!(session.status(), "");
    }

    #[tokio::test]
    async fn test_successful_connect_updates_status_and_history() {
        let (session, history) = session_with(Arc::new(GatedProber { gate: None }));

        let outcome = session.connect(" em1234 ").await.unwrap();
        assert_eq!(outcome.address(), "https://em1234.local");
        assert_eq!(session.status(), STATUS_CONNECTED);
        assert_eq!(session.history(), vec![serial("EM1234")]);
        assert_eq!(history.list(), vec![serial("EM1234")]);
        assert!(!session.is_connecting());
    }

    #[tokio::test]
    async fn test_unreachable_connect_shows_message() {
        let (session, history) = session_with(Arc::new(RefusingProber));

        let err = session.connect("EM0001").await.unwrap_err();
        assert!(matches!(err, Error::DeviceUnreachable(_)));
        assert_eq!(session.status(), UNREACHABLE_MESSAGE);
        assert!(history.list().is_empty());
        assert!(!session.is_connecting());
    }

    #[tokio::test]
    async fn test_invalid_connect_never_probes() {
        let (session, _) = session_with(Arc::new(RefusingProber));

        let err = session.connect("EM12AB").await.unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
        assert_eq!(session.status(), STATUS_INVALID_SERIAL);
    }

    #[tokio::test]
    async fn test_second_connect_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let (session, _) = session_with(Arc::new(GatedProber {
            gate: Some(gate.clone()),
        }));
        let session = Arc::new(session);

        let first = {
            let session = session.clone();
            tokio::spawn(async move { session.connect("EM1234").await })
        };
        while !session.is_connecting() {
            tokio::task::yield_now().await;
        }

        assert_eq!(session.status(), STATUS_CONNECTING);
        let (_, enabled) = session.input_changed("EM5678");
        assert!(!enabled);
        assert!(matches!(
            session.connect("EM5678").await,
            Err(Error::ConnectInProgress)
        ));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!session.is_connecting());
        assert_eq!(session.history(), vec![serial("EM1234")]);
    }

    #[tokio::test]
    async fn test_visibility_refreshes_history() {
        let (session, history) = session_with(Arc::new(RefusingProber));
        assert!(session.history().is_empty());

        // Another instance records a connection
        history.record(&serial("EM4321")).unwrap();
        session.visibility_changed(false);
        assert!(session.history().is_empty());

        session.visibility_changed(true);
        assert_eq!(session.history(), vec![serial("EM4321")]);
    }

    #[tokio::test]
    async fn test_remove_from_history() {
        let (session, history) = session_with(Arc::new(RefusingProber));
        history.record(&serial("EM0001")).unwrap();
        history.record(&serial("EM0002")).unwrap();
        session.visibility_changed(true);

        session.remove_from_history(&serial("EM0001")).unwrap();
        assert_eq!(session.history(), vec![serial("EM0002")]);
        assert_eq!(history.list(), vec![serial("EM0002")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_online_notice_expires() {
        let (session, _) = session_with(Arc::new(RefusingProber));

        session.went_offline();
        assert!(!session.is_online());
        assert_eq!(session.status(), STATUS_OFFLINE);

        session.went_online();
        assert!(session.is_online());
        assert_eq!(session.status(), STATUS_ONLINE);

        tokio::time::advance(ONLINE_NOTICE - Duration::from_millis(1)).await;
        assert_eq!(session.status(), STATUS_ONLINE);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(session.status(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_notice_persists() {
        let (session, _) = session_with(Arc::new(RefusingProber));
        session.went_offline();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(session.status(), STATUS_OFFLINE);
    }

    struct StaticFetcher {
        fail: bool,
    }

    #[async_trait]
    impl AssetFetcher for StaticFetcher {
        async fn fetch(&self, url: &Url) -> Result<AssetResponse> {
            if self.fail {
                return Err(Error::Offline(url.to_string()));
            }
            Ok(AssetResponse {
                url: url.clone(),
                status: 200,
                kind: ResponseKind::Basic,
                content_type: None,
                body: b"asset".to_vec(),
            })
        }
    }

    fn cache(fail: bool) -> Arc<AssetCacheManager> {
        Arc::new(
            AssetCacheManager::new(
                Manifest::new("v2", vec!["/".to_string()]),
                Url::parse("https://shell.example/").unwrap(),
                Arc::new(MemoryCacheStorage::new()),
                Arc::new(StaticFetcher { fail }),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_install_prompt_lifecycle() {
        let (session, _) = session_with(Arc::new(RefusingProber));
        let cache = cache(false);
        let session = session.with_cache(cache.clone());

        assert_eq!(session.install_prompt(), InstallPrompt::None);
        assert_eq!(
            session.accept_install_prompt().await,
            InstallOutcome::NotOffered
        );

        assert!(session.capture_install_prompt());
        assert_eq!(
            session.install_prompt(),
            InstallPrompt::Captured {
                version: "v2".to_string()
            }
        );

        assert_eq!(
            session.accept_install_prompt().await,
            InstallOutcome::Installed {
                assets: 1,
                removed: vec![]
            }
        );
        assert_eq!(session.install_prompt(), InstallPrompt::Consumed);
        assert_eq!(cache.state(), LifecycleState::Active);

        // Consumed offers are not captured again
        assert!(!session.capture_install_prompt());
        assert_eq!(
            session.accept_install_prompt().await,
            InstallOutcome::NotOffered
        );
    }

    #[tokio::test]
    async fn test_failed_install_still_consumes_prompt() {
        let (session, _) = session_with(Arc::new(RefusingProber));
        let session = session.with_cache(cache(true));

        assert!(session.capture_install_prompt());
        assert!(matches!(
            session.accept_install_prompt().await,
            InstallOutcome::Failed(_)
        ));
        assert_eq!(session.install_prompt(), InstallPrompt::Consumed);
    }

    #[test]
    fn test_no_prompt_without_cache() {
        let (session, _) = session_with(Arc::new(RefusingProber));
        assert!(!session.capture_install_prompt());
        assert_eq!(session.install_prompt(), InstallPrompt::None);
    }
}

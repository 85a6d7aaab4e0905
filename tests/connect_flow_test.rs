//! End-to-end connect scenarios
//!
//! These tests drive the full stack (validation, orchestrator, history on
//! disk, session) with probes that either go over real loopback HTTP or
//! follow a script.

use async_trait::async_trait;
use mosi_controller::error::UNREACHABLE_MESSAGE;
use mosi_controller::orchestrator::{AttemptOutcome, PROBE_TIMEOUT};
use mosi_controller::probe::{HttpProber, Prober};
use mosi_controller::session::{ShellSession, STATUS_CONNECTED};
use mosi_controller::{
    ConnectionOrchestrator, Error, FileStorage, HistoryStore, Result, SerialCode,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Routes `*.local` probes to loopback ports by scheme, over real HTTP.
struct LoopbackProber {
    inner: HttpProber,
    ports: HashMap<&'static str, u16>,
}

#[async_trait]
impl Prober for LoopbackProber {
    async fn probe(&self, url: &Url) -> Result<()> {
        let port = self.ports[url.scheme()];
        let target = Url::parse(&format!("http://127.0.0.1:{}{}", port, url.path())).unwrap();
        self.inner.probe(&target).await
    }
}

/// Serve `status_line` to every connection until the task is dropped.
async fn serve_forever(status_line: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                status_line
            );
            let _ = socket.write_all(response.as_bytes()).await;
        }
    });
    port
}

/// A port nothing listens on.
async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn history_on_disk(temp_dir: &TempDir) -> HistoryStore {
    HistoryStore::new(Arc::new(FileStorage::new(temp_dir.path().join("storage"))))
}

fn serial(s: &str) -> SerialCode {
    SerialCode::parse(s).unwrap()
}

#[tokio::test]
async fn test_plain_only_device_over_real_http() {
    let temp_dir = TempDir::new().unwrap();
    let prober = LoopbackProber {
        inner: HttpProber::new().unwrap(),
        ports: HashMap::from([
            ("https", closed_port().await),
            ("http", serve_forever("200 OK").await),
        ]),
    };
    let orchestrator = ConnectionOrchestrator::builder()
        .prober(Arc::new(prober))
        .history(history_on_disk(&temp_dir))
        .build()
        .unwrap();

    let outcome = orchestrator.connect("em1234").await.unwrap();
    assert_eq!(outcome.address(), "http://em1234.local");
    assert!(matches!(outcome.attempts[0].outcome, AttemptOutcome::Failed(_)));

    // A fresh store over the same directory sees the recorded serial
    assert_eq!(history_on_disk(&temp_dir).list(), vec![serial("EM1234")]);
    let raw =
        std::fs::read_to_string(temp_dir.path().join("storage/connectionHistory.json")).unwrap();
    assert_eq!(raw, r#"["EM1234"]"#);
}

#[tokio::test]
async fn test_error_status_still_counts_as_reachable() {
    let temp_dir = TempDir::new().unwrap();
    let port = serve_forever("503 Service Unavailable").await;
    let prober = LoopbackProber {
        inner: HttpProber::new().unwrap(),
        ports: HashMap::from([("https", port), ("http", port)]),
    };
    let orchestrator = ConnectionOrchestrator::builder()
        .prober(Arc::new(prober))
        .history(history_on_disk(&temp_dir))
        .build()
        .unwrap();

    let outcome = orchestrator.connect("EM0042").await.unwrap();
    assert_eq!(outcome.address(), "https://em0042.local");
}

#[tokio::test]
async fn test_no_device_over_real_http() {
    let temp_dir = TempDir::new().unwrap();
    let prober = LoopbackProber {
        inner: HttpProber::new().unwrap(),
        ports: HashMap::from([("https", closed_port().await), ("http", closed_port().await)]),
    };
    let orchestrator = Arc::new(
        ConnectionOrchestrator::builder()
            .prober(Arc::new(prober))
            .history(history_on_disk(&temp_dir))
            .build()
            .unwrap(),
    );
    let session = ShellSession::new(orchestrator);

    let err = session.connect("EM1234").await.unwrap_err();
    assert!(matches!(err, Error::DeviceUnreachable(_)));
    assert_eq!(err.to_string(), UNREACHABLE_MESSAGE);
    assert_eq!(session.status(), UNREACHABLE_MESSAGE);
    assert!(history_on_disk(&temp_dir).list().is_empty());
}

/// Answers for the serials in `online`, hangs for everything else.
struct FleetProber {
    online: Vec<&'static str>,
}

#[async_trait]
impl Prober for FleetProber {
    async fn probe(&self, url: &Url) -> Result<()> {
        let host = url.host_str().unwrap_or_default();
        if self.online.iter().any(|s| host.starts_with(&s.to_lowercase())) {
            Ok(())
        } else {
            std::future::pending().await
        }
    }
}

#[tokio::test]
async fn test_sixth_device_evicts_oldest() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = Arc::new(
        ConnectionOrchestrator::builder()
            .prober(Arc::new(FleetProber {
                online: vec!["EM0001", "EM0002", "EM0003", "EM0004", "EM0005", "EM0006"],
            }))
            .history(history_on_disk(&temp_dir))
            .build()
            .unwrap(),
    );
    let session = ShellSession::new(orchestrator);

    for s in ["EM0005", "EM0004", "EM0003", "EM0002", "EM0001"] {
        session.connect(s).await.unwrap();
    }
    assert_eq!(
        session.history(),
        ["EM0001", "EM0002", "EM0003", "EM0004", "EM0005"].map(serial).to_vec()
    );

    session.connect("EM0006").await.unwrap();
    assert_eq!(session.status(), STATUS_CONNECTED);
    assert_eq!(
        history_on_disk(&temp_dir).list(),
        ["EM0006", "EM0001", "EM0002", "EM0003", "EM0004"].map(serial).to_vec()
    );

    // Reconnecting an existing entry promotes it without growing the list
    session.connect("EM0003").await.unwrap();
    assert_eq!(
        session.history(),
        ["EM0003", "EM0006", "EM0001", "EM0002", "EM0004"].map(serial).to_vec()
    );
}

#[tokio::test(start_paused = true)]
async fn test_offline_device_fails_within_two_timeouts() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = ConnectionOrchestrator::builder()
        .prober(Arc::new(FleetProber { online: vec![] }))
        .history(history_on_disk(&temp_dir))
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    let err = orchestrator.connect("EM9999").await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, Error::DeviceUnreachable(_)));
    assert!(elapsed >= PROBE_TIMEOUT * 2);
    assert!(elapsed < PROBE_TIMEOUT * 2 + Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_configured_timeout_is_honoured() {
    let temp_dir = TempDir::new().unwrap();
    let timeout = Duration::from_millis(750);
    let orchestrator = ConnectionOrchestrator::builder()
        .prober(Arc::new(FleetProber { online: vec![] }))
        .history(history_on_disk(&temp_dir))
        .probe_timeout(timeout)
        .build()
        .unwrap();

    let started = tokio::time::Instant::now();
    orchestrator.connect("EM9999").await.unwrap_err();
    assert!(started.elapsed() < timeout * 2 + Duration::from_millis(100));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_connect_leaves_history_alone() {
    let temp_dir = TempDir::new().unwrap();
    let orchestrator = Arc::new(
        ConnectionOrchestrator::builder()
            .prober(Arc::new(FleetProber { online: vec![] }))
            .history(history_on_disk(&temp_dir))
            .build()
            .unwrap(),
    );
    let session = Arc::new(ShellSession::new(orchestrator.clone()));

    let task = {
        let session = session.clone();
        tokio::spawn(async move { session.connect("EM1234").await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    orchestrator.cancel_operations();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled(_)));
    assert!(!session.is_connecting());
    assert_eq!(session.status(), "");
    assert!(history_on_disk(&temp_dir).list().is_empty());
}

//! # MOSI Controller
//!
//! Locate and open the web UI of a MOSI appliance on the local network from
//! its serial number alone.
//!
//! ## Features
//!
//! - **Serial Validation**: Incremental `EMxxxx` validation as the user types
//! - **Protocol Fallback**: Probes `https://<serial>.local`, then `http://`, each under a fixed deadline
//! - **Connection History**: The five most recent serials, deduplicated and persisted across sessions
//! - **Offline Asset Cache**: Versioned asset generations with install / activate / intercept lifecycle
//! - **Cancellation Support**: Abort an in-flight connect via `CancellationToken`
//!
//! ## Quick Start
//!
//! ```no_run
//! use mosi_controller::{ConnectionOrchestrator, FileStorage, HistoryStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), mosi_controller::Error> {
//! let history = HistoryStore::new(Arc::new(FileStorage::new("/tmp/mosi/storage")));
//! let orchestrator = ConnectionOrchestrator::builder().history(history).build()?;
//!
//! let outcome = orchestrator.connect("em1234").await?;
//! println!("Appliance is at {}", outcome.address());
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! - Probes within a connect run strictly one after another
//! - Each probe is dropped at its deadline, so a late answer is never honoured
//! - [`ShellSession`] keeps at most one connect in flight per session

pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod probe;
pub mod serial;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use cache::{AssetCacheManager, LifecycleState, Manifest};
pub use config::{Config, Parser};
pub use error::{Error, Result};
pub use history::HistoryStore;
pub use orchestrator::{ConnectOutcome, ConnectionOrchestrator};
pub use serial::{validate, SerialCode, ValidationState};
pub use session::ShellSession;
pub use storage::{FileStorage, MemoryStorage, Storage};

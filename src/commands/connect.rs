use super::history_store;
use crate::output::UserOutput;
use mosi_controller::orchestrator::BrowserNavigator;
use mosi_controller::session::{ShellSession, STATUS_CONNECTING};
use mosi_controller::{Config, ConnectionOrchestrator, Error};
use std::sync::Arc;

pub async fn run_connect(
    config: &Config,
    serial: &str,
    open: bool,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let mut builder = ConnectionOrchestrator::builder()
        .history(history_store(config)?)
        .probe_timeout(config.probe_timeout()?);
    if open {
        builder = builder.navigator(Arc::new(BrowserNavigator));
    }
    let orchestrator = Arc::new(builder.build()?);
    let session = ShellSession::new(orchestrator.clone());

    let (validation, enabled) = session.input_changed(serial);
    if !enabled {
        return Err(Error::InvalidFormat(validation.normalized).into());
    }

    // Ctrl-C abandons the pending probe without recording anything
    let interrupt = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                orchestrator.cancel_operations();
            }
        })
    };

    out.status(STATUS_CONNECTING);
    let result = session.connect(serial).await;
    interrupt.abort();
    let outcome = result?;

    for attempt in &outcome.attempts {
        tracing::debug!(url = %attempt.candidate, outcome = ?attempt.outcome, "Attempt");
    }

    if open {
        out.success(&session.status());
    } else {
        out.success("Connected!");
    }
    out.data(&outcome.address());

    Ok(())
}

use super::history_store;
use crate::cli::HistoryCommands;
use crate::output::UserOutput;
use mosi_controller::{Config, SerialCode};

pub fn run_history(
    cmd: &HistoryCommands,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let store = history_store(config)?;

    match cmd {
        HistoryCommands::List { json } => {
            let history = store.list();
            if *json {
                out.data(&serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                out.status("No recent connections.");
                out.status("Serial numbers are remembered after `mosi connect` succeeds.");
            } else {
                for serial in &history {
                    out.data(serial.as_str());
                }
            }
        }
        HistoryCommands::Remove { serial } => {
            let serial = SerialCode::parse(serial)?;
            if !store.list().contains(&serial) {
                out.warning(&format!("{} is not in history", serial));
                return Ok(());
            }
            store.remove(&serial)?;
            out.success(&format!("Removed {} from history", serial));
        }
        HistoryCommands::Clear => {
            store.clear()?;
            out.success("Connection history cleared");
        }
    }

    Ok(())
}

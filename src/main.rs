mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use mosi_controller::config::format_duration;
use mosi_controller::{Config, Error as MosiError, Parser as ConfigParser};
use output::{CliOutput, QuietOutput, UserOutput};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Errors are reported even under --quiet
        let out = CliOutput;
        if let Some(mosi_error) = e.downcast_ref::<MosiError>() {
            out.error(&format!("Error: {}", mosi_error));
            if let Some(suggestion) = mosi_error.suggestion() {
                out.status(&format!("\nHint: {}", suggestion));
            }
        } else {
            out.error(&format!("Error: {:#}", e));
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let out: &dyn UserOutput = if cli.quiet { &QuietOutput } else { &CliOutput };

    // ── Commands that need NO config ──────────────────────────────────
    match &cli.command {
        Commands::Validate { input, json } => {
            return commands::run_validate(input, *json, out);
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(());
        }
        _ => {} // fall through to config-loading path
    }

    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Connect { serial, open } => {
            commands::run_connect(&config, serial, *open, out).await
        }
        Commands::History(history_cmd) => commands::run_history(history_cmd, &config, out),
        Commands::Cache(cache_cmd) => commands::run_cache(cache_cmd, &config, out).await,
        Commands::Validate { .. } | Commands::Completions { .. } => {
            unreachable!("handled before config loading");
        }
    }
}

/// Load `mosi.yaml` (explicit, discovered, or defaults) and apply CLI overrides.
fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = ConfigParser::new().resolve(cli.config.as_deref())?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = Some(data_dir.clone());
    }
    tracing::debug!(
        data_dir = %config.data_dir()?.display(),
        probe_timeout = %format_duration(config.probe_timeout()?),
        origin = %config.origin,
        "Resolved configuration"
    );
    Ok(config)
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

use anyhow::Context;
use clap::Parser;
use std::collections::HashMap;
use std::io;
use tracing_subscriber::EnvFilter;
use uptimemon::cli::{output, Cli};
use uptimemon::config::WatchdogConfig;
use uptimemon::events::EventListener;
use uptimemon::supervisor::XmlRpcClient;
use uptimemon::watchdog::Uptimemon;

/// Exit status for configuration errors, matching clap's usage errors
const CONFIG_ERROR_EXIT: i32 = 2;

fn main() {
    let cli = Cli::parse();

    // stdout carries the event protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match cli.watchdog_config() {
        Ok(config) => config,
        Err(e) => {
            output::print_error(&e.to_string());
            std::process::exit(CONFIG_ERROR_EXIT);
        }
    };

    if let Err(e) = run(config) {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(config: WatchdogConfig) -> anyhow::Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let rpc = XmlRpcClient::from_env(&env).context("Cannot set up the supervisor RPC client")?;
    tracing::info!(url = ?rpc.url(), "uptimemon {} starting", env!("CARGO_PKG_VERSION"));
    output::print_limits(&config.registry.summary());

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut listener = EventListener::new(stdin.lock(), stdout.lock());

    Uptimemon::new(config, rpc)
        .run_forever(&mut listener)
        .context("Uptime watchdog stopped")
}

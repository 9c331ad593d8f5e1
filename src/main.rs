mod cli;

use crate::cli::Cli;
use clap::Parser;
use pacfs_config::Config;
use pacfs_host::SystemHost;
use pacfs_sync::Summary;
use pacfs_sync::refresh::Outcome;
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing_subscriber::EnvFilter;

const CRATES: [&str; 5] = ["pacfs", "pacfs_config", "pacfs_host", "pacfs_storage", "pacfs_sync"];

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    // RUST_LOG wins over the command-line flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directives: Vec<String> = CRATES.iter().map(|krate| format!("{krate}={level}")).collect();
        EnvFilter::new(directives.join(","))
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM, SIGHUP] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&shutdown)) {
            tracing::warn!(signal, error = %e, "Unable to register signal handler");
        }
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("{err:?}");
            return ExitCode::from(err.exit_code());
        },
    };
    let host = SystemHost::new(&config.service_user, &config.store_binary);

    match pacfs_sync::run(&config, &host, cli.options(), &shutdown) {
        Ok(Summary::Contended) => ExitCode::SUCCESS,
        Ok(Summary::Completed { published, refreshed }) => {
            let replaced = refreshed
                .iter()
                .flatten()
                .filter(|(_, outcome)| matches!(outcome, Outcome::Replaced { .. }))
                .count();
            tracing::info!(published = published.published, failed = published.failed, replaced, "Done");
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::from(err.exit_code())
        },
    }
}

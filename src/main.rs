// macrokeyd entry point - flag handling, log setup, hand-off to the core

mod cli;

use clap::error::ErrorKind;
use clap::Parser;
use cli::Cli;
use macrokeyd::config;
use macrokeyd::daemon::{self, Daemon};
use macrokeyd::listener::IdleListener;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) if matches!(err.kind(), ErrorKind::Io | ErrorKind::Format) => {
            // Internal parsing failure, not operator input.
            let _ = err.print();
            return ExitCode::FAILURE;
        }
        Err(err) => {
            // Bad flags are reported but do not stop the daemon; it
            // starts with its built-in defaults instead.
            let _ = err.print();
            Cli::default()
        }
    };

    init_tracing(cli.verbose);

    if cli.daemon {
        warn!("--daemon is accepted but not implemented, staying in the foreground");
    }

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));

    match Daemon::new(config_path).run(|_config, _identity| IdleListener::default()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            daemon::report_fatal(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

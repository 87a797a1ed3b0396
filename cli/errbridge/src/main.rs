//! errbridge CLI — inspect and exercise the native error bridge.

mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use errbridge_core::config::LoggingSection;
use errbridge_core::FatalPolicy;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "errbridge", version, about = "Native-to-host error bridge tooling")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter errbridge.toml
    Init {
        /// Native library name
        #[arg(long, default_value = "native")]
        library: String,
        /// Fatal policy for protocol violations (panic, abort)
        #[arg(long, default_value = "panic")]
        fatal: String,
    },
    /// Print the callback registration contract
    Contract {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Raise one error on an in-process bridge and show what the host receives
    Simulate {
        /// Error kind (e.g., IO, DivideByZero, ArgumentNull)
        #[arg(long)]
        kind: String,
        /// Error message
        #[arg(long)]
        message: String,
        /// Parameter name (argument kinds only)
        #[arg(long)]
        param: Option<String>,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check configuration and run a loopback handshake
    Doctor,
}

fn main() {
    let cli = Cli::parse();
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    init_tracing(&cwd);

    let result = match cli.command {
        Commands::Init { library, fatal } => match FatalPolicy::parse(&fatal) {
            Some(policy) => commands::init::run(&cwd, &library, policy),
            None => Err(anyhow::anyhow!(
                "unknown fatal policy '{fatal}' (expected panic or abort)"
            )),
        },
        Commands::Contract { format } => commands::contract::run(&format),
        Commands::Simulate {
            kind,
            message,
            param,
            json,
        } => commands::simulate::run(&kind, &message, param.as_deref(), json),
        Commands::Doctor => commands::doctor::run(&cwd),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise the configured `logging.filter` applies.
///
/// A broken `errbridge.toml` must not stop unrelated commands (or `doctor`,
/// which reports it), so it only costs a warning.
fn init_tracing(cwd: &Path) {
    let (directive, problem) = configured_filter(cwd);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    if let Some(problem) = problem {
        tracing::warn!("{problem}; using default log filter '{directive}'");
    }
}

/// The filter directive to use, and why the default was used instead, if it was.
fn configured_filter(cwd: &Path) -> (String, Option<String>) {
    let fallback = LoggingSection::default().filter;
    match config::load_or_default(cwd) {
        Ok(config) => match EnvFilter::try_new(&config.logging.filter) {
            Ok(_) => (config.logging.filter, None),
            Err(e) => (
                fallback,
                Some(format!("invalid logging.filter '{}': {e}", config.logging.filter)),
            ),
        },
        Err(e) => (fallback, Some(format!("{e:#}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errbridge_core::config::CONFIG_FILE_NAME;

    #[test]
    fn filter_comes_from_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[logging]\nfilter = \"errbridge_core=debug\"\n",
        )
        .unwrap();
        assert_eq!(
            configured_filter(dir.path()),
            ("errbridge_core=debug".to_string(), None)
        );
    }

    #[test]
    fn malformed_config_falls_back_with_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[bridge\n").unwrap();
        let (directive, problem) = configured_filter(dir.path());
        assert_eq!(directive, "info");
        assert!(problem.unwrap().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn invalid_filter_directive_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[logging]\nfilter = \"errbridge_core=loudest\"\n",
        )
        .unwrap();
        let (directive, problem) = configured_filter(dir.path());
        assert_eq!(directive, "info");
        assert!(problem.unwrap().contains("logging.filter"));
    }
}

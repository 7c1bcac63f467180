// SPDX-FileCopyrightText: 2026 Outdial Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outdial - outbound telephone campaign dialer.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use outdial_config::OutdialConfig;
use outdial_config::validation::validate_endpoints;

/// Outdial - outbound telephone campaign dialer.
#[derive(Parser, Debug)]
#[command(name = "outdial", version, about, long_about = None)]
struct Cli {
    /// Configuration file. Defaults to the XDG lookup hierarchy.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the dialer and its command gateway.
    Serve,
    /// Validate the configuration and exit.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> OutdialConfig {
    let loaded = match path {
        Some(path) => outdial_config::load_and_validate_path(path),
        None => outdial_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            outdial_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("outdial: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Check) => {
            if let Err(errors) = validate_endpoints(&config) {
                outdial_config::render_errors(&errors);
                std::process::exit(1);
            }
            println!(
                "outdial: config ok (telephony={}, records={}, database={}, gateway={}:{})",
                config.telephony.base_url,
                config.records.base_url,
                config.storage.database_path,
                config.gateway.bind_address,
                config.gateway.port
            );
        }
        None => {
            println!("outdial: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_serve_with_config() {
        let cli = Cli::try_parse_from(["outdial", "serve", "--config", "/tmp/outdial.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Serve)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/outdial.toml")));
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["outdial", "dial"]).is_err());
    }
}

// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atende - a chat-sales conversation engine.
//!
//! This is the binary entry point.

mod app;
mod check;
mod console;
mod extract;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Atende - trial provisioning walkthroughs, quick replies and custom flows
/// for chat-based sales.
#[derive(Parser, Debug)]
#[command(name = "atende", version, about, long_about = None)]
struct Cli {
    /// Path to a configuration file (overrides the default search paths).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Talk to the engine from the terminal, as a contact or as the agent.
    Shell {
        /// Device (session) name. Defaults to `agent.device`.
        #[arg(long)]
        device: Option<String>,
        /// Contact phone number.
        #[arg(long, default_value = "5511999990000")]
        contact: String,
    },
    /// Check the configuration and the services it points at.
    Check {
        /// Plain output without colors.
        #[arg(long)]
        plain: bool,
    },
    /// Read a device identifier from an image or a text file.
    Extract {
        /// Image (or .txt) to read.
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => atende_config::load_and_validate_path(path),
        None => atende_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            atende_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    let code = match cli.command {
        Some(Commands::Shell { device, contact }) => {
            let device = device.unwrap_or_else(|| config.agent.device.clone());
            match shell::run_shell(config, device, contact).await {
                Ok(()) => 0,
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
        Some(Commands::Check { plain }) => match check::run_check(&config, plain).await {
            Ok(0) => 0,
            Ok(_) => 1,
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        },
        Some(Commands::Extract { path }) => match extract::run_extract(&config, &path).await {
            Ok(true) => 0,
            Ok(false) => 1,
            Err(e) => {
                eprintln!("error: {e}");
                1
            }
        },
        None => {
            println!("atende: use --help for available commands");
            0
        }
    };
    std::process::exit(code);
}

/// Initialize the tracing subscriber with an env filter.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let crates = [
            "atende",
            "atende_agent",
            "atende_catalog",
            "atende_config",
            "atende_extract",
            "atende_followup",
            "atende_ocr",
            "atende_upstream",
        ];
        let directives: Vec<String> = crates.iter().map(|c| format!("{c}={log_level}")).collect();
        EnvFilter::new(format!("{},warn", directives.join(",")))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

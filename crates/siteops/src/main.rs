//! siteops CLI.
//!
//! Run `siteops --help` for usage information.

// CLI binaries legitimately need println! for user output
#![allow(clippy::disallowed_macros)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::drain::DrainCommand;
use commands::reset::ResetCommand;
use commands::seed::SeedCommand;
use commands::status::StatusCommand;
use commands::webhook::WebhookCommand;
use siteops::error::display_chain;
use siteops::flow::exit_code;
use siteops::report;

/// Content site maintenance tooling.
#[derive(Parser)]
#[command(
    name = "siteops",
    version,
    about = "Content site maintenance tooling",
    long_about = "Reset the Telegram bot (drain backlog tables, reinstall the webhook)\n\
                  and generate WordPress seed content.\n\n\
                  Settings come from flags, a JSON config file, the environment\n\
                  (.env.local is loaded when present), or interactive prompts."
)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drain backlog tables, then reinstall the webhook.
    Reset(ResetCommand),

    /// Reinstall the webhook only.
    Webhook(WebhookCommand),

    /// Drain backlog tables only.
    Drain(DrainCommand),

    /// Show the current webhook state.
    Status(StatusCommand),

    /// Write the WXR seed content file.
    SeedWxr(SeedCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info,siteops=debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Reset(cmd) => cmd.run().await,
        Commands::Webhook(cmd) => cmd.run().await,
        Commands::Drain(cmd) => cmd.run().await,
        Commands::Status(cmd) => cmd.run().await,
        Commands::SeedWxr(cmd) => cmd.run(),
    };

    if let Err(e) = &result {
        report::print_section("✗ FAILED");
        eprintln!("{}", display_chain(e.as_ref()));
    }
    ExitCode::from(exit_code(&result))
}

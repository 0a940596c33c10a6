//! Aegis CLI binary entrypoint.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use aegis_cli::cli::{Cli, Commands};
use aegis_cli::commands::{AuditCommand, GuardCommand, VaultCommand};
use aegis_cli::{Context, OutputFormat};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), aegis_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let ctx = Context::from_cli(&cli);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Vault { command } => {
            VaultCommand::new(&ctx)
                .execute(&mut stdout, &format, command)
                .await
        }
        Commands::Audit { command } => {
            AuditCommand::new(&ctx)
                .execute(&mut stdout, &format, command)
                .await
        }
        Commands::Guard { command } => {
            GuardCommand::new(&ctx)
                .execute(&mut stdout, &format, command)
                .await
        }
    }
}

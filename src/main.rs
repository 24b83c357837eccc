//! Main entry point for the rosetta-checker CLI application.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rosetta_checker::cli::{Command, File2IngestArgs};
use rosetta_checker::{AuditStats, Cli, Session};

/// Exit status for a run stopped by Ctrl-C, as shells report SIGINT.
const INTERRUPTED: u8 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(command = cli.command.name(), "starting");
    match cli.command {
        Command::File2Ingest(args) => file2ingest(args).await,
    }
}

enum Outcome {
    Finished(rosetta_checker::error::Result<AuditStats>),
    Interrupted,
}

async fn file2ingest(args: File2IngestArgs) -> Result<ExitCode> {
    let config = args.config();
    if config.delete {
        warn!("deleting ingested files is not supported; nothing will be removed");
    }
    let source = args.lookup_source()?;
    let arguments = args.arguments();

    let mut session = Session::open(&config, &source).await?;

    let outcome = tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
        result = session.audit(&config, &arguments) => Outcome::Finished(result),
    };

    // Release the connection and flush the report whatever happened above
    let closed = session.close().await;

    match outcome {
        Outcome::Finished(Ok(stats)) => {
            info!(
                units = stats.units,
                records = stats.records,
                matched = stats.matched,
                name_matched = stats.name_matched,
                errors = stats.errors,
                "audit complete"
            );
            closed?;
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Finished(Err(e)) => {
            error!(kind = e.kind(), "audit aborted: {e}");
            if let Err(close_error) = closed {
                error!("{close_error}");
            }
            Err(e.into())
        }
        Outcome::Interrupted => {
            warn!("interrupted; audit aborted, partial report kept");
            closed?;
            Ok(ExitCode::from(INTERRUPTED))
        }
    }
}

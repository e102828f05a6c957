//! `pageshift` - page-transition coordinator CLI

use clap::Parser;

use pageshift::cli::args::Cli;
use pageshift::cli::commands;
use pageshift::error::ExitCode;
use pageshift::observability::{LogFormat, describe_metrics, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        init_logging(LogFormat::from(cli.log_format), cli.verbose, cli.color);
    }
    describe_metrics();

    // First signal starts a short grace period, a second one exits at once
    tokio::spawn(async {
        let Ok(mut sigterm) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            tracing::warn!("failed to register SIGTERM handler");
            return;
        };

        let code = tokio::select! {
            _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
            _ = sigterm.recv() => ExitCode::TERMINATED,
        };

        eprintln!("\nStopping session... (press Ctrl+C again to force)");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
            _ = sigterm.recv() => std::process::exit(ExitCode::TERMINATED),
            () = tokio::time::sleep(std::time::Duration::from_secs(2)) => std::process::exit(code),
        }
    });

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            if let pageshift::error::PageshiftError::Config(
                pageshift::error::ConfigError::ValidationError { errors, .. },
            ) = &e
            {
                for issue in errors {
                    eprintln!("  {issue}");
                }
            }
            std::process::exit(e.exit_code());
        }
    }
}

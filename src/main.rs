//! Complaint Outcomes - Main Entry Point

use clap::Parser;
use complaint_outcomes::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "complaint_outcomes=debug"
    } else {
        "complaint_outcomes=info"
    };

    // Logs on stderr keep stdout for the reports
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    run(&cli)?;

    Ok(())
}

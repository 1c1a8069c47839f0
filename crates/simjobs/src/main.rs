//! simjobs - merge emulator job timings with accounting metadata.

use camino::Utf8PathBuf;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use simjobs_core::{CorrelationMap, EventStream, JobTable};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "simjobs")]
#[command(about = "Merge emulator job timings with accounting metadata into a CSV report")]
pub struct Args {
    /// Accounting CSV with JobID, NNodes, NCPUS, IORate(MB) columns
    pub job_file: Utf8PathBuf,

    /// Emulator log to extract job lifecycle events from
    pub emulator_output: Utf8PathBuf,

    /// Destination path for the combined CSV report
    pub outfile: Utf8PathBuf,
}

fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default warn level
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let events = EventStream::open(&args.emulator_output).into_diagnostic()?;
    let table = JobTable::from_events(events).into_diagnostic()?;

    let mut correlated = CorrelationMap::from_table(table);
    correlated.merge_accounting(&args.job_file).into_diagnostic()?;

    let (mut records, diagnostics) = correlated.into_parts();
    for diag in &diagnostics {
        tracing::warn!("{diag}");
    }

    simjobs_core::write_report_file(&args.outfile, &mut records).into_diagnostic()?;

    Ok(())
}

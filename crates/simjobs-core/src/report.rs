//! Report formatting and CSV output.
//!
//! Field widths are cosmetic padding; consumers are expected to trim
//! fields, not to rely on byte offsets.

use camino::Utf8Path;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use thiserror::Error;

use crate::job::JobRecord;

/// Fixed header row of the report, in output order.
pub const REPORT_HEADER: [&str; 9] = [
    "jobid", "csvid", "submit", "schedule", "run", "complete", "nnodes", "ntasks", "io_rate",
];

const MISSING_WIDTH: usize = 13;
const INT_WIDTH: usize = 5;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),
}

/// Write the report for `records` to `writer`: header row, then one row
/// per job in ascending job id order.
pub fn write_report<W: Write>(writer: W, records: &mut [JobRecord]) -> Result<(), ReportError> {
    records.sort_by_key(|r| r.job_id);
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(REPORT_HEADER)?;
    for record in records.iter() {
        out.write_record(report_row(record))?;
    }
    out.flush()?;
    Ok(())
}

/// Write the report to a file at `path`, creating or truncating it.
pub fn write_report_file(path: &Utf8Path, records: &mut [JobRecord]) -> Result<(), ReportError> {
    let file = File::create(path)?;
    write_report(BufWriter::new(file), records)
}

fn report_row(record: &JobRecord) -> [String; 9] {
    [
        fmt_int(record.job_id),
        fmt_int(record.csv_id),
        fmt_opt_float(record.submit_time),
        fmt_opt_float(record.schedule_time),
        fmt_opt_float(record.run_time),
        fmt_opt_float(record.complete_time),
        fmt_opt_int(record.nnodes),
        fmt_opt_int(record.ntasks),
        fmt_opt_float(record.io_rate),
    ]
}

fn fmt_missing() -> String {
    format!("{:>width$}", "None", width = MISSING_WIDTH)
}

fn fmt_int(v: u64) -> String {
    format!("{:>width$}", v, width = INT_WIDTH)
}

fn fmt_opt_int(v: Option<u64>) -> String {
    v.map(fmt_int).unwrap_or_else(fmt_missing)
}

fn fmt_opt_float(v: Option<f64>) -> String {
    v.map(fmt_float).unwrap_or_else(fmt_missing)
}

/// Scientific notation with five fractional digits and a signed,
/// at-least-two-digit exponent (`1.25000e+01`), right-justified.
fn fmt_float(v: f64) -> String {
    let exp_form = format!("{v:.5e}");
    let (mantissa, exp) = exp_form.split_once('e').expect("exponent marker");
    let exp: i32 = exp.parse().expect("numeric exponent");
    format!(
        "{:>width$}",
        format!("{mantissa}e{exp:+03}"),
        width = MISSING_WIDTH
    )
}

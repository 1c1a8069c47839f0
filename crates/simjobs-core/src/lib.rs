//! Reconstruct per-job timing reports from emulator log output.
//!
//! The emulator announces its simulation clock and job lifecycle changes
//! as free-text log lines. This crate extracts those into typed events,
//! folds them into per-job records, joins in node/task/IO metadata from
//! an accounting CSV, and writes a combined CSV report.

pub mod accounting;
pub mod diagnostics;
pub mod events;
pub mod job;
pub mod report;

pub use accounting::{AccountingError, CorrelationMap};
pub use diagnostics::{Diagnostic, Field};
pub use events::{EventError, EventStream, LifecycleEvent, TimedEvent};
pub use job::{JobRecord, JobTable, TableError};
pub use report::{write_report, write_report_file, ReportError, REPORT_HEADER};

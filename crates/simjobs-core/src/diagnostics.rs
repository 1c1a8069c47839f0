//! Non-fatal observations reported while building and merging job records.
//!
//! Core mutation calls return these instead of printing, so callers decide
//! how to surface them.

use std::fmt;

/// A job record field that can be populated at most once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Submit,
    Schedule,
    Run,
    Complete,
    Nnodes,
    Ntasks,
    IoRate,
}

impl Field {
    /// Name used in overwrite messages, mirroring the report columns.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Submit => "submit time",
            Self::Schedule => "schedule time",
            Self::Run => "run time",
            Self::Complete => "complete time",
            Self::Nnodes => "nnodes",
            Self::Ntasks => "ntasks",
            Self::IoRate => "io_rate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Submit => "submit",
            Self::Schedule => "schedule",
            Self::Run => "run",
            Self::Complete => "complete",
            Self::Nnodes => "nnodes",
            Self::Ntasks => "ntasks",
            Self::IoRate => "io_rate",
        };
        f.write_str(label)
    }
}

/// Something worth warning about that does not stop the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A field that already held a value was replaced (last write wins).
    Overwrite { job_id: u64, field: Field },
    /// A second submit event re-created an existing record.
    ResubmittedJob { job_id: u64 },
    /// Two jobs claimed the same accounting csv id; one record was dropped.
    CsvIdCollision {
        csv_id: u64,
        kept_job: u64,
        dropped_job: u64,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overwrite { job_id, field } => {
                write!(f, "overwriting existing {} for job {}", field.describe(), job_id)
            }
            Self::ResubmittedJob { job_id } => {
                write!(f, "job {job_id} submitted again, previous record discarded")
            }
            Self::CsvIdCollision {
                csv_id,
                kept_job,
                dropped_job,
            } => {
                write!(
                    f,
                    "csv id {csv_id} claimed by jobs {dropped_job} and {kept_job}, keeping job {kept_job}"
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_message() {
        let diag = Diagnostic::Overwrite {
            job_id: 7,
            field: Field::Schedule,
        };
        assert_eq!(diag.to_string(), "overwriting existing schedule time for job 7");
    }

    #[test]
    fn test_collision_message() {
        let diag = Diagnostic::CsvIdCollision {
            csv_id: 3,
            kept_job: 9,
            dropped_job: 4,
        };
        assert_eq!(
            diag.to_string(),
            "csv id 3 claimed by jobs 4 and 9, keeping job 9"
        );
    }
}

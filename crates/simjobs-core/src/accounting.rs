//! Accounting CSV metadata and the merge into job records.
//!
//! The accounting file keys rows by the job's csv id, so records are
//! re-keyed from simulator job id before joining.

use camino::Utf8Path;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use thiserror::Error;

use crate::diagnostics::Diagnostic;
use crate::job::{JobRecord, JobTable};

#[derive(Error, Debug)]
pub enum AccountingError {
    #[error("failed to read accounting csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid {column} value in accounting csv: {value:?}")]
    InvalidField {
        column: &'static str,
        value: String,
    },
}

/// One row of the accounting csv, fields still unparsed. Extra columns are
/// ignored; the named columns must be present. Only JobID is parsed for
/// every row; the rest are parsed once the row matches a record.
#[derive(Debug, Deserialize)]
struct AccountingRow {
    #[serde(rename = "JobID")]
    job_id: String,
    #[serde(rename = "NNodes")]
    nnodes: String,
    #[serde(rename = "NCPUS")]
    ncpus: String,
    #[serde(rename = "IORate(MB)")]
    io_rate: String,
}

fn parse_field<T: std::str::FromStr>(
    column: &'static str,
    raw: &str,
) -> Result<T, AccountingError> {
    raw.parse().map_err(|_| AccountingError::InvalidField {
        column,
        value: raw.to_string(),
    })
}

/// Job records re-keyed by their accounting csv id.
#[derive(Debug)]
pub struct CorrelationMap {
    by_csv_id: HashMap<u64, JobRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl CorrelationMap {
    /// Re-key a completed job table by csv id.
    ///
    /// Records are inserted in ascending job id order, so when two jobs
    /// claim the same csv id the higher job id wins deterministically and
    /// the collision is reported.
    pub fn from_table(table: JobTable) -> Self {
        let (records, diagnostics) = table.into_parts();
        let mut map = Self {
            by_csv_id: HashMap::with_capacity(records.len()),
            diagnostics,
        };
        for record in records {
            let csv_id = record.csv_id;
            let kept_job = record.job_id;
            if let Some(dropped) = map.by_csv_id.insert(csv_id, record) {
                map.diagnostics.push(Diagnostic::CsvIdCollision {
                    csv_id,
                    kept_job,
                    dropped_job: dropped.job_id,
                });
            }
        }
        map
    }

    /// Join accounting rows from `path` into the matching records.
    ///
    /// Rows whose JobID matches no csv id are skipped without touching
    /// their other columns; matching rows set nnodes, ntasks (from NCPUS)
    /// and io_rate with the usual overwrite-reports policy. A missing
    /// column, an unparseable JobID, or a malformed matched row is fatal.
    pub fn merge_accounting(&mut self, path: &Utf8Path) -> Result<(), AccountingError> {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;
        self.merge_reader(reader)
    }

    /// Join accounting rows from an already-open csv reader.
    pub fn merge_reader<R: io::Read>(
        &mut self,
        mut reader: csv::Reader<R>,
    ) -> Result<(), AccountingError> {
        for row in reader.deserialize() {
            let row: AccountingRow = row?;
            let job_id: u64 = parse_field("JobID", &row.job_id)?;
            let Some(record) = self.by_csv_id.get_mut(&job_id) else {
                continue;
            };
            let nnodes = parse_field("NNodes", &row.nnodes)?;
            let ncpus = parse_field("NCPUS", &row.ncpus)?;
            let io_rate = parse_field("IORate(MB)", &row.io_rate)?;
            let updates = [
                record.set_nnodes(nnodes),
                record.set_ntasks(ncpus),
                record.set_io_rate(io_rate),
            ];
            self.diagnostics.extend(updates.into_iter().flatten());
        }
        Ok(())
    }

    pub fn get(&self, csv_id: u64) -> Option<&JobRecord> {
        self.by_csv_id.get(&csv_id)
    }

    pub fn len(&self) -> usize {
        self.by_csv_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_csv_id.is_empty()
    }

    /// Consume the map, yielding records in ascending job id order and all
    /// diagnostics accumulated since the table build.
    pub fn into_parts(self) -> (Vec<JobRecord>, Vec<Diagnostic>) {
        let mut records: Vec<_> = self.by_csv_id.into_values().collect();
        records.sort_by_key(|r| r.job_id);
        (records, self.diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Field;
    use crate::events::{EventError, LifecycleEvent, TimedEvent};

    fn table(jobs: &[(u64, u64)]) -> JobTable {
        let events = jobs.iter().map(|&(job_id, csv_id)| {
            Ok::<_, EventError>(TimedEvent {
                event: LifecycleEvent::Submit { job_id, csv_id },
                sim_time: 0.0,
            })
        });
        JobTable::from_events(events).unwrap()
    }

    fn csv_reader(content: &str) -> csv::Reader<&[u8]> {
        csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
    }

    #[test]
    fn test_merge_sets_metadata() {
        let mut map = CorrelationMap::from_table(table(&[(5, 2)]));
        let rows = "JobID,NNodes,NCPUS,IORate(MB)\n2,4,16,3.2\n";
        map.merge_reader(csv_reader(rows)).unwrap();

        let record = map.get(2).unwrap();
        assert_eq!(record.job_id, 5);
        assert_eq!(record.nnodes, Some(4));
        assert_eq!(record.ntasks, Some(16));
        assert_eq!(record.io_rate, Some(3.2));
    }

    #[test]
    fn test_unmatched_row_skipped() {
        let mut map = CorrelationMap::from_table(table(&[(5, 2)]));
        let rows = "JobID,NNodes,NCPUS,IORate(MB)\n99,4,16,3.2\n";
        map.merge_reader(csv_reader(rows)).unwrap();
        assert_eq!(map.get(2).unwrap().nnodes, None);
    }

    #[test]
    fn test_column_order_irrelevant_and_extras_ignored() {
        let mut map = CorrelationMap::from_table(table(&[(1, 7)]));
        let rows = "Account,IORate(MB),NCPUS,JobID,NNodes\nproj,1.5,8,7,2\n";
        map.merge_reader(csv_reader(rows)).unwrap();

        let record = map.get(7).unwrap();
        assert_eq!(record.nnodes, Some(2));
        assert_eq!(record.ntasks, Some(8));
        assert_eq!(record.io_rate, Some(1.5));
    }

    #[test]
    fn test_malformed_matched_row_is_fatal() {
        let mut map = CorrelationMap::from_table(table(&[(1, 7)]));
        let rows = "JobID,NNodes,NCPUS,IORate(MB)\n7,not-a-number,8,1.5\n";
        assert!(matches!(
            map.merge_reader(csv_reader(rows)),
            Err(AccountingError::InvalidField { column: "NNodes", .. })
        ));
    }

    #[test]
    fn test_malformed_unmatched_row_is_skipped() {
        let mut map = CorrelationMap::from_table(table(&[(5, 2)]));
        // Row 99 matches nothing, so its bad NNodes must not be parsed.
        let rows = "JobID,NNodes,NCPUS,IORate(MB)\n99,N/A,16,3.2\n2,4,16,3.2\n";
        map.merge_reader(csv_reader(rows)).unwrap();

        let record = map.get(2).unwrap();
        assert_eq!(record.nnodes, Some(4));
        assert_eq!(record.ntasks, Some(16));
        assert_eq!(record.io_rate, Some(3.2));
    }

    #[test]
    fn test_unparseable_job_id_is_fatal() {
        let mut map = CorrelationMap::from_table(table(&[(5, 2)]));
        let rows = "JobID,NNodes,NCPUS,IORate(MB)\nabc,4,16,3.2\n";
        assert!(matches!(
            map.merge_reader(csv_reader(rows)),
            Err(AccountingError::InvalidField { column: "JobID", .. })
        ));
    }

    #[test]
    fn test_repeated_row_overwrites_and_warns() {
        let mut map = CorrelationMap::from_table(table(&[(1, 7)]));
        let rows = "JobID,NNodes,NCPUS,IORate(MB)\n7,2,8,1.5\n7,3,9,2.5\n";
        map.merge_reader(csv_reader(rows)).unwrap();

        let record = map.get(7).unwrap();
        assert_eq!(record.nnodes, Some(3));
        assert_eq!(record.ntasks, Some(9));
        assert_eq!(record.io_rate, Some(2.5));

        let (_, diagnostics) = map.into_parts();
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::Overwrite { job_id: 1, field: Field::Nnodes },
                Diagnostic::Overwrite { job_id: 1, field: Field::Ntasks },
                Diagnostic::Overwrite { job_id: 1, field: Field::IoRate },
            ]
        );
    }

    #[test]
    fn test_csv_id_collision_keeps_higher_job_id() {
        let map = CorrelationMap::from_table(table(&[(4, 3), (9, 3)]));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(3).unwrap().job_id, 9);

        let (_, diagnostics) = map.into_parts();
        assert_eq!(
            diagnostics,
            vec![Diagnostic::CsvIdCollision {
                csv_id: 3,
                kept_job: 9,
                dropped_job: 4
            }]
        );
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let mut map = CorrelationMap::from_table(table(&[(1, 1)]));
        assert!(map
            .merge_accounting(Utf8Path::new("/no/such/accounting.csv"))
            .is_err());
    }
}

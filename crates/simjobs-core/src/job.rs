//! Per-job timing records and the table that collects them.

use std::collections::HashMap;
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Field};
use crate::events::{EventError, LifecycleEvent, TimedEvent};

#[derive(Error, Debug)]
pub enum TableError {
    #[error(transparent)]
    Event(#[from] EventError),
    #[error("{stage} event for job {job_id} with no prior submit")]
    UnknownJob { job_id: u64, stage: Field },
}

/// Timing and accounting data for one job observed in the log.
///
/// Timing fields hold simulation-clock values; the accounting fields stay
/// absent until the csv merge. Every optional field follows last-write-wins
/// with an overwrite diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub job_id: u64,
    pub csv_id: u64,
    pub submit_time: Option<f64>,
    pub schedule_time: Option<f64>,
    pub run_time: Option<f64>,
    pub complete_time: Option<f64>,
    pub nnodes: Option<u64>,
    pub ntasks: Option<u64>,
    pub io_rate: Option<f64>,
}

impl JobRecord {
    pub fn new(job_id: u64, csv_id: u64) -> Self {
        Self {
            job_id,
            csv_id,
            submit_time: None,
            schedule_time: None,
            run_time: None,
            complete_time: None,
            nnodes: None,
            ntasks: None,
            io_rate: None,
        }
    }

    pub(crate) fn set_submit(&mut self, t: f64) -> Option<Diagnostic> {
        let prior = self.submit_time.replace(t).is_some();
        prior.then(|| self.overwrote(Field::Submit))
    }

    pub(crate) fn set_schedule(&mut self, t: f64) -> Option<Diagnostic> {
        let prior = self.schedule_time.replace(t).is_some();
        prior.then(|| self.overwrote(Field::Schedule))
    }

    pub(crate) fn set_run(&mut self, t: f64) -> Option<Diagnostic> {
        let prior = self.run_time.replace(t).is_some();
        prior.then(|| self.overwrote(Field::Run))
    }

    pub(crate) fn set_complete(&mut self, t: f64) -> Option<Diagnostic> {
        let prior = self.complete_time.replace(t).is_some();
        prior.then(|| self.overwrote(Field::Complete))
    }

    pub(crate) fn set_nnodes(&mut self, n: u64) -> Option<Diagnostic> {
        let prior = self.nnodes.replace(n).is_some();
        prior.then(|| self.overwrote(Field::Nnodes))
    }

    pub(crate) fn set_ntasks(&mut self, n: u64) -> Option<Diagnostic> {
        let prior = self.ntasks.replace(n).is_some();
        prior.then(|| self.overwrote(Field::Ntasks))
    }

    pub(crate) fn set_io_rate(&mut self, rate: f64) -> Option<Diagnostic> {
        let prior = self.io_rate.replace(rate).is_some();
        prior.then(|| self.overwrote(Field::IoRate))
    }

    fn overwrote(&self, field: Field) -> Diagnostic {
        Diagnostic::Overwrite {
            job_id: self.job_id,
            field,
        }
    }
}

/// Mapping from simulator job id to its record.
///
/// Built in a single pass over the event stream; diagnostics accumulate
/// alongside instead of being printed from the mutation path.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: HashMap<u64, JobRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl JobTable {
    /// Fold an event stream into a complete table.
    ///
    /// A submit creates (or re-creates) the record; any other event must
    /// reference a job already submitted or the fold fails.
    pub fn from_events<I>(events: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = Result<TimedEvent, EventError>>,
    {
        let mut table = Self::default();
        for event in events {
            table.apply(event?)?;
        }
        Ok(table)
    }

    fn apply(&mut self, timed: TimedEvent) -> Result<(), TableError> {
        let TimedEvent { event, sim_time } = timed;
        let diag = match event {
            LifecycleEvent::Submit { job_id, csv_id } => {
                let mut record = JobRecord::new(job_id, csv_id);
                record.set_submit(sim_time);
                self.jobs
                    .insert(job_id, record)
                    .map(|_| Diagnostic::ResubmittedJob { job_id })
            }
            LifecycleEvent::Schedule { job_id } => self
                .lookup(job_id, Field::Schedule)?
                .set_schedule(sim_time),
            LifecycleEvent::Run { job_id } => self.lookup(job_id, Field::Run)?.set_run(sim_time),
            LifecycleEvent::Complete { job_id } => {
                self.lookup(job_id, Field::Complete)?.set_complete(sim_time)
            }
        };
        if let Some(diag) = diag {
            self.diagnostics.push(diag);
        }
        Ok(())
    }

    fn lookup(&mut self, job_id: u64, stage: Field) -> Result<&mut JobRecord, TableError> {
        self.jobs
            .get_mut(&job_id)
            .ok_or(TableError::UnknownJob { job_id, stage })
    }

    pub fn get(&self, job_id: u64) -> Option<&JobRecord> {
        self.jobs.get(&job_id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Consume the table, yielding records in ascending job id order and
    /// the diagnostics collected while building.
    pub fn into_parts(self) -> (Vec<JobRecord>, Vec<Diagnostic>) {
        let mut records: Vec<_> = self.jobs.into_values().collect();
        records.sort_by_key(|r| r.job_id);
        (records, self.diagnostics)
    }
}

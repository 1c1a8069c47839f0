//! Lifecycle event extraction from emulator log output.
//!
//! The log is unstructured text; only five line shapes carry meaning. Clock
//! announcements update a running simulation time, and each lifecycle line
//! yields an event stamped with the clock value in effect when it was read.

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use thiserror::Error;

static SIM_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Triggering.*Curr sim time: ([0-9.]+)").expect("valid sim time regex"));
static SUBMIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"submitted job ([0-9]+) \(([0-9]+) in csv\)").expect("valid submit regex"));
static SCHEDULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"scheduled job ([0-9]+)").expect("valid schedule regex"));
static RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"job ([0-9]+)'s state to starting then running").expect("valid run regex")
});
static COMPLETE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Job ([0-9]+) completed").expect("valid complete regex"));

#[derive(Error, Debug)]
pub enum EventError {
    #[error("failed to read emulator log: {0}")]
    Io(#[from] io::Error),
    #[error("unparseable number in log line: {0}")]
    BadNumber(String),
}

/// A job lifecycle stage observed in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Job entered the system; carries both the simulator id and the
    /// job's row id in the accounting csv.
    Submit { job_id: u64, csv_id: u64 },
    Schedule { job_id: u64 },
    Run { job_id: u64 },
    Complete { job_id: u64 },
}

impl LifecycleEvent {
    pub fn job_id(&self) -> u64 {
        match self {
            Self::Submit { job_id, .. }
            | Self::Schedule { job_id }
            | Self::Run { job_id }
            | Self::Complete { job_id } => *job_id,
        }
    }
}

/// A lifecycle event stamped with the simulation clock in effect when its
/// line was read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedEvent {
    pub event: LifecycleEvent,
    pub sim_time: f64,
}

/// Lazy event stream over an emulator log.
///
/// Line shapes are tested in a fixed priority order and a line matches at
/// most one; a clock line never yields an event. Lines matching nothing
/// are skipped. The clock starts at 0.0 until the first announcement.
pub struct EventStream<R> {
    lines: io::Lines<R>,
    sim_time: f64,
}

impl EventStream<BufReader<File>> {
    /// Open a log file for streaming. The handle is released when the
    /// stream is dropped.
    pub fn open(path: &Utf8Path) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            sim_time: 0.0,
        }
    }

    fn match_line(&mut self, line: &str) -> Result<Option<TimedEvent>, EventError> {
        if let Some(caps) = SIM_TIME_RE.captures(line) {
            self.sim_time = parse_f64(&caps[1])?;
            return Ok(None);
        }
        if let Some(caps) = SUBMIT_RE.captures(line) {
            return Ok(Some(self.stamp(LifecycleEvent::Submit {
                job_id: parse_u64(&caps[1])?,
                csv_id: parse_u64(&caps[2])?,
            })));
        }
        if let Some(caps) = SCHEDULE_RE.captures(line) {
            return Ok(Some(self.stamp(LifecycleEvent::Schedule {
                job_id: parse_u64(&caps[1])?,
            })));
        }
        if let Some(caps) = RUN_RE.captures(line) {
            return Ok(Some(self.stamp(LifecycleEvent::Run {
                job_id: parse_u64(&caps[1])?,
            })));
        }
        if let Some(caps) = COMPLETE_RE.captures(line) {
            return Ok(Some(self.stamp(LifecycleEvent::Complete {
                job_id: parse_u64(&caps[1])?,
            })));
        }
        Ok(None)
    }

    fn stamp(&self, event: LifecycleEvent) -> TimedEvent {
        TimedEvent {
            event,
            sim_time: self.sim_time,
        }
    }
}

impl<R: BufRead> Iterator for EventStream<R> {
    type Item = Result<TimedEvent, EventError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            match self.match_line(&line) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn parse_u64(s: &str) -> Result<u64, EventError> {
    s.parse().map_err(|_| EventError::BadNumber(s.to_string()))
}

fn parse_f64(s: &str) -> Result<f64, EventError> {
    s.parse().map_err(|_| EventError::BadNumber(s.to_string()))
}

//! Periodic job table access
//!
//! Subscriptions and upcoming-episode re-checks live in the user's crontab.
//! The rest of the crate only sees the `JobTable` trait so it can run
//! against an in-memory table in tests.

mod crontab;
mod memory;

pub use crontab::{CrontabDocument, SystemCrontab};
pub use memory::MemoryJobTable;

use crate::subscriptions::Subscription;
use chrono::{DateTime, Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading or writing the job table
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The crontab executable could not be run
    #[error("Failed to run {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    /// The crontab executable reported an error
    #[error("{program} failed: {message}")]
    CommandFailed { program: String, message: String },

    /// The job table is not valid UTF-8
    #[error("Job table is not valid UTF-8")]
    InvalidEncoding,

    /// Failed to serialize a job marker
    #[error("Failed to encode job marker: {0}")]
    MarkerEncoding(#[from] serde_json::Error),

    /// No job with the given id exists
    #[error("No job with id {0}")]
    UnknownJob(JobId),

    /// A repeat interval outside 1..=24 hours
    #[error("Invalid update rate of {0} hours, expected 1 to 24")]
    InvalidRate(u32),
}

/// Position of a job among the jobs of the table, valid until the next write
pub type JobId = usize;

/// Structured description of a job this program installed
///
/// Stored as a JSON comment directly above the job line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JobMarker {
    /// Recurring download of a subscribed episode, season or series
    Subscription(Subscription),
    /// One-shot re-check at the release of the next announced episode
    Upcoming { series_urn: String, url: String },
}

/// A job table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledJob {
    /// Five-field cron expression or `@` shortcut
    pub schedule: String,
    /// Shell command as cron executes it
    pub command: String,
    /// Marker for jobs installed by this program
    pub marker: Option<JobMarker>,
}

/// A job together with its id in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub id: JobId,
    pub job: ScheduledJob,
}

/// Trait for periodic job tables.
///
/// Every call reads the current table; `add` and `remove` write it back
/// immediately. There is no locking between processes.
pub trait JobTable {
    /// Lists all jobs, including ones installed by other programs.
    fn list(&self) -> Result<Vec<StoredJob>, SchedulerError>;

    /// Appends a job.
    fn add(&mut self, job: ScheduledJob) -> Result<(), SchedulerError>;

    /// Removes the job with the given id.
    fn remove(&mut self, id: JobId) -> Result<(), SchedulerError>;
}

impl<J: JobTable + ?Sized> JobTable for Box<J> {
    fn list(&self) -> Result<Vec<StoredJob>, SchedulerError> {
        (**self).list()
    }

    fn add(&mut self, job: ScheduledJob) -> Result<(), SchedulerError> {
        (**self).add(job)
    }

    fn remove(&mut self, id: JobId) -> Result<(), SchedulerError> {
        (**self).remove(id)
    }
}

/// Removes several jobs, highest id first so the remaining ids stay valid.
pub fn remove_all<J: JobTable + ?Sized>(
    table: &mut J,
    ids: &[JobId],
) -> Result<(), SchedulerError> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    for id in ids.into_iter().rev() {
        table.remove(id)?;
    }

    Ok(())
}

/// Cron expression running at minute 0 of every `hours`-th hour
pub fn every_hours(hours: u32) -> Result<String, SchedulerError> {
    if !(1..=24).contains(&hours) {
        return Err(SchedulerError::InvalidRate(hours));
    }

    Ok(format!("0 */{hours} * * *"))
}

/// Cron expression matching a single local point in time (once a year)
pub fn once_at(at: DateTime<Local>) -> String {
    format!(
        "{} {} {} {} *",
        at.minute(),
        at.hour(),
        at.day(),
        at.month()
    )
}

/// Quotes an argument for `/bin/sh` if needed
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@,+~".contains(c));

    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Builds a cron command line appending stdout and stderr to `log`
///
/// `%` is special in crontab lines and gets escaped.
pub fn build_command(program: &str, args: &[String], log: &str) -> String {
    let mut parts = vec![shell_quote(program)];
    parts.extend(args.iter().map(|a| shell_quote(a)));
    parts.push(">>".to_string());
    parts.push(shell_quote(log));
    parts.push("2>&1".to_string());

    parts.join(" ").replace('%', r"\%")
}

//! In-memory job table
//!
//! Behaves like the system crontab (same text format, same ids) without
//! touching the host scheduler. Useful for tests and dry runs.

use super::{CrontabDocument, JobId, JobTable, ScheduledJob, SchedulerError, StoredJob};

/// Job table kept as crontab text in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryJobTable {
    text: String,
}

impl MemoryJobTable {
    /// Creates a table from existing crontab text
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Current crontab text
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl JobTable for MemoryJobTable {
    fn list(&self) -> Result<Vec<StoredJob>, SchedulerError> {
        Ok(CrontabDocument::parse(&self.text).jobs())
    }

    fn add(&mut self, job: ScheduledJob) -> Result<(), SchedulerError> {
        let mut document = CrontabDocument::parse(&self.text);
        document.push(job);
        self.text = document.render()?;
        Ok(())
    }

    fn remove(&mut self, id: JobId) -> Result<(), SchedulerError> {
        let mut document = CrontabDocument::parse(&self.text);
        document.remove(id)?;
        self.text = document.render()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_list_remove() {
        let mut table = MemoryJobTable::from_text("MAILTO=\"\"\n");
        table
            .add(ScheduledJob {
                schedule: "0 */3 * * *".to_string(),
                command: "true".to_string(),
                marker: None,
            })
            .unwrap();

        let jobs = table.list().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].job.schedule, "0 */3 * * *");
        assert_eq!(table.text(), "MAILTO=\"\"\n0 */3 * * * true\n");

        table.remove(0).unwrap();
        assert!(table.list().unwrap().is_empty());
        assert_eq!(table.text(), "MAILTO=\"\"\n");

        assert!(matches!(table.remove(0), Err(SchedulerError::UnknownJob(0))));
    }
}

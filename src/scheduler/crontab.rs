//! Crontab text format and the system crontab backend
//!
//! Jobs installed by this program are preceded by a marker comment:
//!
//! ```text
//! # drdl: {"kind":"subscription","url":"https://www.dr.dk/tv/se/...",...}
//! 0 */2 * * * /usr/local/bin/drdl dl https://www.dr.dk/tv/se/... >> /home/me/.local/share/drdl/drdl.log 2>&1
//! ```
//!
//! All other lines (comments, environment settings, foreign jobs) are kept
//! byte for byte.

use super::{JobId, JobMarker, JobTable, ScheduledJob, SchedulerError, StoredJob};
use regex::Regex;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

/// Prefix of marker comments
const MARKER_PREFIX: &str = "# drdl:";

/// `@shortcut command` or five schedule fields followed by a command
static JOB_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(@[a-z]+|\S+\s+\S+\s+\S+\s+\S+\s+\S+)\s+(\S.*)$").expect("valid regex")
});

/// `NAME=value` environment assignments
static ENV_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Za-z_][A-Za-z0-9_]*\s*=").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
enum Line {
    /// Anything that is not a job, kept verbatim
    Raw(String),
    /// A job; `source` holds the original lines while it is unchanged
    Job {
        job: ScheduledJob,
        source: Option<Vec<String>>,
    },
}

/// A parsed crontab
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrontabDocument {
    lines: Vec<Line>,
}

impl CrontabDocument {
    /// Parses crontab text
    pub fn parse(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut pending: Option<(String, JobMarker)> = None;

        for line in text.lines() {
            if let Some(marker) = parse_marker(line) {
                if let Some((orphan, _)) = pending.take() {
                    lines.push(Line::Raw(orphan));
                }
                pending = Some((line.to_string(), marker));
                continue;
            }

            match parse_job(line) {
                Some((schedule, command)) => {
                    let (marker, mut source) = match pending.take() {
                        Some((marker_line, marker)) => (Some(marker), vec![marker_line]),
                        None => (None, Vec::new()),
                    };
                    source.push(line.to_string());
                    lines.push(Line::Job {
                        job: ScheduledJob {
                            schedule,
                            command,
                            marker,
                        },
                        source: Some(source),
                    });
                }
                None => {
                    if let Some((orphan, _)) = pending.take() {
                        lines.push(Line::Raw(orphan));
                    }
                    lines.push(Line::Raw(line.to_string()));
                }
            }
        }

        if let Some((orphan, _)) = pending {
            lines.push(Line::Raw(orphan));
        }

        Self { lines }
    }

    /// Renders the document back to crontab text
    pub fn render(&self) -> Result<String, SchedulerError> {
        let mut out = String::new();

        for line in &self.lines {
            match line {
                Line::Raw(text) => {
                    out.push_str(text);
                    out.push('\n');
                }
                Line::Job {
                    source: Some(source),
                    ..
                } => {
                    for text in source {
                        out.push_str(text);
                        out.push('\n');
                    }
                }
                Line::Job { job, source: None } => {
                    if let Some(marker) = &job.marker {
                        out.push_str(MARKER_PREFIX);
                        out.push(' ');
                        out.push_str(&serde_json::to_string(marker)?);
                        out.push('\n');
                    }
                    out.push_str(&job.schedule);
                    out.push(' ');
                    out.push_str(&job.command);
                    out.push('\n');
                }
            }
        }

        Ok(out)
    }

    /// All jobs in table order
    pub fn jobs(&self) -> Vec<StoredJob> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Job { job, .. } => Some(job.clone()),
                Line::Raw(_) => None,
            })
            .enumerate()
            .map(|(id, job)| StoredJob { id, job })
            .collect()
    }

    /// Appends a job
    pub fn push(&mut self, job: ScheduledJob) {
        self.lines.push(Line::Job { job, source: None });
    }

    /// Removes a job and its marker comment
    pub fn remove(&mut self, id: JobId) -> Result<ScheduledJob, SchedulerError> {
        let position = self
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| matches!(line, Line::Job { .. }))
            .nth(id)
            .map(|(position, _)| position)
            .ok_or(SchedulerError::UnknownJob(id))?;

        match self.lines.remove(position) {
            Line::Job { job, .. } => Ok(job),
            Line::Raw(_) => Err(SchedulerError::UnknownJob(id)),
        }
    }
}

fn parse_marker(line: &str) -> Option<JobMarker> {
    let json = line.trim_start().strip_prefix(MARKER_PREFIX)?;
    match serde_json::from_str(json.trim()) {
        Ok(marker) => Some(marker),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable job marker");
            None
        }
    }
}

fn parse_job(line: &str) -> Option<(String, String)> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || ENV_LINE.is_match(line) {
        return None;
    }

    let captures = JOB_LINE.captures(line)?;
    Some((captures[1].to_string(), captures[2].trim_end().to_string()))
}

/// The invoking user's crontab, accessed through the `crontab` executable
pub struct SystemCrontab {
    program: String,
}

impl Default for SystemCrontab {
    fn default() -> Self {
        Self::new("crontab")
    }
}

impl SystemCrontab {
    /// Creates a backend running the given crontab executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn read(&self) -> Result<CrontabDocument, SchedulerError> {
        debug!(program = %self.program, "reading crontab");

        let output = Command::new(&self.program)
            .arg("-l")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| SchedulerError::SpawnFailed {
                program: self.program.clone(),
                source: e,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            // A user without a crontab gets "no crontab for <user>"
            if stderr.contains("no crontab") {
                return Ok(CrontabDocument::default());
            }
            return Err(SchedulerError::CommandFailed {
                program: self.program.clone(),
                message: stderr.trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|_| SchedulerError::InvalidEncoding)?;
        Ok(CrontabDocument::parse(&text))
    }

    fn write(&self, document: &CrontabDocument) -> Result<(), SchedulerError> {
        let text = document.render()?;
        info!(program = %self.program, "writing crontab");

        let spawn_failed = |e| SchedulerError::SpawnFailed {
            program: self.program.clone(),
            source: e,
        };

        let mut child = Command::new(&self.program)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_failed)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).map_err(spawn_failed)?;
        }

        let output = child.wait_with_output().map_err(spawn_failed)?;
        if !output.status.success() {
            return Err(SchedulerError::CommandFailed {
                program: self.program.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

impl JobTable for SystemCrontab {
    fn list(&self) -> Result<Vec<StoredJob>, SchedulerError> {
        Ok(self.read()?.jobs())
    }

    fn add(&mut self, job: ScheduledJob) -> Result<(), SchedulerError> {
        let mut document = self.read()?;
        document.push(job);
        self.write(&document)
    }

    fn remove(&mut self, id: JobId) -> Result<(), SchedulerError> {
        let mut document = self.read()?;
        document.remove(id)?;
        self.write(&document)
    }
}

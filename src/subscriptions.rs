//! Subscription management
//!
//! A subscription is a crontab job re-running `drdl dl <url>` at a fixed
//! hourly rate. Its parameters are kept in a `Subscription` record stored as
//! the job's marker. Jobs written by older releases carry no marker; their
//! parameters are recovered from the command line.

use crate::catalogue::ProgramCard;
use crate::scheduler::{
    JobId, JobMarker, JobTable, ScheduledJob, SchedulerError, build_command, every_hours,
    remove_all,
};
use crate::selection::Scope;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

/// Name this program is installed under; used to recognise legacy jobs
pub const PROGRAM_NAME: &str = "drdl";

/// Default re-check interval in hours
pub const DEFAULT_RATE_HOURS: u32 = 2;

static LEGACY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(?:www\.)?dr\.dk/(?:tv/se|nyheder|radio/ondemand)/[^\s']*")
        .expect("valid regex")
});

static LEGACY_RATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*0\s+\*/(\d+)\s").expect("valid regex"));

/// Errors that can occur while managing subscriptions
#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Job table error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// The index does not refer to a listed subscription
    #[error("No subscription with index {0}")]
    UnknownSubscription(usize),
}

/// Parameters of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Catalogue URL of the subscribed program
    pub url: String,
    /// Output directory; the scheduled run's working directory when `None`
    pub output_dir: Option<PathBuf>,
    pub scope: Scope,
    /// Re-check interval in hours
    pub rate_hours: u32,
    /// File the scheduled runs append their output to
    pub log_path: PathBuf,
}

impl Subscription {
    /// Arguments of the `dl` invocation this subscription schedules
    pub fn dl_args(&self) -> Vec<String> {
        let mut args = vec!["dl".to_string(), self.url.clone()];

        if let Some(dir) = &self.output_dir {
            args.push("-o".to_string());
            args.push(dir.display().to_string());
        }

        if let Some(flag) = self.scope.flag() {
            args.push(flag.to_string());
        }

        args
    }

    /// Builds the job table entry for this subscription
    pub fn to_job(&self, program: &Path) -> Result<ScheduledJob, SchedulerError> {
        Ok(ScheduledJob {
            schedule: every_hours(self.rate_hours)?,
            command: build_command(
                &program.display().to_string(),
                &self.dl_args(),
                &self.log_path.display().to_string(),
            ),
            marker: Some(JobMarker::Subscription(self.clone())),
        })
    }

    /// Recovers a subscription from a job written without a marker
    ///
    /// Returns `None` when the command does not contain a catalogue URL.
    pub fn from_legacy(job: &ScheduledJob) -> Option<Self> {
        let url = LEGACY_URL.find(&job.command)?.as_str().to_string();
        let tokens: Vec<&str> = job.command.split_whitespace().collect();

        let value_after = |flag: &str| {
            tokens
                .iter()
                .position(|t| *t == flag)
                .and_then(|i| tokens.get(i + 1))
                .map(|t| PathBuf::from(t.trim_matches('\'')))
        };

        let scope = Scope::from_flags(tokens.contains(&"-t"), tokens.contains(&"-s"));
        let rate_hours = LEGACY_RATE
            .captures(&job.schedule)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(DEFAULT_RATE_HOURS);

        Some(Self {
            url,
            output_dir: value_after("-o"),
            scope,
            rate_hours,
            log_path: value_after(">>").unwrap_or_default(),
        })
    }

    /// Human-readable description based on the program card of the URL
    pub fn label(&self, card: &ProgramCard) -> String {
        let mut label = match self.scope {
            Scope::Series => format!("TV Series: {}. ", card.series_title),
            Scope::Season => format!(
                "Season {} of {}. ",
                card.season_number
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "?".to_string()),
                card.series_title
            ),
            Scope::Episode => format!("{} ", card.title),
        };

        label.push_str("Output directory: ");
        match &self.output_dir {
            Some(dir) => label.push_str(&dir.display().to_string()),
            None => label.push_str("default"),
        }

        label
    }
}

/// A subscription found in the job table
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionEntry {
    /// Index shown to the user and accepted for removal
    pub index: usize,
    pub job_id: JobId,
    pub subscription: Subscription,
}

fn is_legacy_job(job: &ScheduledJob) -> bool {
    job.marker.is_none()
        && job.command.contains(PROGRAM_NAME)
        && job.command.split_whitespace().any(|t| t == "dl")
}

/// Lists the subscriptions in a job table
///
/// Foreign jobs are ignored. Legacy jobs whose URL cannot be recovered are
/// skipped with a warning.
pub fn find_subscriptions<J: JobTable + ?Sized>(
    table: &J,
) -> Result<Vec<SubscriptionEntry>, SchedulerError> {
    let mut entries = Vec::new();

    for stored in table.list()? {
        let subscription = match &stored.job.marker {
            Some(JobMarker::Subscription(subscription)) => subscription.clone(),
            Some(_) => continue,
            None if is_legacy_job(&stored.job) => match Subscription::from_legacy(&stored.job) {
                Some(subscription) => subscription,
                None => {
                    warn!(command = %stored.job.command, "skipping job without a catalogue URL");
                    continue;
                }
            },
            None => continue,
        };

        entries.push(SubscriptionEntry {
            index: entries.len(),
            job_id: stored.id,
            subscription,
        });
    }

    Ok(entries)
}

/// Installs a subscription re-invoking `program`
pub fn subscribe<J: JobTable + ?Sized>(
    table: &mut J,
    subscription: &Subscription,
    program: &Path,
) -> Result<(), SubscriptionError> {
    let job = subscription.to_job(program)?;
    info!(url = %subscription.url, schedule = %job.schedule, "adding subscription");
    table.add(job)?;
    Ok(())
}

/// Removes subscriptions by their listed index
///
/// All indices are validated before anything is removed.
pub fn unsubscribe<J: JobTable + ?Sized>(
    table: &mut J,
    indices: &[usize],
) -> Result<Vec<Subscription>, SubscriptionError> {
    let entries = find_subscriptions(&*table)?;

    let mut selected = Vec::new();
    for &index in indices {
        let entry = entries
            .get(index)
            .ok_or(SubscriptionError::UnknownSubscription(index))?;
        if !selected.iter().any(|e: &&SubscriptionEntry| e.index == index) {
            selected.push(entry);
        }
    }

    let job_ids: Vec<JobId> = selected.iter().map(|e| e.job_id).collect();
    remove_all(table, &job_ids)?;

    for entry in &selected {
        info!(url = %entry.subscription.url, "removed subscription");
    }

    Ok(selected.into_iter().map(|e| e.subscription.clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::testing::card;
    use crate::scheduler::MemoryJobTable;

    fn subscription(scope: Scope, output_dir: Option<&str>) -> Subscription {
        Subscription {
            url: "https://www.dr.dk/tv/se/borgen/borgen-3".to_string(),
            output_dir: output_dir.map(PathBuf::from),
            scope,
            rate_hours: 4,
            log_path: PathBuf::from("/home/me/.local/share/drdl/drdl.log"),
        }
    }

    #[test]
    fn test_to_job() {
        let job = subscription(Scope::Season, Some("/media/tv"))
            .to_job(Path::new("/usr/local/bin/drdl"))
            .unwrap();

        assert_eq!(job.schedule, "0 */4 * * *");
        assert_eq!(
            job.command,
            "/usr/local/bin/drdl dl https://www.dr.dk/tv/se/borgen/borgen-3 -o /media/tv -s >> /home/me/.local/share/drdl/drdl.log 2>&1"
        );
        assert!(matches!(job.marker, Some(JobMarker::Subscription(_))));
    }

    #[test]
    fn test_invalid_rate() {
        let mut sub = subscription(Scope::Series, None);
        sub.rate_hours = 0;
        assert!(matches!(
            sub.to_job(Path::new("drdl")),
            Err(SchedulerError::InvalidRate(0))
        ));
    }

    #[test]
    fn test_from_legacy() {
        let job = ScheduledJob {
            schedule: "0 */3 * * *".to_string(),
            command: "/opt/drdl3.py dl https://www.dr.dk/tv/se/borgen/borgen-3 -o /media/tv -t >> /opt/log.txt".to_string(),
            marker: None,
        };

        let sub = Subscription::from_legacy(&job).unwrap();
        assert_eq!(sub.url, "https://www.dr.dk/tv/se/borgen/borgen-3");
        assert_eq!(sub.output_dir, Some(PathBuf::from("/media/tv")));
        assert_eq!(sub.scope, Scope::Series);
        assert_eq!(sub.rate_hours, 3);
        assert_eq!(sub.log_path, PathBuf::from("/opt/log.txt"));
    }

    #[test]
    fn test_from_legacy_without_url() {
        let job = ScheduledJob {
            schedule: "0 */3 * * *".to_string(),
            command: "/opt/drdl3.py dl https://example.com/video".to_string(),
            marker: None,
        };
        assert_eq!(Subscription::from_legacy(&job), None);
    }

    #[test]
    fn test_labels() {
        let card = card("borgen-3", 3, Some("https://www.dr.dk/tv/se/borgen-3"));

        assert_eq!(
            subscription(Scope::Series, None).label(&card),
            "TV Series: Some Show. Output directory: default"
        );
        assert_eq!(
            subscription(Scope::Season, Some("/media/tv")).label(&card),
            "Season 3 of Some Show. Output directory: /media/tv"
        );
        assert_eq!(
            subscription(Scope::Episode, None).label(&card),
            "Title of borgen-3 Output directory: default"
        );
    }

    #[test]
    fn test_subscribe_and_find_round_trip() {
        let mut table = MemoryJobTable::from_text("*/5 * * * * /usr/bin/backup\n");
        let sub = subscription(Scope::Season, Some("/media/My Shows"));

        subscribe(&mut table, &sub, Path::new("/usr/local/bin/drdl")).unwrap();

        let entries = find_subscriptions(&table).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].index, 0);
        assert_eq!(entries[0].job_id, 1);
        assert_eq!(entries[0].subscription, sub);
    }

    #[test]
    fn test_find_mixes_legacy_and_skips_foreign() {
        let text = "\
*/5 * * * * /usr/bin/backup dl nothing
0 */2 * * * /opt/drdl3.py dl https://www.dr.dk/tv/se/matador -s >> /opt/log.txt
0 */2 * * * /opt/drdl3.py dl not-a-url >> /opt/log.txt
# drdl: {\"kind\":\"upcoming\",\"series_urn\":\"u\",\"url\":\"https://www.dr.dk/tv/se/x\"}
1 2 3 4 * /usr/local/bin/drdl dl https://www.dr.dk/tv/se/x -t
";
        let mut table = MemoryJobTable::from_text(text);
        subscribe(
            &mut table,
            &subscription(Scope::Series, None),
            Path::new("/usr/local/bin/drdl"),
        )
        .unwrap();

        let entries = find_subscriptions(&table).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].subscription.url, "https://www.dr.dk/tv/se/matador");
        assert_eq!(entries[0].subscription.scope, Scope::Season);
        assert_eq!(entries[0].job_id, 1);
        assert_eq!(entries[1].subscription.scope, Scope::Series);
        assert_eq!(entries[1].job_id, 4);
    }

    #[test]
    fn test_unsubscribe() {
        let mut table = MemoryJobTable::from_text("*/5 * * * * /usr/bin/backup\n");
        let program = Path::new("/usr/local/bin/drdl");
        subscribe(&mut table, &subscription(Scope::Series, None), program).unwrap();
        subscribe(&mut table, &subscription(Scope::Season, None), program).unwrap();
        subscribe(&mut table, &subscription(Scope::Episode, None), program).unwrap();

        let removed = unsubscribe(&mut table, &[2, 0, 2]).unwrap();
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].scope, Scope::Episode);
        assert_eq!(removed[1].scope, Scope::Series);

        let remaining = find_subscriptions(&table).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].subscription.scope, Scope::Season);
        assert!(table.text().starts_with("*/5 * * * * /usr/bin/backup\n"));
    }

    #[test]
    fn test_unsubscribe_unknown_index_removes_nothing() {
        let mut table = MemoryJobTable::default();
        subscribe(
            &mut table,
            &subscription(Scope::Series, None),
            Path::new("drdl"),
        )
        .unwrap();

        assert!(matches!(
            unsubscribe(&mut table, &[0, 5]),
            Err(SubscriptionError::UnknownSubscription(5))
        ));
        assert_eq!(find_subscriptions(&table).unwrap().len(), 1);
    }
}

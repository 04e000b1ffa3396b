//! Upcoming episode detection
//!
//! Announced episodes are members of the series bundle that have a release
//! time but no stream yet. Episodes published later than announced stay
//! pending for a grace period after their release time.

use crate::catalogue::{Catalogue, CatalogueError, ProgramCard};
use crate::scheduler::{
    JobMarker, JobTable, ScheduledJob, SchedulerError, build_command, once_at, remove_all,
};
use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use std::path::Path;
use tracing::{debug, info};

/// How long after its announced release a missing stream is still awaited
const OVERDUE_GRACE_HOURS: i64 = 48;

/// An announced, not yet streamable episode
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingEpisode {
    pub slug: String,
    pub title: String,
    /// Announced release time
    pub release: DateTime<FixedOffset>,
}

impl UpcomingEpisode {
    /// Whether the announced release time has already passed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.release.with_timezone(&Utc) <= now
    }
}

/// Finds the announced episodes of the card's series
///
/// Only plain bundle members are considered; nested bundles such as seasons
/// are skipped. Members released within the last 48 hours that still have no
/// stream are reported as well. Bundle order is preserved.
pub fn find_upcoming<C: Catalogue + ?Sized>(
    catalogue: &C,
    card: &ProgramCard,
    now: DateTime<Utc>,
) -> Result<Vec<UpcomingEpisode>, CatalogueError> {
    let members = catalogue.bundle_members(card.require_series_urn()?)?;
    let pending_since = now - Duration::hours(OVERDUE_GRACE_HOURS);

    let mut upcoming = Vec::new();
    for member in members.iter().filter(|m| m.is_plain_member()) {
        let member_card = catalogue.program_card(&member.slug)?;

        if member_card.presentation_uri.is_some() {
            continue;
        }

        match member_card.sort_date_time {
            Some(release) if release.with_timezone(&Utc) > pending_since => {
                upcoming.push(UpcomingEpisode {
                    slug: member_card.slug,
                    title: member_card.title,
                    release,
                });
            }
            _ => debug!(slug = %member.slug, "member has no pending release"),
        }
    }

    Ok(upcoming)
}

/// Earliest release among `upcoming`
pub fn earliest(upcoming: &[UpcomingEpisode]) -> Option<&UpcomingEpisode> {
    upcoming.iter().min_by_key(|episode| episode.release)
}

/// Parameters of the one-shot re-check job
pub struct RecheckJob<'a> {
    /// Catalogue URL the check was run for
    pub url: &'a str,
    pub series_urn: &'a str,
    /// Executable re-invoked by the job
    pub program: &'a Path,
    pub log_path: &'a Path,
    /// Wait after the announced release before downloading
    pub delay: Duration,
}

impl RecheckJob<'_> {
    /// Builds the job for a release time
    ///
    /// The job fires `delay` after the release, or after `now` for releases
    /// that are already overdue. It downloads the whole series (the archive
    /// skips what is already there) and then schedules the next re-check.
    pub fn to_job(&self, release: DateTime<FixedOffset>, now: DateTime<Utc>) -> ScheduledJob {
        let due = release.with_timezone(&Utc).max(now);
        let at = (due + self.delay).with_timezone(&Local);
        let program = self.program.display().to_string();
        let log = self.log_path.display().to_string();

        let download = build_command(
            &program,
            &["dl".to_string(), self.url.to_string(), "-t".to_string()],
            &log,
        );
        let reschedule = build_command(
            &program,
            &[
                "upcoming".to_string(),
                self.url.to_string(),
                "--schedule".to_string(),
            ],
            &log,
        );

        ScheduledJob {
            schedule: once_at(at),
            command: format!("{download}; {reschedule}"),
            marker: Some(JobMarker::Upcoming {
                series_urn: self.series_urn.to_string(),
                url: self.url.to_string(),
            }),
        }
    }
}

/// Replaces the series' re-check job with one at the earliest release
///
/// Any previous re-check job for the same series is removed first. Returns
/// the installed job, or `None` when nothing is announced.
pub fn schedule_recheck<J: JobTable + ?Sized>(
    table: &mut J,
    recheck: &RecheckJob<'_>,
    upcoming: &[UpcomingEpisode],
    now: DateTime<Utc>,
) -> Result<Option<ScheduledJob>, SchedulerError> {
    let previous: Vec<_> = table
        .list()?
        .into_iter()
        .filter(|stored| {
            matches!(
                &stored.job.marker,
                Some(JobMarker::Upcoming { series_urn, .. }) if series_urn == recheck.series_urn
            )
        })
        .map(|stored| stored.id)
        .collect();

    if !previous.is_empty() {
        info!(series_urn = recheck.series_urn, count = previous.len(), "removing previous re-check");
        remove_all(table, &previous)?;
    }

    let Some(next) = earliest(upcoming) else {
        return Ok(None);
    };

    let job = recheck.to_job(next.release, now);
    info!(schedule = %job.schedule, slug = %next.slug, "scheduling re-check");
    table.add(job.clone())?;

    Ok(Some(job))
}

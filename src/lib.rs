//! drdl - Download episodes from the DR TV catalogue
//!
//! This library resolves catalogue URLs to episodes, hands their streams to
//! an external downloader, renames the results into a Plex library layout
//! and keeps crontab subscriptions that fetch new episodes as they appear.

mod catalogue;
mod config;
mod downloader;
mod file_operations;
mod scheduler;
mod selection;
mod subscriptions;
mod temp;
mod upcoming;

use catalogue::resolve_url;
use file_operations::{PlexName, execute_moves, plan_moves};
use temp::create_staging_dir;
use upcoming::{RecheckJob, find_upcoming, schedule_recheck};

// Re-export error types
pub use catalogue::CatalogueError;
pub use config::ConfigError;
pub use downloader::DownloadError;
pub use file_operations::FileOperationError;
pub use scheduler::SchedulerError;
pub use subscriptions::SubscriptionError;

// Re-export the collaborator traits and their implementations
pub use catalogue::{
    BundleMember, Catalogue, DrCatalogue, EpisodeDetails, EpisodeRef, ProgramCard, Season,
    slug_from_url,
};
pub use config::{ApiEndpoints, CONFIG_ENV_VAR, Settings, default_config_path, expand_home};
pub use downloader::{DownloadRequest, MediaDownloader, OutputLayout, YtDlpDownloader};
pub use scheduler::{
    CrontabDocument, JobId, JobMarker, JobTable, MemoryJobTable, ScheduledJob, StoredJob,
    SystemCrontab,
};
pub use selection::{Scope, select_episodes};
pub use subscriptions::{PROGRAM_NAME, Subscription};
pub use upcoming::UpcomingEpisode;

// Re-export naming helpers
pub use file_operations::{PlannedMove, trim_title};

use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Progress event emitted while downloading
///
/// These events allow library users to report progress or remain silent.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The URL was resolved to a program card
    Resolved { title: String, series_title: String },

    /// Episodes in scope were selected
    EpisodesSelected { count: usize, scope: Scope },

    /// Nothing in scope is streamable yet
    NothingToDownload,

    /// The external downloader is running
    Downloading { count: usize, directory: PathBuf },

    /// A downloaded file is moved into the library
    Moving {
        source: PathBuf,
        destination: PathBuf,
        size: u64,
    },

    /// A subscription was installed
    Subscribed { url: String, rate_hours: u32 },
}

/// Top-level error type for drdl operations
#[derive(Debug, Error)]
pub enum DrDlError {
    /// Error talking to the catalogue
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] CatalogueError),

    /// Error moving downloaded files
    #[error("File operation error: {0}")]
    FileOperation(#[from] FileOperationError),

    /// Error running the downloader
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Error accessing the job table
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Error managing subscriptions
    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),

    /// Error loading settings
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Options of a `dl` run
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOptions {
    pub url: String,
    pub output_dir: Option<PathBuf>,
    pub scope: Scope,
    /// Rename into `Title/SeasonNN/Title.SNNENN` after downloading
    pub plexify: bool,
    /// Install a subscription for the same URL and scope afterwards
    pub subscribe: bool,
}

/// Options of a new subscription
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeOptions {
    pub url: String,
    pub output_dir: Option<PathBuf>,
    pub scope: Scope,
    /// Falls back to the configured rate
    pub rate_hours: Option<u32>,
}

/// An episode as shown by `list`
#[derive(Debug, Clone, PartialEq)]
pub struct AvailableEpisode {
    pub title: String,
    /// Plex file name including the `.mp4` extension
    pub plex_filename: String,
    pub duration_minutes: Option<f64>,
    pub released: bool,
}

/// Result of an upcoming-episode check
#[derive(Debug, Clone, PartialEq)]
pub struct UpcomingReport {
    pub episodes: Vec<UpcomingEpisode>,
    /// Re-check job installed by `--schedule`
    pub scheduled: Option<ScheduledJob>,
}

/// A subscription as shown by `lsubs`
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionListing {
    pub index: usize,
    pub subscription: Subscription,
    /// Description from the program card; `None` if it could not be fetched
    pub label: Option<String>,
}

/// Entry point bundling the catalogue, downloader and job table
pub struct Session {
    catalogue: Box<dyn Catalogue>,
    downloader: Box<dyn MediaDownloader>,
    jobs: Box<dyn JobTable>,
    settings: Settings,
    /// Executable scheduled jobs re-invoke
    program: PathBuf,
}

impl Session {
    /// Creates a session using the DR API, yt-dlp and the user's crontab
    pub fn new(settings: Settings) -> Result<Self, DrDlError> {
        Ok(Self {
            catalogue: Box::new(DrCatalogue::new(settings.api.clone())),
            downloader: Box::new(YtDlpDownloader::new(settings.downloader.clone())),
            jobs: Box::new(SystemCrontab::default()),
            program: std::env::current_exe()?,
            settings,
        })
    }

    /// Creates a session from explicit collaborators
    pub fn with_parts(
        catalogue: Box<dyn Catalogue>,
        downloader: Box<dyn MediaDownloader>,
        jobs: Box<dyn JobTable>,
        settings: Settings,
        program: PathBuf,
    ) -> Self {
        Self {
            catalogue,
            downloader,
            jobs,
            settings,
            program,
        }
    }

    /// Output directory of a run: explicit, configured, or the current one
    ///
    /// Always absolute, so scheduled runs write to the same place.
    fn output_dir(&self, explicit: Option<&Path>) -> Result<PathBuf, DrDlError> {
        match explicit.or(self.settings.output_dir.as_deref()) {
            Some(dir) => Ok(std::path::absolute(expand_home(dir))?),
            None => Ok(std::env::current_dir()?),
        }
    }

    /// Downloads the episode, season or series a URL points at
    ///
    /// Progress events are emitted through the provided callback.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use drdl::{DownloadOptions, Scope, Session, Settings};
    ///
    /// let mut session = Session::new(Settings::default()).unwrap();
    /// session.download(
    ///     &DownloadOptions {
    ///         url: "https://www.dr.dk/tv/se/borgen/borgen-3".to_string(),
    ///         output_dir: None,
    ///         scope: Scope::Season,
    ///         plexify: true,
    ///         subscribe: false,
    ///     },
    ///     |event| println!("{event:?}"),
    /// ).unwrap();
    /// ```
    pub fn download<F>(
        &mut self,
        options: &DownloadOptions,
        mut progress_callback: F,
    ) -> Result<(), DrDlError>
    where
        F: FnMut(ProgressEvent),
    {
        let card = resolve_url(self.catalogue.as_ref(), &options.url)?;
        progress_callback(ProgressEvent::Resolved {
            title: card.title.clone(),
            series_title: card.series_title.clone(),
        });

        let episodes = selection::expand(self.catalogue.as_ref(), &card, options.scope)?;
        progress_callback(ProgressEvent::EpisodesSelected {
            count: episodes.len(),
            scope: options.scope,
        });

        let output_dir = self.output_dir(options.output_dir.as_deref())?;
        let uris: Vec<String> = episodes
            .iter()
            .filter_map(|episode| episode.presentation_uri.clone())
            .collect();

        if uris.is_empty() {
            progress_callback(ProgressEvent::NothingToDownload);
        } else if options.plexify {
            // Single episodes go straight into the output directory
            let show_folders = options.scope != Scope::Episode;

            let mut targets = Vec::new();
            for episode in &episodes {
                let details = self.catalogue.episode_details(&episode.urn)?;
                let name = PlexName::from_details(&details, episode);
                targets.push((
                    episode.slug.clone(),
                    name.library_path(&output_dir, show_folders),
                ));
            }

            let staging = create_staging_dir(&output_dir)?;
            progress_callback(ProgressEvent::Downloading {
                count: uris.len(),
                directory: output_dir.clone(),
            });
            let downloaded = self.downloader.download(&DownloadRequest {
                uris,
                layout: OutputLayout::ById {
                    directory: staging.to_path_buf(),
                },
                archive: self.settings.archive_file.clone(),
            });

            // A failed batch may still have finished (and archived) some
            // episodes, so whatever arrived is moved before reporting
            let moves = plan_moves(&staging, &targets, &output_dir)?;
            for planned in &moves {
                progress_callback(ProgressEvent::Moving {
                    source: planned.source.clone(),
                    destination: planned.destination.clone(),
                    size: planned.size,
                });
            }
            execute_moves(&moves)?;
            downloaded?;
        } else {
            progress_callback(ProgressEvent::Downloading {
                count: uris.len(),
                directory: output_dir.clone(),
            });
            self.downloader.download(&DownloadRequest {
                uris,
                layout: OutputLayout::Default {
                    directory: output_dir,
                },
                archive: self.settings.archive_file.clone(),
            })?;
        }

        if options.subscribe {
            let subscription = self.add_subscription(&SubscribeOptions {
                url: options.url.clone(),
                output_dir: options.output_dir.clone(),
                scope: options.scope,
                rate_hours: None,
            })?;
            progress_callback(ProgressEvent::Subscribed {
                url: subscription.url,
                rate_hours: subscription.rate_hours,
            });
        }

        Ok(())
    }

    /// Lists every episode of the URL's series with its Plex file name
    pub fn list_available(&self, url: &str) -> Result<Vec<AvailableEpisode>, DrDlError> {
        let card = resolve_url(self.catalogue.as_ref(), url)?;
        let seasons = self.catalogue.seasons(card.require_series_urn()?)?;

        let mut available = Vec::new();
        for episode in seasons.iter().flat_map(|season| season.episodes.iter()) {
            let details = self.catalogue.episode_details(&episode.urn)?;
            let name = PlexName::from_details(&details, episode);

            available.push(AvailableEpisode {
                title: episode.title.clone(),
                plex_filename: format!("{}.mp4", name.file_stem()),
                duration_minutes: episode.duration_ms.map(|ms| ms / 60_000.0),
                released: episode.presentation_uri.is_some(),
            });
        }

        Ok(available)
    }

    /// Finds announced episodes of the URL's series
    ///
    /// With `schedule`, the series' one-shot re-check job is replaced by one
    /// firing shortly after the earliest announced release.
    pub fn check_upcoming(&mut self, url: &str, schedule: bool) -> Result<UpcomingReport, DrDlError> {
        let card = resolve_url(self.catalogue.as_ref(), url)?;
        let now = Utc::now();
        let episodes = find_upcoming(self.catalogue.as_ref(), &card, now)?;

        let scheduled = if schedule {
            let delay = self.settings.upcoming_delay()?;
            let log_path = self.prepare_log_file()?;
            let recheck = RecheckJob {
                url,
                series_urn: card.require_series_urn()?,
                program: &self.program,
                log_path: &log_path,
                delay,
            };
            schedule_recheck(self.jobs.as_mut(), &recheck, &episodes, now)?
        } else {
            None
        };

        Ok(UpcomingReport {
            episodes,
            scheduled,
        })
    }

    /// Resolves the log file and makes sure its directory exists
    fn prepare_log_file(&self) -> Result<PathBuf, DrDlError> {
        let log_path = self.settings.resolved_log_file()?;
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(log_path)
    }

    /// Installs a subscription re-downloading the URL periodically
    pub fn add_subscription(
        &mut self,
        options: &SubscribeOptions,
    ) -> Result<Subscription, DrDlError> {
        // Fail on URLs that do not name a program before touching the crontab
        slug_from_url(&options.url)?;

        let subscription = Subscription {
            url: options.url.clone(),
            output_dir: Some(self.output_dir(options.output_dir.as_deref())?),
            scope: options.scope,
            rate_hours: options.rate_hours.unwrap_or(self.settings.rate_hours),
            log_path: self.prepare_log_file()?,
        };

        subscriptions::subscribe(self.jobs.as_mut(), &subscription, &self.program)?;
        Ok(subscription)
    }

    /// Lists subscriptions with a label fetched from the catalogue
    ///
    /// Subscriptions whose program can no longer be resolved are listed
    /// without a label.
    pub fn list_subscriptions(&self) -> Result<Vec<SubscriptionListing>, DrDlError> {
        let entries = subscriptions::find_subscriptions(self.jobs.as_ref())?;

        Ok(entries
            .into_iter()
            .map(|entry| {
                let label = match resolve_url(self.catalogue.as_ref(), &entry.subscription.url) {
                    Ok(card) => Some(entry.subscription.label(&card)),
                    Err(e) => {
                        warn!(url = %entry.subscription.url, error = %e, "could not resolve subscription");
                        None
                    }
                };

                SubscriptionListing {
                    index: entry.index,
                    subscription: entry.subscription,
                    label,
                }
            })
            .collect())
    }

    /// Removes subscriptions by the index shown in `list_subscriptions`
    pub fn remove_subscriptions(
        &mut self,
        indices: &[usize],
    ) -> Result<Vec<Subscription>, DrDlError> {
        Ok(subscriptions::unsubscribe(self.jobs.as_mut(), indices)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalogue::testing::{FakeCatalogue, card, episode};
    use chrono::Duration;
    use downloader::testing::FakeDownloader;
    use std::fs;
    use std::rc::Rc;

    const SERIES: &str = "urn:dr:mu:bundle:series";

    /// Shares a fake between the session and the test body
    struct Shared<T>(Rc<T>);

    impl<T: Catalogue> Catalogue for Shared<T> {
        fn program_card(&self, slug: &str) -> Result<ProgramCard, CatalogueError> {
            self.0.program_card(slug)
        }
        fn seasons(&self, series_urn: &str) -> Result<Vec<Season>, CatalogueError> {
            self.0.seasons(series_urn)
        }
        fn episode_details(&self, urn: &str) -> Result<EpisodeDetails, CatalogueError> {
            self.0.episode_details(urn)
        }
        fn bundle_members(&self, series_urn: &str) -> Result<Vec<BundleMember>, CatalogueError> {
            self.0.bundle_members(series_urn)
        }
    }

    impl<T: MediaDownloader> MediaDownloader for Shared<T> {
        fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
            self.0.download(request)
        }
    }

    fn uri(slug: &str) -> String {
        format!("https://www.dr.dk/tv/se/{slug}")
    }

    fn catalogue() -> FakeCatalogue {
        let mut catalogue = FakeCatalogue::default();

        for (slug, season, released) in [
            ("show-1-1", 1, true),
            ("show-1-2", 1, true),
            ("show-2-1", 2, true),
            ("show-2-2", 2, false),
        ] {
            let link = released.then(|| uri(slug));
            catalogue
                .cards
                .insert(slug.to_string(), card(slug, season, link.as_deref()));
            catalogue.details.insert(
                format!("urn:dr:mu:programcard:{slug}"),
                EpisodeDetails {
                    original_title: Some("Some - Show's Name".to_string()),
                    season_number: season,
                    episode_number: slug[slug.len() - 1..].parse().unwrap(),
                },
            );
        }

        catalogue.seasons.insert(
            SERIES.to_string(),
            vec![
                Season {
                    season_number: 1,
                    episodes: vec![
                        episode("show-1-1", Some(uri("show-1-1").as_str())),
                        episode("show-1-2", Some(uri("show-1-2").as_str())),
                    ],
                },
                Season {
                    season_number: 2,
                    episodes: vec![
                        episode("show-2-1", Some(uri("show-2-1").as_str())),
                        episode("show-2-2", None),
                    ],
                },
            ],
        );

        catalogue
    }

    struct Fixture {
        session: Session,
        catalogue: Rc<FakeCatalogue>,
        downloader: Rc<FakeDownloader>,
        _root: tempfile::TempDir,
        output: PathBuf,
    }

    fn fixture(jobs: MemoryJobTable) -> Fixture {
        fixture_with(jobs, FakeDownloader::new(&["mp4", "da.vtt"]))
    }

    fn fixture_with(jobs: MemoryJobTable, downloader: FakeDownloader) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let output = root.path().join("library");
        let catalogue = Rc::new(catalogue());
        let downloader = Rc::new(downloader);

        let settings = Settings {
            log_file: Some(root.path().join("logs/drdl.log")),
            archive_file: root.path().join("archive.txt"),
            ..Settings::default()
        };

        let session = Session::with_parts(
            Box::new(Shared(catalogue.clone())),
            Box::new(Shared(downloader.clone())),
            Box::new(jobs),
            settings,
            PathBuf::from("/usr/local/bin/drdl"),
        );

        Fixture {
            session,
            catalogue,
            downloader,
            _root: root,
            output,
        }
    }

    fn options(slug: &str, scope: Scope, output: &Path) -> DownloadOptions {
        DownloadOptions {
            url: uri(slug),
            output_dir: Some(output.to_path_buf()),
            scope,
            plexify: true,
            subscribe: false,
        }
    }

    #[test]
    fn test_download_season_plexified() {
        let mut fx = fixture(MemoryJobTable::default());
        let mut events = Vec::new();

        fx.session
            .download(&options("show-2-1", Scope::Season, &fx.output), |e| events.push(e))
            .unwrap();

        let season_dir = fx.output.join("Some.Shows.Name/Season02");
        assert!(season_dir.join("Some.Shows.Name.S02E01.mp4").is_file());
        assert!(season_dir.join("Some.Shows.Name.S02E01.da.vtt").is_file());
        assert!(!season_dir.join("Some.Shows.Name.S02E02.mp4").exists());

        // Staging directory is gone again
        let leftovers: Vec<_> = fs::read_dir(&fx.output)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("Some.Shows.Name")]);

        let requests = fx.downloader.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].uris, vec![uri("show-2-1")]);
        assert!(events.iter().any(|e| matches!(e, ProgressEvent::Moving { .. })));
    }

    #[test]
    fn test_download_single_episode_is_flat() {
        let mut fx = fixture(MemoryJobTable::default());

        fx.session
            .download(&options("show-1-2", Scope::Episode, &fx.output), |_| {})
            .unwrap();

        assert!(fx.output.join("Some.Shows.Name.S01E02.mp4").is_file());
        assert!(!fx
            .catalogue
            .requests
            .borrow()
            .iter()
            .any(|r| r.starts_with("seasons:")));
    }

    #[test]
    fn test_download_without_plexify_keeps_downloader_names() {
        let mut fx = fixture(MemoryJobTable::default());
        let mut opts = options("show-1-1", Scope::Series, &fx.output);
        opts.plexify = false;

        fx.session.download(&opts, |_| {}).unwrap();

        let requests = fx.downloader.requests.borrow();
        assert_eq!(
            requests[0].layout,
            OutputLayout::Default {
                directory: fx.output.clone()
            }
        );
        assert_eq!(requests[0].uris.len(), 3);
        assert!(!fx
            .catalogue
            .requests
            .borrow()
            .iter()
            .any(|r| r.starts_with("details:")));
    }

    #[test]
    fn test_failed_batch_keeps_finished_episodes() {
        let mut fx = fixture_with(
            MemoryJobTable::default(),
            FakeDownloader::failing(&["mp4"], 1),
        );
        let mut events = Vec::new();

        let result = fx
            .session
            .download(&options("show-1-1", Scope::Season, &fx.output), |e| events.push(e));

        assert!(matches!(
            result,
            Err(DrDlError::Download(DownloadError::Failed { code: Some(1), .. }))
        ));

        let season_dir = fx.output.join("Some.Shows.Name/Season01");
        assert!(season_dir.join("Some.Shows.Name.S01E01.mp4").is_file());
        assert!(season_dir.join("Some.Shows.Name.S01E02.mp4").is_file());
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, ProgressEvent::Moving { .. }))
                .count(),
            2
        );

        // The emptied staging directory is gone
        let leftovers: Vec<_> = fs::read_dir(&fx.output)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("Some.Shows.Name")]);
    }

    #[test]
    fn test_download_nothing_available() {
        let mut fx = fixture(MemoryJobTable::default());
        let mut events = Vec::new();

        fx.session
            .download(&options("show-2-2", Scope::Episode, &fx.output), |e| events.push(e))
            .unwrap();

        assert!(events.iter().any(|e| matches!(e, ProgressEvent::NothingToDownload)));
        assert!(fx.downloader.requests.borrow().is_empty());
    }

    #[test]
    fn test_download_and_subscribe() {
        let mut fx = fixture(MemoryJobTable::default());
        let mut opts = options("show-1-1", Scope::Season, &fx.output);
        opts.subscribe = true;
        let mut events = Vec::new();

        fx.session.download(&opts, |e| events.push(e)).unwrap();

        assert!(events.iter().any(|e| matches!(e, ProgressEvent::Subscribed { rate_hours: 2, .. })));
        let listed = fx.session.list_subscriptions().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subscription.scope, Scope::Season);
        assert_eq!(listed[0].subscription.output_dir, Some(fx.output.clone()));
    }

    #[test]
    fn test_subscribe_without_output_dir_pins_current_dir() {
        let mut fx = fixture(MemoryJobTable::default());
        let mut events = Vec::new();

        // Nothing is released, so nothing is written to the current directory
        fx.session
            .download(
                &DownloadOptions {
                    url: uri("show-2-2"),
                    output_dir: None,
                    scope: Scope::Episode,
                    plexify: true,
                    subscribe: true,
                },
                |e| events.push(e),
            )
            .unwrap();

        assert!(events.iter().any(|e| matches!(e, ProgressEvent::NothingToDownload)));
        let listed = fx.session.list_subscriptions().unwrap();
        assert_eq!(
            listed[0].subscription.output_dir,
            Some(std::env::current_dir().unwrap())
        );
    }

    #[test]
    fn test_relative_output_dir_is_stored_absolute() {
        let mut fx = fixture(MemoryJobTable::default());

        let subscription = fx
            .session
            .add_subscription(&SubscribeOptions {
                url: uri("show-1-1"),
                output_dir: Some(PathBuf::from("media/tv")),
                scope: Scope::Series,
                rate_hours: None,
            })
            .unwrap();

        assert_eq!(
            subscription.output_dir,
            Some(std::env::current_dir().unwrap().join("media/tv"))
        );
    }

    #[test]
    fn test_add_then_list_round_trips_label() {
        let mut fx = fixture(MemoryJobTable::default());

        fx.session
            .add_subscription(&SubscribeOptions {
                url: uri("show-2-1"),
                output_dir: None,
                scope: Scope::Series,
                rate_hours: Some(6),
            })
            .unwrap();
        fx.session
            .add_subscription(&SubscribeOptions {
                url: uri("show-1-1"),
                output_dir: Some(PathBuf::from("/media/tv")),
                scope: Scope::Season,
                rate_hours: None,
            })
            .unwrap();

        let listed = fx.session.list_subscriptions().unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].subscription.url, uri("show-2-1"));
        assert_eq!(listed[0].subscription.rate_hours, 6);
        assert_eq!(
            listed[0].label,
            Some(format!(
                "TV Series: Some Show. Output directory: {}",
                cwd.display()
            ))
        );
        assert_eq!(listed[1].subscription.url, uri("show-1-1"));
        assert_eq!(
            listed[1].label.as_deref(),
            Some("Season 1 of Some Show. Output directory: /media/tv")
        );
    }

    #[test]
    fn test_list_tolerates_unresolvable_entries() {
        let legacy = "0 */2 * * * /opt/drdl3.py dl https://www.dr.dk/tv/se/gone-for-good >> /opt/log.txt\n";
        let fx = fixture(MemoryJobTable::from_text(legacy));

        let listed = fx.session.list_subscriptions().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, None);
    }

    #[test]
    fn test_remove_subscriptions() {
        let mut fx = fixture(MemoryJobTable::default());
        for slug in ["show-1-1", "show-2-1"] {
            fx.session
                .add_subscription(&SubscribeOptions {
                    url: uri(slug),
                    output_dir: None,
                    scope: Scope::Episode,
                    rate_hours: None,
                })
                .unwrap();
        }

        let removed = fx.session.remove_subscriptions(&[0]).unwrap();
        assert_eq!(removed[0].url, uri("show-1-1"));

        let listed = fx.session.list_subscriptions().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].subscription.url, uri("show-2-1"));
    }

    #[test]
    fn test_add_subscription_rejects_bad_rate() {
        let mut fx = fixture(MemoryJobTable::default());
        let result = fx.session.add_subscription(&SubscribeOptions {
            url: uri("show-1-1"),
            output_dir: None,
            scope: Scope::Series,
            rate_hours: Some(0),
        });
        assert!(matches!(
            result,
            Err(DrDlError::Subscription(SubscriptionError::Scheduler(
                SchedulerError::InvalidRate(0)
            )))
        ));
    }

    #[test]
    fn test_list_available() {
        let fx = fixture(MemoryJobTable::default());

        let available = fx.session.list_available(&uri("show-1-1")).unwrap();
        assert_eq!(available.len(), 4);
        assert_eq!(available[0].plex_filename, "Some.Shows.Name.S01E01.mp4");
        assert_eq!(available[0].duration_minutes, Some(29.0));
        assert!(!available[3].released);
    }

    #[test]
    fn test_check_upcoming_with_schedule() {
        let release = (Utc::now() + Duration::hours(1)).fixed_offset();

        let mut catalogue = catalogue();
        let mut announced = card("show-2-3", 2, None);
        announced.sort_date_time = Some(release);
        catalogue.cards.insert("show-2-3".to_string(), announced);
        catalogue.bundles.insert(
            SERIES.to_string(),
            vec![
                BundleMember {
                    slug: "show-2-1".to_string(),
                    kind: "Member".to_string(),
                    bundle_type: None,
                },
                BundleMember {
                    slug: "show-2-3".to_string(),
                    kind: "Member".to_string(),
                    bundle_type: None,
                },
            ],
        );

        let root = tempfile::tempdir().unwrap();
        let mut session = Session::with_parts(
            Box::new(catalogue),
            Box::new(FakeDownloader::new(&["mp4"])),
            Box::new(MemoryJobTable::default()),
            Settings {
                log_file: Some(root.path().join("drdl.log")),
                ..Settings::default()
            },
            PathBuf::from("/usr/local/bin/drdl"),
        );

        let report = session.check_upcoming(&uri("show-2-1"), true).unwrap();
        assert_eq!(report.episodes.len(), 1);
        assert_eq!(report.episodes[0].slug, "show-2-3");
        assert_eq!(report.episodes[0].release, release);

        let job = report.scheduled.unwrap();
        assert!(matches!(job.marker, Some(JobMarker::Upcoming { .. })));

        let without = session.check_upcoming(&uri("show-2-1"), false).unwrap();
        assert_eq!(without.scheduled, None);
    }
}

use clap::{ArgAction, Parser, Subcommand};
use dialoguer::Confirm;
use drdl::{
    DownloadOptions, DrDlError, ProgressEvent, Scope, Session, Settings, SubscribeOptions,
};
use std::io;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

/// Prefix of every line printed for the user
const TAG: &str = "[drdl]";

#[derive(Parser)]
#[command(name = "drdl", version)]
#[command(about = "Download episodes from DR TV, plexify them and subscribe to new releases")]
struct Cli {
    /// Settings file (defaults to $DRDL_CONFIG or the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (repeat for debug output)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download episodes
    Dl {
        /// URL of a program on dr.dk/tv
        url: String,

        /// Output directory
        #[arg(short = 'o', long = "outputdir")]
        output_dir: Option<PathBuf>,

        /// Download everything available in the series
        #[arg(short = 't', long = "tvseries")]
        tvseries: bool,

        /// Download everything available in the season
        #[arg(short, long)]
        season: bool,

        /// Disable plexify and keep the downloader's file names
        #[arg(short = 'p', long = "no-plexify")]
        no_plexify: bool,

        /// Subscribe to the episode, season or series afterwards
        #[arg(long)]
        subscribe: bool,
    },

    /// List subscriptions
    Lsubs,

    /// Add a new subscription
    Add {
        /// URL of a program on dr.dk/tv
        url: String,

        /// Output directory
        #[arg(short = 'o', long = "outputdir")]
        output_dir: Option<PathBuf>,

        /// Subscribe to the series
        #[arg(short = 't', long = "tvseries")]
        tvseries: bool,

        /// Subscribe to the season
        #[arg(short, long)]
        season: bool,

        /// Check for new episodes every RATE hours
        #[arg(short, long)]
        rate: Option<u32>,
    },

    /// Remove subscriptions
    Rsubs {
        /// Index of a subscription as shown by lsubs
        #[arg(required = true)]
        subscriptions: Vec<usize>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List upcoming episodes
    Upcoming {
        /// URL of a program on dr.dk/tv
        url: String,

        /// Schedule a download right after the next release
        #[arg(long)]
        schedule: bool,
    },

    /// List available episodes in a series
    List {
        /// URL of a program in a series on dr.dk/tv
        url: String,
    },
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Resolved {
            title,
            series_title,
        } => {
            if series_title.is_empty() {
                println!("{TAG} Found {title}");
            } else {
                println!("{TAG} Found {title} ({series_title})");
            }
        }
        ProgressEvent::EpisodesSelected { count, scope } => {
            println!("{TAG} {count} episode(s) available in {scope}");
        }
        ProgressEvent::NothingToDownload => {
            println!("{TAG} no episodes available");
        }
        ProgressEvent::Downloading { count, directory } => {
            println!(
                "{TAG} Downloading {count} episode(s) to {}",
                directory.display()
            );
        }
        ProgressEvent::Moving {
            source,
            destination,
            size,
        } => {
            println!(
                "{TAG} Moving {} ({}) to {}",
                source.display(),
                humansize::format_size(size, humansize::DECIMAL),
                destination.display()
            );
        }
        ProgressEvent::Subscribed { url, rate_hours } => {
            println!("{TAG} Subscribed to {url}, checking every {rate_hours} hour(s)");
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), DrDlError> {
    let settings = Settings::load(cli.config.as_deref())?;
    let mut session = Session::new(settings)?;

    match cli.command {
        Commands::Dl {
            url,
            output_dir,
            tvseries,
            season,
            no_plexify,
            subscribe,
        } => {
            let options = DownloadOptions {
                url,
                output_dir,
                scope: Scope::from_flags(tvseries, season),
                plexify: !no_plexify,
                subscribe,
            };
            session.download(&options, handle_progress_event)?;
        }
        Commands::Lsubs => {
            let listings = session.list_subscriptions()?;
            if listings.is_empty() {
                println!("{TAG} No subscriptions");
            }
            for listing in listings {
                match listing.label {
                    Some(label) => println!("{TAG} {} {}", listing.index, label),
                    None => println!(
                        "{TAG} {} {} (unavailable)",
                        listing.index, listing.subscription.url
                    ),
                }
            }
        }
        Commands::Add {
            url,
            output_dir,
            tvseries,
            season,
            rate,
        } => {
            let subscription = session.add_subscription(&SubscribeOptions {
                url,
                output_dir,
                scope: Scope::from_flags(tvseries, season),
                rate_hours: rate,
            })?;
            handle_progress_event(ProgressEvent::Subscribed {
                url: subscription.url,
                rate_hours: subscription.rate_hours,
            });
        }
        Commands::Rsubs { subscriptions, yes } => {
            if !yes {
                let prompt = format!("Remove {} subscription(s)?", subscriptions.len());
                let confirmed = Confirm::new()
                    .with_prompt(prompt)
                    .default(false)
                    .interact()
                    .map_err(|e| io::Error::other(e.to_string()))?;
                if !confirmed {
                    println!("{TAG} Nothing removed");
                    return Ok(());
                }
            }

            for removed in session.remove_subscriptions(&subscriptions)? {
                println!("{TAG} Removed subscription to {}", removed.url);
            }
        }
        Commands::Upcoming { url, schedule } => {
            let report = session.check_upcoming(&url, schedule)?;
            if report.episodes.is_empty() {
                println!("{TAG} No upcoming episodes found");
            }
            let now = chrono::Utc::now();
            for episode in &report.episodes {
                println!(
                    "{TAG} {} {}{}",
                    episode.release.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
                    episode.title,
                    if episode.is_overdue(now) { " (overdue)" } else { "" }
                );
            }
            if let Some(job) = report.scheduled {
                println!("{TAG} Scheduled re-check at '{}'", job.schedule);
            }
        }
        Commands::List { url } => {
            for episode in session.list_available(&url)? {
                let duration = episode
                    .duration_minutes
                    .map(|m| format!("{m:.2} min"))
                    .unwrap_or_else(|| "unknown".to_string());
                println!(
                    "{TAG} Title: {}\tPlex title: {}\tDuration: {}{}",
                    episode.title,
                    episode.plex_filename,
                    duration,
                    if episode.released { "" } else { "\t(not yet available)" }
                );
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

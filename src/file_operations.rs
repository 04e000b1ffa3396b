use crate::catalogue::{EpisodeDetails, EpisodeRef};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during file operations
#[derive(Debug, Error)]
pub enum FileOperationError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to create directory {path}: {source}")]
    CreateDirFailed { path: PathBuf, source: io::Error },

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Plex-style name of an episode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlexName {
    /// Trimmed show title (see [`trim_title`])
    pub title: String,
    pub season: u32,
    pub episode: u32,
}

impl PlexName {
    /// Builds the name from legacy broadcast details.
    ///
    /// The original broadcast title wins over the series title of the
    /// listing entry.
    pub fn from_details(details: &EpisodeDetails, episode: &EpisodeRef) -> Self {
        let title = details
            .original_title
            .as_deref()
            .unwrap_or(&episode.series_title);

        Self {
            title: trim_title(title),
            season: details.season_number,
            episode: details.episode_number,
        }
    }

    /// `Title.SNNENN`
    pub fn file_stem(&self) -> String {
        format!("{}.S{:02}E{:02}", self.title, self.season, self.episode)
    }

    /// Path (without extension) of the episode below `root`.
    ///
    /// With `show_folders` the episode goes to `Title/SeasonNN/`, otherwise
    /// directly into `root`.
    pub fn library_path(&self, root: &Path, show_folders: bool) -> PathBuf {
        if show_folders {
            root.join(&self.title)
                .join(format!("Season{:02}", self.season))
                .join(self.file_stem())
        } else {
            root.join(self.file_stem())
        }
    }
}

/// Title used when nothing of the broadcast title is left
const UNKNOWN_TITLE: &str = "Unknown";

/// Normalizes a show title for use in Plex filenames
///
/// Removes apostrophes and hyphens, collapses whitespace and joins the
/// remaining words with periods. Path separators become periods and leading
/// periods are dropped, so the result is always a single visible path
/// component.
pub fn trim_title(title: &str) -> String {
    let joined = title
        .replace(['\'', '-'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(".")
        .replace(['/', '\\'], ".");

    match joined.trim_start_matches('.') {
        "" => UNKNOWN_TITLE.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Represents a planned move of a downloaded file into the library
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    /// Downloaded file
    pub source: PathBuf,
    /// Final location including extension
    pub destination: PathBuf,
    /// Size of the source file in bytes
    pub size: u64,
}

/// Returns the part of `file_name` following `slug`, if the file belongs to it.
///
/// Files are written as `<id>.<ext>` (subtitles and extra thumbnails carry
/// additional dotted parts), so only names continuing with a dot match. This
/// keeps `show-1` from claiming `show-10.mp4`.
fn suffix_for<'a>(file_name: &'a str, slug: &str) -> Option<&'a str> {
    file_name
        .strip_prefix(slug)
        .filter(|rest| rest.starts_with('.'))
}

/// Plans the moves of staged downloads to their library paths
///
/// `targets` maps an episode slug to its destination path without
/// extension. Every file in `staging_dir` whose name starts with the slug is
/// moved, keeping everything after the slug (e.g. `.mp4`, `.da.vtt`). Files
/// matching no slug are moved into `unmatched_dir` under their own name.
pub fn plan_moves(
    staging_dir: &Path,
    targets: &[(String, PathBuf)],
    unmatched_dir: &Path,
) -> Result<Vec<PlannedMove>, FileOperationError> {
    let mut entries = fs::read_dir(staging_dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    let mut operations = Vec::new();

    for path in entries {
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name() else {
            continue;
        };

        let matched = file_name.to_str().and_then(|name| {
            targets.iter().find_map(|(slug, target)| {
                suffix_for(name, slug).map(|suffix| {
                    let mut destination = target.clone().into_os_string();
                    destination.push(suffix);
                    PathBuf::from(destination)
                })
            })
        });

        let destination = match matched {
            Some(destination) => destination,
            None => {
                warn!(
                    file = %path.display(),
                    "no episode matches downloaded file, keeping its name"
                );
                unmatched_dir.join(file_name)
            }
        };

        operations.push(PlannedMove {
            size: fs::metadata(&path)?.len(),
            source: path,
            destination,
        });
    }

    Ok(operations)
}

/// Moves a file, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
    }
}

/// Executes planned moves, creating target directories on demand
pub fn execute_moves(operations: &[PlannedMove]) -> Result<(), FileOperationError> {
    for op in operations {
        if let Some(parent) = op.destination.parent() {
            if !parent.exists() {
                info!(directory = %parent.display(), "creating directory");
                fs::create_dir_all(parent).map_err(|e| FileOperationError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!(from = %op.source.display(), to = %op.destination.display(), "moving");
        move_file(&op.source, &op.destination).map_err(|e| FileOperationError::MoveFailed {
            from: op.source.clone(),
            to: op.destination.clone(),
            source: e,
        })?;
    }

    Ok(())
}

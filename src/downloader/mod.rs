//! Media download module
//!
//! This module hands stream URIs to an external downloader. Stream
//! extraction and transcoding are entirely the downloader's business.

mod yt_dlp;

pub use yt_dlp::YtDlpDownloader;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the external downloader
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The downloader executable could not be found
    #[error("{0} not found. Please install it first.")]
    NotInstalled(String),

    /// The downloader could not be started
    #[error("Failed to run {program}: {source}")]
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },

    /// The downloader exited unsuccessfully
    #[error("{program} failed with exit code {code:?}")]
    Failed { program: String, code: Option<i32> },
}

/// Where and how downloaded files are named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// Downloader's own naming scheme inside the directory
    Default { directory: PathBuf },
    /// `<id>.<ext>` inside the directory, for renaming afterwards
    ById { directory: PathBuf },
}

/// A single downloader invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Stream URIs in download order
    pub uris: Vec<String>,
    pub layout: OutputLayout,
    /// Archive of already downloaded ids, shared across runs
    pub archive: PathBuf,
}

/// Trait for external media downloaders
pub trait MediaDownloader {
    /// Downloads every URI of the request, skipping ids already in the archive.
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError>;
}

impl<D: MediaDownloader + ?Sized> MediaDownloader for Box<D> {
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        (**self).download(request)
    }
}

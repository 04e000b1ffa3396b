//! yt-dlp based downloader
//!
//! Runs the `yt-dlp` executable (or a compatible fork) with a fixed option
//! set: all thumbnails, subtitles, restricted filenames and a download
//! archive so repeated runs skip what is already on disk.

use super::{DownloadError, DownloadRequest, MediaDownloader, OutputLayout};
use std::ffi::OsString;
use std::process::{Command, Stdio};
use tracing::debug;

/// Output template used when files are renamed afterwards
const ID_TEMPLATE: &str = "%(id)s.%(ext)s";

/// Downloader using the yt-dlp CLI
pub struct YtDlpDownloader {
    /// Executable name or path
    program: String,
}

impl YtDlpDownloader {
    /// Creates a downloader running the given executable
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Checks if the executable is installed and available
    fn is_installed(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Builds the argument list for a request
    fn build_args(request: &DownloadRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--write-all-thumbnails",
            "--write-subs",
            "--restrict-filenames",
            "--no-progress",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();

        args.push("--download-archive".into());
        args.push(request.archive.clone().into_os_string());

        match &request.layout {
            OutputLayout::Default { directory } => {
                args.push("--paths".into());
                args.push(directory.clone().into_os_string());
            }
            OutputLayout::ById { directory } => {
                args.push("--paths".into());
                args.push(directory.clone().into_os_string());
                args.push("--output".into());
                args.push(ID_TEMPLATE.into());
            }
        }

        args.extend(request.uris.iter().map(OsString::from));
        args
    }
}

impl MediaDownloader for YtDlpDownloader {
    fn download(&self, request: &DownloadRequest) -> Result<(), DownloadError> {
        if !self.is_installed() {
            return Err(DownloadError::NotInstalled(self.program.clone()));
        }

        let args = Self::build_args(request);
        debug!(program = %self.program, ?args, "running downloader");

        // Output is passed through so scheduled runs end up in their log file
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| DownloadError::SpawnFailed {
                program: self.program.clone(),
                source: e,
            })?;

        if !status.success() {
            return Err(DownloadError::Failed {
                program: self.program.clone(),
                code: status.code(),
            });
        }

        Ok(())
    }
}

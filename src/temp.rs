//! Staging directory management
//!
//! Plexified downloads land in a staging directory first. The directory is
//! removed again when its guard goes out of scope, but only if it is empty.
//! Anything still inside is left for the user.

use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Guard for a staging directory that is removed on drop once empty
#[derive(Debug)]
pub(crate) struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Get the path to the staging directory
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir(&self.path) {
            warn!(
                directory = %self.path.display(),
                error = %e,
                "staging directory left in place"
            );
        }
    }
}

impl Deref for StagingDir {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        self.path()
    }
}

/// Creates a staging directory inside `parent`
///
/// The directory is named with a ULID so concurrent runs into the same
/// output directory never share one. `parent` is created if missing.
///
/// # Examples
///
/// ```ignore
/// let staging = create_staging_dir(Path::new("/media/tv"))?;
/// // download into staging.path() and move the files out ...
/// // the empty directory is removed when staging goes out of scope
/// ```
pub(crate) fn create_staging_dir(parent: &Path) -> io::Result<StagingDir> {
    let path = parent.join(format!(".drdl-{}", ulid::Ulid::new()));
    fs::create_dir_all(&path)?;

    Ok(StagingDir { path })
}

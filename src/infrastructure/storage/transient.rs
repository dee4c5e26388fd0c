use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use tempfile::{Builder, TempPath};
use tracing::{info, warn};

pub const INPUT_PREFIX: &str = "upload-";
pub const OUTPUT_PREFIX: &str = "converted-";

/// Directory of short-lived, uniquely named files.
///
/// Every file handed out is a [`TempPath`], so it is removed when dropped even
/// if the owner never reaches an explicit [`TransientStorage::release`].
#[derive(Clone, Debug)]
pub struct TransientStorage {
    root: PathBuf,
}

impl TransientStorage {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        info!("Transient storage ready at {}", root.display());

        Ok(Self { root })
    }

    /// Writes `bytes` into a fresh file named `<prefix><random>.<extension>`.
    /// A failed write removes the partial file before returning.
    pub fn write(&self, prefix: &str, extension: &str, bytes: &[u8]) -> io::Result<TempPath> {
        let mut file = Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{extension}"))
            .tempfile_in(&self.root)?;

        file.write_all(bytes)?;
        file.flush()?;

        Ok(file.into_temp_path())
    }

    /// Creates an empty file for producers that write by path (ffmpeg).
    pub fn reserve(&self, prefix: &str, extension: &str) -> io::Result<TempPath> {
        let file = Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{extension}"))
            .tempfile_in(&self.root)?;

        Ok(file.into_temp_path())
    }

    /// Deletes a transient file. Failures are logged, never returned.
    pub fn release(path: TempPath) {
        let shown = path.display().to_string();
        if let Err(e) = path.close() {
            warn!("Failed to remove transient file {}: {}", shown, e);
        }
    }

    /// Number of files currently owned by the converter.
    pub fn count(&self) -> io::Result<usize> {
        Ok(self.owned_entries()?.len())
    }

    /// Removes files left behind by a previous process.
    pub fn purge(&self) -> io::Result<usize> {
        let mut removed = 0;
        for path in self.owned_entries()? {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to purge {}: {}", path.display(), e),
            }
        }

        if removed > 0 {
            info!("Purged {} stale transient files from {}", removed, self.root.display());
        }

        Ok(removed)
    }

    fn owned_entries(&self) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if (name.starts_with(INPUT_PREFIX) || name.starts_with(OUTPUT_PREFIX))
                && entry.file_type()?.is_file()
            {
                entries.push(entry.path());
            }
        }
        Ok(entries)
    }
}

// THEORY:
// The `folder_watch` module implements the one concrete source: a camera
// drop folder probed on a fixed cadence. Each poll lists the directory,
// keeps only supported image extensions, and selects the single newest file
// by modification time, breaking ties by lexicographically greatest filename
// so the choice is deterministic.
//
// Key architectural principles:
// 1.  **Idempotent delivery**: the source remembers the fingerprint of the
//     last handle it returned. An unchanged folder yields `None`, never a
//     re-delivery, no matter how often it is polled.
// 2.  **Bounded probe**: one directory listing plus one metadata read per
//     candidate. No watchers, no blocking waits; cadence lives upstream in
//     the coordinator.
// 3.  **Absence is not an error**: an empty folder is a normal `None`; only
//     a missing or unreadable directory surfaces as `SourceError`.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::core_modules::pixel_buffer::{Fingerprint, ImageHandle};
use crate::core_modules::source::ImageSource;
use crate::errors::SourceError;

/// File extensions recognized as images, matched case-insensitively.
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// A source that delivers the newest image from a watched directory.
pub struct FolderWatchSource {
    name: String,
    path: PathBuf,
    update_interval: Duration,
    /// Fingerprint of the last handle this source returned.
    last_fingerprint: Option<Fingerprint>,
}

impl FolderWatchSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, update_interval: Duration) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            update_interval,
            last_fingerprint: None,
        }
    }

    fn is_image_file(path: &std::path::Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| {
                let lower = e.to_lowercase();
                IMAGE_EXTENSIONS.contains(&lower.as_str())
            })
            .unwrap_or(false)
    }

    /// Lists the folder and picks the newest image file, ties broken by
    /// lexicographically greatest filename.
    fn newest_image(&self) -> Result<Option<(PathBuf, Fingerprint)>, SourceError> {
        let entries = std::fs::read_dir(&self.path).map_err(|_| SourceError::Unavailable {
            path: self.path.clone(),
        })?;

        let mut newest: Option<(PathBuf, SystemTime, u64)> = None;
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::ReadFailed {
                path: self.path.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() || !Self::is_image_file(&path) {
                continue;
            }
            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    // A file that vanished between listing and stat is not
                    // worth failing the whole tick over.
                    debug!(source = %self.name, path = %path.display(), error = %e,
                           "skipping unreadable entry");
                    continue;
                }
            };
            let modified = meta.modified().map_err(|e| SourceError::ReadFailed {
                path: path.clone(),
                source: e,
            })?;

            let is_newer = match &newest {
                None => true,
                Some((best_path, best_time, _)) => {
                    modified > *best_time
                        || (modified == *best_time
                            && path.file_name() > best_path.file_name())
                }
            };
            if is_newer {
                newest = Some((path, modified, meta.len()));
            }
        }

        Ok(newest.map(|(path, modified, size)| {
            let fingerprint = Fingerprint::new(modified, size);
            (path, fingerprint)
        }))
    }
}

impl ImageSource for FolderWatchSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn update_interval(&self) -> Duration {
        self.update_interval
    }

    fn start(&mut self) {
        if !self.path.is_dir() {
            warn!(source = %self.name, path = %self.path.display(),
                  "watch folder does not exist yet; will keep probing");
        } else {
            debug!(source = %self.name, path = %self.path.display(), "watching folder");
        }
    }

    fn stop(&mut self) {
        debug!(source = %self.name, "stopped watching folder");
    }

    fn poll(&mut self) -> Result<Option<ImageHandle>, SourceError> {
        let Some((path, fingerprint)) = self.newest_image()? else {
            return Ok(None);
        };

        if self.last_fingerprint == Some(fingerprint) {
            return Ok(None);
        }

        self.last_fingerprint = Some(fingerprint);
        Ok(Some(ImageHandle {
            source_name: self.name.clone(),
            path,
            fingerprint,
            observed_at: SystemTime::now(),
        }))
    }
}

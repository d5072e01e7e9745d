use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::Serialize;
use tracing::Level;

use super::log::LogSink;
use crate::error::{Error, Result};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Period used when the owner does not pick one.
pub const DEFAULT_FREQUENCY: Duration = Duration::from_secs(3600);

/// What to clean, how old an entry may get, and how often to look.
#[derive(Clone)]
pub struct CleanerConfig {
    /// Directory whose direct entries are inspected. Not validated up front.
    pub directory: PathBuf,
    /// Entries modified strictly before `now - retention_days` are removed.
    pub retention_days: u32,
    /// Delay between two scheduled passes.
    pub frequency: Duration,
    /// Where status lines go. `None` keeps the cleaner silent.
    pub log_sink: Option<Arc<dyn LogSink>>,
}

impl fmt::Debug for CleanerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanerConfig")
            .field("directory", &self.directory)
            .field("retention_days", &self.retention_days)
            .field("frequency", &self.frequency)
            .field("log_sink", &self.log_sink.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl CleanerConfig {
    pub fn new(directory: impl Into<PathBuf>, retention_days: u32) -> Self {
        Self {
            directory: directory.into(),
            retention_days,
            frequency: DEFAULT_FREQUENCY,
            log_sink: None,
        }
    }

    pub fn with_frequency(mut self, frequency: Duration) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_frequency_secs(self, secs: u64) -> Self {
        self.with_frequency(Duration::from_secs(secs))
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log_sink = Some(sink);
        self
    }

    /// Maximum age an entry may reach before it is removed.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * SECS_PER_DAY)
    }

    /// Oldest modification time that survives a pass started at `now`.
    /// Clamped to the Unix epoch.
    pub fn cutoff(&self, now: SystemTime) -> SystemTime {
        now.checked_sub(self.retention()).unwrap_or(UNIX_EPOCH)
    }

    pub(crate) fn log(&self, level: Level, message: &str) {
        if let Some(sink) = &self.log_sink {
            sink.log(level, message);
        }
    }
}

/// Outcome of one successful pass.
///
/// A pass whose directory could be listed is a success even when single
/// entries could not be inspected or removed; those show up in the failure
/// counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub scanned: usize,
    pub removed: usize,
    pub kept: usize,
    pub stat_failures: usize,
    pub delete_failures: usize,
}

impl CleanupReport {
    pub fn failures(&self) -> usize {
        self.stat_failures + self.delete_failures
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} of {} entries ({} kept, {} stat failures, {} delete failures)",
            self.removed, self.scanned, self.kept, self.stat_failures, self.delete_failures
        )
    }
}

/// Run one pass against the current wall clock.
pub fn perform_cleanup(config: &CleanerConfig) -> Result<CleanupReport> {
    perform_cleanup_at(config, SystemTime::now())
}

/// Run one pass as if it started at `now`.
///
/// The cutoff is computed once; entries are visited in whatever order the
/// platform lists them.
pub fn perform_cleanup_at(config: &CleanerConfig, now: SystemTime) -> Result<CleanupReport> {
    let dir = &config.directory;
    let entries = read_entries(dir)?;
    if entries.is_empty() {
        config.log(Level::INFO, "Skipping cleanup, no files found.");
        return Ok(CleanupReport::default());
    }

    config.log(Level::INFO, "Starting cleanup.");
    let cutoff = config.cutoff(now);
    let mut report = CleanupReport {
        scanned: entries.len(),
        ..Default::default()
    };

    for entry in entries {
        let path = dir.join(entry.file_name());
        let (is_dir, modified) = match stat(&entry) {
            Ok(found) => found,
            Err(source) => {
                let err = Error::FileStat { path, source };
                config.log(Level::WARN, &err.to_string());
                report.stat_failures += 1;
                continue;
            }
        };

        if modified >= cutoff {
            report.kept += 1;
            continue;
        }

        match remove(&path, is_dir) {
            Ok(()) => {
                config.log(
                    Level::INFO,
                    &format!("Successfully cleaned up: {}", path.display()),
                );
                report.removed += 1;
            }
            Err(source) => {
                let err = Error::FileDelete { path, source };
                config.log(Level::WARN, &err.to_string());
                report.delete_failures += 1;
            }
        }
    }

    config.log(Level::INFO, &format!("Cleanup finished: {report}."));
    Ok(report)
}

fn read_entries(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    fs::read_dir(dir)
        .and_then(|listing| listing.collect::<io::Result<Vec<_>>>())
        .map_err(|source| Error::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })
}

// DirEntry::metadata does not follow symlinks, so a link is judged by its own mtime.
fn stat(entry: &fs::DirEntry) -> io::Result<(bool, SystemTime)> {
    let metadata = entry.metadata()?;
    Ok((metadata.is_dir(), metadata.modified()?))
}

fn remove(path: &Path, is_dir: bool) -> io::Result<()> {
    if is_dir {
        // only empty directories go; no recursion
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}

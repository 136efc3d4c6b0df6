//! Traversal progress reporting.
//!
//! Reporters only observe the traversal; nothing they do feeds back into it.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::package::Artifact;
use crate::store::DownloadOutcome;

#[cfg_attr(test, mockall::automock)]
pub trait ProgressReporter: Send + Sync {
    /// `count` more artifacts were queued for processing.
    fn add_expected(&self, count: u64);

    /// Processing of `artifact` began.
    fn start(&self, artifact: &Artifact);

    /// `artifact` was downloaded (or found on disk) and inspected.
    fn complete(&self, artifact: &Artifact, outcome: DownloadOutcome);
}

/// Running totals plus one line per processed artifact on stdout.
#[derive(Default)]
pub struct ConsoleProgress {
    quiet: bool,
    total: AtomicU64,
    completed: AtomicU64,
    description: Mutex<String>,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            ..Self::default()
        }
    }

    /// Artifacts queued so far.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Artifacts processed so far.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Human readable description of the artifact most recently started.
    pub fn description(&self) -> String {
        self.description.lock().unwrap().clone()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn add_expected(&self, count: u64) {
        self.total.fetch_add(count, Ordering::SeqCst);
    }

    fn start(&self, artifact: &Artifact) {
        *self.description.lock().unwrap() = format!("Downloading {}", artifact.full_name);
    }

    fn complete(&self, artifact: &Artifact, outcome: DownloadOutcome) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if self.quiet {
            return;
        }

        let total = self.total();
        let width = total.to_string().len();
        match outcome {
            DownloadOutcome::Fetched { bytes } => println!(
                "[{:>width$}/{}] downloaded {} ({})",
                completed,
                total,
                artifact,
                human_size(bytes),
            ),
            DownloadOutcome::AlreadyPresent => println!(
                "[{:>width$}/{}]    present {}",
                completed, total, artifact,
            ),
        }
    }
}

pub(crate) fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;

    #[test]
    fn test_console_progress_counters() {
        let progress = ConsoleProgress::new(true);
        let a = Artifact::new(Package::new("pkg-a"), "pkg_a-1.0.tar.gz", "i", "u");

        progress.add_expected(2);
        progress.start(&a);
        assert_eq!(progress.description(), "Downloading pkg_a-1.0.tar.gz");

        progress.complete(&a, DownloadOutcome::Fetched { bytes: 10 });
        progress.add_expected(1);
        progress.complete(&a, DownloadOutcome::AlreadyPresent);

        assert_eq!(progress.total(), 3);
        assert_eq!(progress.completed(), 2);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(0), "0 B");
        assert_eq!(human_size(1023), "1023 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.0 MB");
    }
}

//! Scheduler: single-writer lock, periodic cycles, signal cancellation
//!
//! One scheduler per deployment: a lock file under the archive root
//! refuses a second instance. SIGINT/SIGTERM flip a stop flag; the main
//! loop sleeps in one-second ticks so a signal interrupts within a
//! second. The lock is removed by a scoped guard, so it also disappears
//! when a cycle panics its way out of the loop. A SIGKILL or host crash
//! leaves a stale lock that needs manual removal.

use anyhow::{Context as _, Result};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use revpipe_core::time::LOG_PATTERN;

use crate::runner::Runner;

const LOCK_FILE_NAME: &str = "revpipe.lock";

/// Periodic driver around a [`Runner`].
pub struct Scheduler {
    interval: Duration,
    lock_path: PathBuf,
    stopped: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(interval_minutes: u64, archive_path: &Path) -> Self {
        Self {
            interval: Duration::from_secs(interval_minutes * 60),
            lock_path: archive_path.join(LOCK_FILE_NAME),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Request a stop from the current process (what the signal handler
    /// does).
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Run cycles until a signal arrives. Refuses to start while a lock
    /// file is present.
    pub fn start(&self, runner: &Runner<'_>) -> Result<()> {
        info!(
            interval_minutes = self.interval.as_secs() / 60,
            "Initializing pipeline scheduler"
        );

        if self.lock_path.exists() {
            anyhow::bail!(
                "Scheduler already running! Lock file present at '{}'. \
                 Remove it manually if the previous run did not exit cleanly.",
                self.lock_path.display()
            );
        }

        let _lock = LockGuard::acquire(&self.lock_path)?;

        let stopped = Arc::clone(&self.stopped);
        if let Err(err) = ctrlc::set_handler(move || {
            stopped.store(true, Ordering::SeqCst);
        }) {
            // A second scheduler in the same process (tests) cannot
            // re-register; the stop flag still works.
            warn!(error = %err, "Signal handler not registered");
        }

        while !self.stopped.load(Ordering::SeqCst) {
            self.run_cycle(runner);

            let next_run = chrono::Local::now()
                + chrono::Duration::from_std(self.interval).unwrap_or(chrono::Duration::zero());
            info!(
                "Next run will be executed on '{}'",
                next_run.format(LOG_PATTERN)
            );

            for _ in 0..self.interval.as_secs() {
                if self.stopped.load(Ordering::SeqCst) {
                    break;
                }
                std::thread::sleep(Duration::from_secs(1));
            }
        }

        info!("Scheduler is shutting down...");
        Ok(())
    }

    /// One guarded cycle: neither errors nor panics escape the loop.
    fn run_cycle(&self, runner: &Runner<'_>) {
        info!(
            "Schedule execution started: {}",
            chrono::Local::now().format(LOG_PATTERN)
        );
        match catch_unwind(AssertUnwindSafe(|| runner.run())) {
            Ok(Ok(())) => info!(
                "Schedule execution completed: {}",
                chrono::Local::now().format(LOG_PATTERN)
            ),
            Ok(Err(err)) => error!("Scheduled execution failed: {err:?}"),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(panic = %message, "Scheduled execution panicked");
            }
        }
    }
}

/// Holds the lock file for the scheduler's lifetime; removal runs on
/// drop, which covers both clean exits and unwinding.
struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating lock directory '{}'", parent.display()))?;
        }
        std::fs::write(path, format!("RunId: {}", chrono::Local::now().to_rfc3339()))
            .with_context(|| format!("writing lock file '{}'", path.display()))?;
        Ok(Self { path: path.to_path_buf() })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "Could not remove lock file");
        }
    }
}

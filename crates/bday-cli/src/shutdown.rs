//! Cooperative shutdown: Ctrl-C, SIGTERM or an emergency-stop file.
//!
//! The signal is only observed between major steps; in-flight requests are
//! not cancelled.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STOP_FILE_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub(crate) struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    stop_file: PathBuf,
    watcher: tokio::task::JoinHandle<()>,
}

impl ShutdownSignal {
    /// Starts watching. A stop file left over from an earlier run is removed
    /// first so it cannot trip this one.
    pub(crate) fn install(stop_file: PathBuf) -> Self {
        remove_stop_file(&stop_file);
        let triggered = Arc::new(AtomicBool::new(false));
        let watcher = tokio::spawn(watch(stop_file.clone(), Arc::clone(&triggered)));
        Self {
            triggered,
            stop_file,
            watcher,
        }
    }

    pub(crate) fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Deletes the stop file so the next run starts clean.
    pub(crate) fn cleanup(&self) {
        remove_stop_file(&self.stop_file);
    }
}

impl Drop for ShutdownSignal {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}

fn remove_stop_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::info!(path = %path.display(), "removed stop file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to remove stop file"),
    }
}

async fn watch(stop_file: PathBuf, triggered: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let stop_file_appears = async {
        let mut ticker = tokio::time::interval(STOP_FILE_POLL_INTERVAL);
        loop {
            ticker.tick().await;
            if tokio::fs::try_exists(&stop_file).await.unwrap_or(false) {
                break;
            }
        }
    };

    let reason = tokio::select! {
        () = ctrl_c => "ctrl-c",
        () = terminate => "SIGTERM",
        () = stop_file_appears => "stop file",
    };

    tracing::warn!(reason, "shutdown requested, stopping after the current step");
    triggered.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn leftover_stop_file_is_removed_on_install() {
        let dir = tempfile::tempdir().unwrap();
        let stop_file = dir.path().join("EMERGENCY_STOP.txt");
        std::fs::write(&stop_file, "stop").unwrap();

        let signal = ShutdownSignal::install(stop_file.clone());

        assert!(!stop_file.exists());
        assert!(!signal.is_triggered());
    }

    #[tokio::test]
    async fn stop_file_trips_the_signal() {
        let dir = tempfile::tempdir().unwrap();
        let stop_file = dir.path().join("EMERGENCY_STOP.txt");
        let signal = ShutdownSignal::install(stop_file.clone());

        std::fs::write(&stop_file, "stop").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !signal.is_triggered() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(signal.is_triggered());

        signal.cleanup();
        assert!(!stop_file.exists());
    }
}

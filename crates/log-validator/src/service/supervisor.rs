//! Supervisor — one tailer + worker per configured file, shared shutdown.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::status::StatusBoard;
use super::worker::{Worker, WorkerSummary};
use crate::error::ValidatorError;
use crate::metrics::LineMetrics;
use crate::tail::{TailConfig, TailHandle, TailLogger};

struct MonitoredFile {
    handle: TailHandle,
    // Detached on shutdown; it drains what is already queued and exits.
    _worker: JoinHandle<WorkerSummary>,
}

/// What happened while stopping the tailers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub stopped: usize,
    /// Stops that raced with a reopen; harmless and not logged as errors.
    pub races_suppressed: usize,
    pub errors: usize,
}

pub struct Supervisor {
    shutdown: CancellationToken,
    files: Vec<MonitoredFile>,
    status: StatusBoard,
}

impl Supervisor {
    /// Start monitoring every path.
    ///
    /// Fail-fast: if any tailer cannot be constructed, the ones already
    /// started are torn down and the error is returned. Partial coverage is
    /// never left running.
    pub fn start(
        paths: &[PathBuf],
        config: &TailConfig,
        metrics: Arc<LineMetrics>,
        logger: Arc<dyn TailLogger>,
    ) -> Result<Self, ValidatorError> {
        let shutdown = CancellationToken::new();
        let mut files = Vec::with_capacity(paths.len());

        for path in paths {
            let (handle, lines) =
                match TailHandle::spawn(path.clone(), config.clone(), Arc::clone(&logger), &shutdown) {
                    Ok(started) => started,
                    Err(source) => {
                        shutdown.cancel();
                        for monitored in files {
                            let MonitoredFile { handle, .. } = monitored;
                            handle.cleanup();
                        }
                        return Err(ValidatorError::Watcher {
                            path: path.clone(),
                            source,
                        });
                    }
                };

            let filename = path.display().to_string();
            info!(filename = %filename, "Tailing file");
            let worker = tokio::spawn(Worker::new(filename, Arc::clone(&metrics)).run(lines));
            files.push(MonitoredFile {
                handle,
                _worker: worker,
            });
        }

        let status = StatusBoard::new(files.iter().map(|f| {
            (
                f.handle.path().display().to_string(),
                f.handle.subscribe_state(),
                f.handle.reopen_counter(),
            )
        }));

        Ok(Self {
            shutdown,
            files,
            status,
        })
    }

    pub fn status(&self) -> StatusBoard {
        self.status.clone()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Stop every tailer and release its resources.
    ///
    /// Broadcasts cancellation first so all tailers wind down together,
    /// then stops and cleans up each one in order. Cleanup runs whatever
    /// `stop` returned. Never fails; problems are logged and counted.
    pub async fn shutdown(self) -> ShutdownReport {
        info!("Stopping {} tailer(s)", self.files.len());
        self.shutdown.cancel();

        let mut report = ShutdownReport::default();
        for monitored in self.files {
            let MonitoredFile { mut handle, .. } = monitored;
            match handle.stop().await {
                Ok(()) => report.stopped += 1,
                Err(e) if e.is_shutdown_race() => {
                    report.races_suppressed += 1;
                    debug!(filename = %handle.path().display(), "Ignoring shutdown race: {}", e);
                }
                Err(e) => {
                    report.errors += 1;
                    warn!(filename = %handle.path().display(), "Failed to stop tailing file: {}", e);
                }
            }
            handle.cleanup();
        }

        info!(
            stopped = report.stopped,
            races_suppressed = report.races_suppressed,
            errors = report.errors,
            "All tailers stopped"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{log_line_checksum, LineStatus};
    use crate::tail::{TailState, TracingTailLogger};
    use std::io::Write;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(10);

    fn fast_config() -> TailConfig {
        TailConfig {
            poll_interval: Duration::from_millis(10),
            channel_capacity: 128,
            stop_timeout: Duration::from_secs(3),
        }
    }

    fn signed(message: &str) -> String {
        format!(
            "2024-01-01T00:00:00Z host datacenter 6 app[1]: {} {}\n",
            log_line_checksum(message),
            message
        )
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    fn label(path: &Path) -> String {
        path.display().to_string()
    }

    async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
        let reached = tokio::time::timeout(WAIT, async {
            while !check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(reached.is_ok(), "timed out waiting for {}", what);
    }

    fn start(paths: &[PathBuf], metrics: &Arc<LineMetrics>) -> Supervisor {
        Supervisor::start(paths, &fast_config(), Arc::clone(metrics), Arc::new(TracingTailLogger))
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_files_counted_independently() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.log");
        let b = dir.path().join("b.log");
        append(&a, "");
        append(&b, "");

        let metrics = Arc::new(LineMetrics::new());
        let supervisor = start(&[a.clone(), b.clone()], &metrics);
        let status = supervisor.status();
        wait_until("tailers to start", || status.all_watching()).await;

        let body_a: String = (0..100).map(|i| signed(&format!("a message {}", i))).collect();
        let body_b: String = (0..50)
            .map(|i| {
                if i % 5 == 0 {
                    format!("t h d s tag BADSUM b message {}\n", i)
                } else {
                    signed(&format!("b message {}", i))
                }
            })
            .collect();

        let (pa, pb) = (a.clone(), b.clone());
        let writer_a = tokio::task::spawn_blocking(move || append(&pa, &body_a));
        let writer_b = tokio::task::spawn_blocking(move || append(&pb, &body_b));
        writer_a.await.unwrap();
        writer_b.await.unwrap();

        wait_until("all lines counted", || {
            metrics.get(&label(&a), LineStatus::Ok) == 100
                && metrics.get(&label(&b), LineStatus::Ok) + metrics.get(&label(&b), LineStatus::Bad) == 50
        })
        .await;

        assert_eq!(metrics.get(&label(&a), LineStatus::Ok), 100);
        assert_eq!(metrics.get(&label(&a), LineStatus::Bad), 0);
        assert_eq!(metrics.get(&label(&b), LineStatus::Ok), 40);
        assert_eq!(metrics.get(&label(&b), LineStatus::Bad), 10);

        let report = supervisor.shutdown().await;
        assert_eq!(report.stopped, 2);
        assert_eq!(report.errors, 0);
    }

    #[tokio::test]
    async fn test_rotation_mid_run_keeps_counting_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rotating.log");
        append(&path, "");

        let metrics = Arc::new(LineMetrics::new());
        let supervisor = start(&[path.clone()], &metrics);
        let status = supervisor.status();
        wait_until("tailer to start", || status.all_watching()).await;

        let before: String = (0..5).map(|i| signed(&format!("before {}", i))).collect();
        append(&path, &before);
        wait_until("pre-rotation lines", || metrics.get(&label(&path), LineStatus::Ok) == 5).await;

        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(0)
            .unwrap();
        wait_until("reopen", || status.snapshot()[0].reopens == 1).await;

        let after: String = (0..3).map(|i| signed(&format!("after {}", i))).collect();
        append(&path, &after);
        wait_until("post-rotation lines", || metrics.get(&label(&path), LineStatus::Ok) == 8).await;

        // give a duplicate delivery a chance to show up
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(metrics.get(&label(&path), LineStatus::Ok), 8);
        assert_eq!(metrics.get(&label(&path), LineStatus::Bad), 0);

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_fail_fast_on_bad_path() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.log");
        let bad = dir.path().to_path_buf();

        let metrics = Arc::new(LineMetrics::new());
        let result = Supervisor::start(
            &[good, bad.clone()],
            &fast_config(),
            metrics,
            Arc::new(TracingTailLogger),
        );

        match result {
            Err(ValidatorError::Watcher { path, .. }) => assert_eq!(path, bad),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected startup to fail"),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-yet.log");

        let metrics = Arc::new(LineMetrics::new());
        let supervisor = start(&[path.clone()], &metrics);
        let status = supervisor.status();
        wait_until("tailer to start", || status.all_watching()).await;

        append(&path, &signed("first ever"));
        wait_until("line from new file", || metrics.get(&label(&path), LineStatus::Ok) == 1).await;

        supervisor.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_under_load_with_rotation_race() {
        let dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (0..3).map(|i| dir.path().join(format!("busy{}.log", i))).collect();
        for p in &paths {
            append(p, "");
        }
        let doomed = dir.path().join("doomed.log");
        append(&doomed, "");
        let mut all = paths.clone();
        all.push(doomed.clone());

        let metrics = Arc::new(LineMetrics::new());
        let supervisor = start(&all, &metrics);
        let status = supervisor.status();
        wait_until("tailers to start", || status.all_watching()).await;

        // deleted and never recreated: its tailer sits in Reopening
        std::fs::remove_file(&doomed).unwrap();
        wait_until("reopening", || {
            status
                .snapshot()
                .iter()
                .any(|s| s.state == TailState::Reopening)
        })
        .await;

        let stop_writers = CancellationToken::new();
        let writers: Vec<_> = paths
            .iter()
            .cloned()
            .map(|p| {
                let stop = stop_writers.clone();
                tokio::task::spawn_blocking(move || {
                    let mut n = 0;
                    while !stop.is_cancelled() {
                        append(&p, &signed(&format!("line {}", n)));
                        n += 1;
                        std::thread::sleep(Duration::from_millis(1));
                    }
                })
            })
            .collect();

        wait_until("lines flowing", || {
            paths
                .iter()
                .all(|p| metrics.get(&label(p), LineStatus::Ok) > 0)
        })
        .await;

        let report = tokio::time::timeout(WAIT, supervisor.shutdown())
            .await
            .expect("shutdown did not finish in time");
        stop_writers.cancel();
        for w in writers {
            w.await.unwrap();
        }

        assert_eq!(report.errors, 0);
        assert_eq!(report.races_suppressed, 1);
        assert_eq!(report.stopped, 3);
        assert!(status.snapshot().iter().all(|s| s.state == TailState::Stopped));
    }
}

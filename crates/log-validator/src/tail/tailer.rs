//! Tailer — per-file polling follower with rotation handling.
//!
//! The task keeps the file open and reads whatever has been appended since
//! the last poll. After draining to EOF it stats the path again:
//!
//! - path gone → the file was moved or deleted; wait for it to reappear
//! - different device/inode → replaced; open the new file from the start
//! - size below our offset → truncated; reopen from the start
//!
//! Bytes still sitting in the old handle are drained before the switch, so
//! nothing written before the rotation is lost or delivered twice.
//!
//! A truncate followed by a rewrite within one poll interval leaves the size
//! at or above our offset. To catch it, the last bytes read are kept and
//! compared with what the file holds at the same position before every
//! drain; a mismatch means the content was replaced in place.

use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::error::TailError;
use super::logger::TailLogger;
use super::state::{StateCell, TailState};

const READ_CHUNK_BYTES: usize = 64 * 1024;
/// A line that reaches this size without a newline is delivered as is.
const MAX_LINE_BYTES: usize = 16 * READ_CHUNK_BYTES;
/// How much already-read content is kept to recognise the file.
const FINGERPRINT_BYTES: usize = 64;

/// Raw line bytes without the trailing `\n`.
pub type LineResult = Result<Vec<u8>, TailError>;
pub type Lines = mpsc::Receiver<LineResult>;

#[derive(Debug, Clone)]
pub struct TailConfig {
    pub poll_interval: Duration,
    pub channel_capacity: usize,
    pub stop_timeout: Duration,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            channel_capacity: 1024,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl TailConfig {
    pub fn validate(&self) -> Result<(), TailError> {
        if self.poll_interval.is_zero() {
            return Err(TailError::InvalidConfig("poll_interval must be > 0".into()));
        }
        if self.channel_capacity == 0 {
            return Err(TailError::InvalidConfig("channel_capacity must be > 0".into()));
        }
        if self.stop_timeout.is_zero() {
            return Err(TailError::InvalidConfig("stop_timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// Owner's side of a running tailer.
pub struct TailHandle {
    path: PathBuf,
    state: Arc<StateCell>,
    reopens: Arc<AtomicU64>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<(), TailError>>>,
    stop_timeout: Duration,
}

impl TailHandle {
    /// Start following `path`. The file does not have to exist yet.
    ///
    /// `shutdown` is the process-wide token; the tailer listens on a child
    /// of it, so cancelling the parent stops every tailer at once.
    pub fn spawn(
        path: impl Into<PathBuf>,
        config: TailConfig,
        logger: Arc<dyn TailLogger>,
        shutdown: &CancellationToken,
    ) -> Result<(Self, Lines), TailError> {
        let path = path.into();
        config.validate()?;
        if path.as_os_str().is_empty() {
            return Err(TailError::InvalidConfig("empty file path".into()));
        }
        if path.is_dir() {
            return Err(TailError::InvalidConfig(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let (tx, rx) = mpsc::channel(config.channel_capacity);
        let state = Arc::new(StateCell::new());
        let reopens = Arc::new(AtomicU64::new(0));
        let cancel = shutdown.child_token();

        let tailer = Tailer {
            path: path.clone(),
            poll_interval: config.poll_interval,
            logger,
            tx,
            state: Arc::clone(&state),
            reopens: Arc::clone(&reopens),
            cancel: cancel.clone(),
            current: None,
            pending: Vec::new(),
            read_buf: vec![0u8; READ_CHUNK_BYTES],
            open_failing: false,
        };
        let task = tokio::spawn(tailer.run());

        Ok((
            Self {
                path,
                state,
                reopens,
                cancel,
                task: Some(task),
                stop_timeout: config.stop_timeout,
            },
            rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> TailState {
        self.state.get()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<TailState> {
        self.state.subscribe()
    }

    /// How many times the file has been reopened after rotation/truncation.
    pub fn reopens(&self) -> u64 {
        self.reopens.load(Ordering::Relaxed)
    }

    pub(crate) fn reopen_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reopens)
    }

    /// Wait until the tailer reaches `target`, up to `timeout`.
    pub async fn wait_for_state(&self, target: TailState, timeout: Duration) -> bool {
        let mut rx = self.state.subscribe();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| *s == target)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Ask the tailer to stop and wait (bounded) for it to exit.
    ///
    /// Returns [`TailError::ReopenInterrupted`] if the stop landed while a
    /// reopen was in flight. Calling `stop` again after it returned is a no-op.
    pub async fn stop(&mut self) -> Result<(), TailError> {
        self.cancel.cancel();
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };

        let outcome = match tokio::time::timeout(self.stop_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(TailError::Task {
                path: self.path.clone(),
                reason: join_err.to_string(),
            }),
            Err(_) => {
                return Err(TailError::StopTimeout {
                    path: self.path.clone(),
                    timeout: self.stop_timeout,
                })
            }
        };
        self.task = None;
        outcome
    }

    /// Release everything the tailer holds. Aborts the task if `stop` did
    /// not manage to end it; the line channel closes once the task is gone.
    pub fn cleanup(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.set(TailState::Stopped);
    }
}

impl Drop for TailHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Identity of the file behind a path, used to notice replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileId {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

impl FileId {
    #[cfg(unix)]
    fn of(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    fn of(_meta: &std::fs::Metadata) -> Self {
        Self {}
    }
}

struct OpenFile {
    file: File,
    id: FileId,
    offset: u64,
    /// Up to `FINGERPRINT_BYTES` of content ending at `offset`.
    recent: Vec<u8>,
}

impl OpenFile {
    fn remember(&mut self, read: &[u8]) {
        if read.len() >= FINGERPRINT_BYTES {
            self.recent.clear();
            self.recent
                .extend_from_slice(&read[read.len() - FINGERPRINT_BYTES..]);
        } else {
            self.recent.extend_from_slice(read);
            let excess = self.recent.len().saturating_sub(FINGERPRINT_BYTES);
            self.recent.drain(..excess);
        }
    }

    /// Whether the bytes before `offset` are still the ones we read.
    /// Leaves the cursor at `offset` when they are.
    async fn overwritten(&mut self) -> std::io::Result<bool> {
        if self.recent.is_empty() {
            return Ok(false);
        }
        let start = self.offset - self.recent.len() as u64;
        let mut seen = vec![0u8; self.recent.len()];
        self.file.seek(SeekFrom::Start(start)).await?;
        match self.file.read_exact(&mut seen).await {
            Ok(_) => Ok(seen != self.recent),
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => Ok(true),
            Err(err) => Err(err),
        }
    }
}

enum Flow {
    Continue,
    /// Cancelled, or the consumer dropped the line receiver.
    Halt,
}

enum Rotation {
    None,
    Gone,
    Replaced,
    Truncated,
}

struct Tailer {
    path: PathBuf,
    poll_interval: Duration,
    logger: Arc<dyn TailLogger>,
    tx: mpsc::Sender<LineResult>,
    state: Arc<StateCell>,
    reopens: Arc<AtomicU64>,
    cancel: CancellationToken,
    current: Option<OpenFile>,
    /// Bytes of a line whose newline has not arrived yet.
    pending: Vec<u8>,
    read_buf: Vec<u8>,
    /// Suppresses repeated reports while the same open keeps failing.
    open_failing: bool,
}

impl Tailer {
    async fn run(mut self) -> Result<(), TailError> {
        // Existing content is history; only follow what gets appended.
        if let Flow::Halt = self.open(true).await {
            return self.finish();
        }
        if self.current.is_none() {
            self.logger.info(format_args!(
                "Waiting for {} to appear",
                self.path.display()
            ));
        }
        self.state.set(TailState::Watching);

        loop {
            if let Flow::Halt = self.poll_once().await {
                break;
            }
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        self.finish()
    }

    fn finish(&self) -> Result<(), TailError> {
        let interrupted = self.state.get() == TailState::Reopening;
        self.state.set(TailState::Stopped);
        if interrupted {
            return Err(TailError::ReopenInterrupted {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    async fn poll_once(&mut self) -> Flow {
        if self.current.is_none() {
            if let Flow::Halt = self.open(false).await {
                return Flow::Halt;
            }
            if self.current.is_none() {
                return Flow::Continue;
            }
        }

        // Must run before the drain: reading on from a stale offset would
        // deliver the tail end of the new content as a line.
        let overwritten = match self.current.as_mut() {
            Some(open) => open.overwritten().await,
            None => Ok(false),
        };
        match overwritten {
            Ok(true) => return self.reopen(Rotation::Truncated).await,
            Ok(false) => {}
            Err(err) => return self.emit(Err(self.io_error(err))).await,
        }

        if let Flow::Halt = self.drain().await {
            return Flow::Halt;
        }

        let rotation = self.check_rotation().await;
        match rotation {
            Ok(Rotation::None) => Flow::Continue,
            Ok(rotation) => self.reopen(rotation).await,
            Err(err) => self.emit(Err(err)).await,
        }
    }

    /// Try to open the path. Missing files are not an error.
    async fn open(&mut self, seek_to_end: bool) -> Flow {
        let result = async {
            let mut file = File::open(&self.path).await?;
            let meta = file.metadata().await?;
            let mut open = OpenFile {
                file,
                id: FileId::of(&meta),
                offset: 0,
                recent: Vec::new(),
            };
            if seek_to_end && meta.len() > 0 {
                // prime the fingerprint with the last bytes already there
                let keep = meta.len().min(FINGERPRINT_BYTES as u64);
                open.file.seek(SeekFrom::Start(meta.len() - keep)).await?;
                let mut recent = vec![0u8; keep as usize];
                open.file.read_exact(&mut recent).await?;
                open.recent = recent;
                open.offset = meta.len();
            }
            Ok::<_, std::io::Error>(open)
        }
        .await;

        match result {
            Ok(open) => {
                if self.open_failing || self.state.get() == TailState::Reopening {
                    self.logger.info(format_args!(
                        "Successfully reopened {}",
                        self.path.display()
                    ));
                }
                self.open_failing = false;
                self.current = Some(open);
                self.state.set(TailState::Watching);
                Flow::Continue
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Flow::Continue,
            Err(err) => {
                if self.open_failing {
                    return Flow::Continue;
                }
                self.open_failing = true;
                self.logger.error(format_args!(
                    "Unable to open {}: {}",
                    self.path.display(),
                    err
                ));
                self.emit(Err(self.io_error(err))).await
            }
        }
    }

    /// Read everything appended since the last poll and emit complete lines.
    async fn drain(&mut self) -> Flow {
        loop {
            let Some(open) = self.current.as_mut() else {
                return Flow::Continue;
            };
            let read = tokio::select! {
                _ = self.cancel.cancelled() => return Flow::Halt,
                read = open.file.read(&mut self.read_buf) => read,
            };
            match read {
                Ok(0) => return Flow::Continue,
                Ok(n) => {
                    open.offset += n as u64;
                    open.remember(&self.read_buf[..n]);
                    self.pending.extend_from_slice(&self.read_buf[..n]);
                    if let Flow::Halt = self.emit_complete_lines().await {
                        return Flow::Halt;
                    }
                }
                Err(err) => {
                    self.logger.error(format_args!(
                        "Error reading {}: {}",
                        self.path.display(),
                        err
                    ));
                    return self.emit(Err(self.io_error(err))).await;
                }
            }
        }
    }

    async fn emit_complete_lines(&mut self) -> Flow {
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Flow::Halt = self.emit(Ok(strip_newline(raw))).await {
                return Flow::Halt;
            }
        }
        if self.pending.len() >= MAX_LINE_BYTES {
            self.logger.error(format_args!(
                "Line in {} exceeds {} bytes without a newline; delivering it as is",
                self.path.display(),
                MAX_LINE_BYTES
            ));
            let raw = std::mem::take(&mut self.pending);
            return self.emit(Ok(raw)).await;
        }
        Flow::Continue
    }

    async fn check_rotation(&self) -> Result<Rotation, TailError> {
        let Some(open) = self.current.as_ref() else {
            return Ok(Rotation::None);
        };
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if FileId::of(&meta) != open.id => Ok(Rotation::Replaced),
            Ok(meta) if meta.len() < open.offset => Ok(Rotation::Truncated),
            Ok(_) => Ok(Rotation::None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Rotation::Gone),
            Err(err) => Err(self.io_error(err)),
        }
    }

    async fn reopen(&mut self, rotation: Rotation) -> Flow {
        let why = match rotation {
            Rotation::Gone => "moved or deleted",
            Rotation::Replaced => "replaced",
            Rotation::Truncated => "truncated",
            Rotation::None => return Flow::Continue,
        };
        self.state.set(TailState::Reopening);
        self.reopens.fetch_add(1, Ordering::Relaxed);
        self.logger.info(format_args!(
            "Re-opening {} file {}",
            why,
            self.path.display()
        ));

        // A partial line left in the old file will never be completed.
        if !self.pending.is_empty() {
            let raw = std::mem::take(&mut self.pending);
            if let Flow::Halt = self.emit(Ok(raw)).await {
                return Flow::Halt;
            }
        }
        self.current = None;

        if let Flow::Halt = self.open(false).await {
            return Flow::Halt;
        }
        if self.current.is_some() {
            return self.drain().await;
        }
        Flow::Continue
    }

    async fn emit(&self, item: LineResult) -> Flow {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Flow::Halt,
            sent = self.tx.send(item) => match sent {
                Ok(()) => Flow::Continue,
                Err(_) => {
                    self.logger.fatal(format_args!(
                        "Line consumer for {} went away; stopping tailer",
                        self.path.display()
                    ));
                    Flow::Halt
                }
            },
        }
    }

    fn io_error(&self, source: std::io::Error) -> TailError {
        TailError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Only `\n` ends a line; a preceding `\r` stays part of the message.
fn strip_newline(mut raw: Vec<u8>) -> Vec<u8> {
    if raw.last() == Some(&b'\n') {
        raw.pop();
    }
    raw
}

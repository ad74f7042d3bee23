use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::tail::TailState;

/// One row of the health report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileStatus {
    pub filename: String,
    pub state: TailState,
    pub reopens: u64,
}

struct Source {
    filename: String,
    state: watch::Receiver<TailState>,
    reopens: Arc<AtomicU64>,
}

/// Read-only view over every tailer's lifecycle, cheap to clone.
#[derive(Clone, Default)]
pub struct StatusBoard {
    sources: Arc<Vec<Source>>,
}

impl StatusBoard {
    pub(crate) fn new(
        sources: impl IntoIterator<Item = (String, watch::Receiver<TailState>, Arc<AtomicU64>)>,
    ) -> Self {
        let sources = sources
            .into_iter()
            .map(|(filename, state, reopens)| Source {
                filename,
                state,
                reopens,
            })
            .collect();
        Self {
            sources: Arc::new(sources),
        }
    }

    pub fn snapshot(&self) -> Vec<FileStatus> {
        self.sources
            .iter()
            .map(|s| FileStatus {
                filename: s.filename.clone(),
                state: *s.state.borrow(),
                reopens: s.reopens.load(Ordering::Relaxed),
            })
            .collect()
    }

    /// True when every tailer is following its file.
    pub fn all_watching(&self) -> bool {
        self.sources
            .iter()
            .all(|s| *s.state.borrow() == TailState::Watching)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

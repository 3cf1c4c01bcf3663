//! Sequential batch copy with per-item failure reporting.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use fsweave_core::{
    Backend, CancelToken, FsError, FsResult, Location, OverwritePolicy, TransferMode,
    TransferOutcome, TransferProgress, TransferResult,
};

use crate::task::{ProgressEmitter, TaskEngine, TaskEvent, TaskHandle, TaskId};
use crate::transfer::{TransferTask, create_directory};

/// One entry of a batch copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub source: String,
    pub dest: String,
    /// Create `dest` as a directory instead of copying `source`.
    #[serde(default)]
    pub is_directory: bool,
}

impl BatchItem {
    /// A file item.
    pub fn file(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            is_directory: false,
        }
    }

    /// A directory item.
    pub fn directory(source: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dest: dest.into(),
            is_directory: true,
        }
    }
}

/// Per-item events of a batch.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Item `index` is about to run under `token`.
    ItemStarted {
        index: usize,
        source: String,
        dest: String,
        token: CancelToken,
    },
    /// Byte progress of item `index`.
    ItemProgress {
        index: usize,
        progress: TransferProgress,
    },
    /// Item `index` finished.
    ItemFinished { index: usize, result: TransferResult },
}

/// Terminal result of a batch: every item was attempted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failures by item index, in order.
    pub failures: Vec<(usize, FsError)>,
}

impl BatchSummary {
    /// True if no item failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Human-readable one-line summary.
    pub fn summary(&self) -> String {
        if self.failed == 0 {
            format!("{} items succeeded", self.succeeded)
        } else {
            format!("{} items succeeded, {} failed", self.succeeded, self.failed)
        }
    }

    pub(crate) fn record(&mut self, index: usize, result: Result<(), &FsError>) {
        self.attempted += 1;
        match result {
            Ok(()) => self.succeeded += 1,
            Err(err) => {
                self.failed += 1;
                self.failures.push((index, err.clone()));
            }
        }
    }
}

/// Handle of a running batch.
///
/// There is no batch-wide cancel; each item runs under its own token and
/// [`current_token`](Self::current_token) returns the one issued last.
pub struct BatchHandle {
    inner: TaskHandle<BatchEvent, BatchSummary>,
    current: Arc<Mutex<Option<CancelToken>>>,
}

impl BatchHandle {
    pub fn id(&self) -> TaskId {
        self.inner.id()
    }

    /// The most recently issued item token, if any item has started.
    pub fn current_token(&self) -> Option<CancelToken> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Cancel the item currently running. Returns `false` if there is none
    /// or it already finished.
    pub fn cancel_current(&self) -> bool {
        self.current_token().is_some_and(|token| token.cancel())
    }

    pub async fn recv(&mut self) -> Option<TaskEvent<BatchEvent, BatchSummary>> {
        self.inner.recv().await
    }

    pub async fn wait(self) -> FsResult<BatchSummary> {
        self.inner.wait().await
    }

    pub async fn wait_with(self, on_event: impl FnMut(BatchEvent)) -> FsResult<BatchSummary> {
        self.inner.wait_with(on_event).await
    }

    pub fn on_event<F>(self, handler: F) -> JoinHandle<()>
    where
        F: FnMut(TaskEvent<BatchEvent, BatchSummary>) + Send + 'static,
    {
        self.inner.on_event(handler)
    }
}

/// Start a sequential batch copy.
///
/// A failing item is reported through its `ItemFinished` event and the
/// batch moves on; the terminal summary arrives after the last item.
pub fn start_copy_batch<B>(
    engine: &TaskEngine,
    backend: Arc<B>,
    items: Vec<BatchItem>,
    policy: OverwritePolicy,
) -> BatchHandle
where
    B: Backend + ?Sized,
{
    let current = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&current);
    let preserve_metadata = engine.config().preserve_metadata;

    let inner = engine.submit(move |events: ProgressEmitter<BatchEvent>| {
        let mut summary = BatchSummary::default();
        debug!(task_id = %events.task_id(), items = items.len(), "batch started");

        for (index, item) in items.into_iter().enumerate() {
            let token = CancelToken::new();
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
            events.emit(BatchEvent::ItemStarted {
                index,
                source: item.source.clone(),
                dest: item.dest.clone(),
                token: token.clone(),
            });

            let result = run_item(
                backend.as_ref(),
                events.task_id(),
                &item,
                policy,
                preserve_metadata,
                token,
                &mut |progress| {
                    events.emit(BatchEvent::ItemProgress { index, progress });
                },
            );

            if let Err(err) = &result {
                warn!(index, source = %item.source, dest = %item.dest, "batch item failed: {err}");
            }
            summary.record(index, result.as_ref().map(|_| ()));
            events.emit(BatchEvent::ItemFinished { index, result });
        }

        debug!(
            task_id = %events.task_id(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch finished"
        );
        Ok(summary)
    });

    BatchHandle { inner, current }
}

fn run_item<B>(
    backend: &B,
    task_id: TaskId,
    item: &BatchItem,
    policy: OverwritePolicy,
    preserve_metadata: bool,
    token: CancelToken,
    emit: &mut dyn FnMut(TransferProgress),
) -> TransferResult
where
    B: Backend + ?Sized,
{
    let dest = match Location::parse(&item.dest) {
        Ok(dest) => dest,
        Err(err) => {
            token.complete();
            return Err(err);
        }
    };

    if item.is_directory {
        let result = if token.is_cancelled() {
            Err(FsError::Cancelled)
        } else {
            create_directory(backend, &dest, policy)
        };
        token.complete();
        return result.map(|()| TransferOutcome {
            source: item.source.clone(),
            dest: dest.to_string(),
            mode: TransferMode::BatchItem,
            bytes_transferred: 0,
            bytes_total: None,
        });
    }

    let source = match Location::parse(&item.source) {
        Ok(source) => source,
        Err(err) => {
            token.complete();
            return Err(err);
        }
    };

    TransferTask::new(task_id, source, dest, TransferMode::BatchItem, policy, token).run(
        backend,
        preserve_metadata,
        emit,
    )
}

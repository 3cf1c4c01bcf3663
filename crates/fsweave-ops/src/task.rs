//! Background task engine.
//!
//! Every long operation is a blocking closure handed to [`TaskEngine::submit`].
//! The closure runs on tokio's blocking pool; its progress and its single
//! terminal result travel back through one bounded channel, so progress
//! always precedes the terminal event of the same task.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, debug_span, warn};

use fsweave_core::{EngineConfig, FsError, FsResult};

/// Identifier of a submitted task, unique per engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    /// The raw counter value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// An event delivered for one task.
#[derive(Debug)]
pub enum TaskEvent<P, T> {
    /// Intermediate progress.
    Progress(P),
    /// The single terminal result. Nothing follows it.
    Finished(FsResult<T>),
}

impl<P, T> TaskEvent<P, T> {
    /// True for the terminal event.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

/// Progress channel handed to a running task.
///
/// Sending blocks while the task's channel is full, so a slow consumer
/// throttles the worker instead of growing a queue.
pub struct ProgressEmitter<P> {
    id: TaskId,
    send: Box<dyn Fn(P) -> bool + Send>,
}

impl<P> ProgressEmitter<P> {
    /// The task this emitter belongs to.
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    /// Send one progress event. Returns `false` once nobody is listening.
    pub fn emit(&self, progress: P) -> bool {
        (self.send)(progress)
    }
}

/// Runs blocking work off the caller's thread.
///
/// Cloning is cheap; clones share the concurrency limit and the id counter.
#[derive(Clone)]
pub struct TaskEngine {
    handle: Handle,
    permits: Arc<Semaphore>,
    next_id: Arc<AtomicU64>,
    config: Arc<EngineConfig>,
}

impl fmt::Debug for TaskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEngine")
            .field("available_permits", &self.permits.available_permits())
            .field("config", &self.config)
            .finish()
    }
}

impl TaskEngine {
    /// Create an engine that spawns onto `handle`.
    pub fn new(handle: Handle, config: EngineConfig) -> Self {
        Self {
            handle,
            permits: Arc::new(Semaphore::new(config.max_concurrent_tasks.max(1))),
            next_id: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    /// Create an engine on the runtime the caller is running in.
    pub fn current(config: EngineConfig) -> FsResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| FsError::unavailable(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(handle, config))
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The runtime handle tasks are spawned on.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Submit blocking work. Returns immediately.
    ///
    /// `work` receives a [`ProgressEmitter`] and returns the terminal result.
    /// A panic inside `work` becomes a [`FsError::Backend`] terminal result.
    pub fn submit<P, T, F>(&self, work: F) -> TaskHandle<P, T>
    where
        P: Send + 'static,
        T: Send + 'static,
        F: FnOnce(ProgressEmitter<P>) -> FsResult<T> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        let progress_tx = tx.clone();
        let emitter = ProgressEmitter {
            id,
            send: Box::new(move |progress| {
                progress_tx.blocking_send(TaskEvent::Progress(progress)).is_ok()
            }),
        };

        let permits = Arc::clone(&self.permits);
        let span = debug_span!("task", task_id = %id);
        self.handle.spawn(
            async move {
                let result = match permits.acquire_owned().await {
                    Ok(permit) => {
                        debug!("task started");
                        let joined = tokio::task::spawn_blocking(move || work(emitter)).await;
                        drop(permit);
                        match joined {
                            Ok(result) => result,
                            Err(e) if e.is_panic() => {
                                let message = panic_message(e.into_panic());
                                warn!("task panicked: {message}");
                                Err(FsError::backend(format!("{id} panicked: {message}")))
                            }
                            Err(e) => Err(FsError::backend(format!("{id} aborted: {e}"))),
                        }
                    }
                    Err(_) => Err(FsError::unavailable("task engine is shut down")),
                };

                debug!(ok = result.is_ok(), "task finished");
                let _ = tx.send(TaskEvent::Finished(result)).await;
            }
            .instrument(span),
        );

        TaskHandle {
            id,
            rx,
            handle: self.handle.clone(),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Receiving side of one submitted task.
pub struct TaskHandle<P, T> {
    id: TaskId,
    rx: mpsc::Receiver<TaskEvent<P, T>>,
    handle: Handle,
}

impl<P, T> fmt::Debug for TaskHandle<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").field("id", &self.id).finish()
    }
}

impl<P, T> TaskHandle<P, T>
where
    P: Send + 'static,
    T: Send + 'static,
{
    /// The task's id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Next event, or `None` after the terminal event has been taken.
    pub async fn recv(&mut self) -> Option<TaskEvent<P, T>> {
        self.rx.recv().await
    }

    /// Discard progress and wait for the terminal result.
    pub async fn wait(self) -> FsResult<T> {
        self.wait_with(|_| {}).await
    }

    /// Wait for the terminal result, passing every progress event to
    /// `on_progress` in order.
    pub async fn wait_with(mut self, mut on_progress: impl FnMut(P)) -> FsResult<T> {
        while let Some(event) = self.rx.recv().await {
            match event {
                TaskEvent::Progress(progress) => on_progress(progress),
                TaskEvent::Finished(result) => return result,
            }
        }
        Err(FsError::backend(format!(
            "{} ended without a result",
            self.id
        )))
    }

    /// Deliver every event, terminal included, to `handler` on a dedicated
    /// async task. Events of this task reach the handler one at a time.
    pub fn on_event<F>(mut self, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(TaskEvent<P, T>) + Send + 'static,
    {
        self.handle.clone().spawn(async move {
            while let Some(event) = self.rx.recv().await {
                let last = event.is_finished();
                handler(event);
                if last {
                    break;
                }
            }
        })
    }
}

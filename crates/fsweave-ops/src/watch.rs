//! Directory watch registry.
//!
//! One subscription per watched path string. Registering a path again
//! cancels the old subscription before the new one starts, and the old
//! handler never sees another event.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info};

use fsweave_core::{
    Backend, FsError, FsResult, Location, NativeEvent, NativeEventSink, NativeMonitor, WatchEvent,
};

struct Subscription {
    active: Arc<AtomicBool>,
    monitor: Box<dyn NativeMonitor>,
}

impl Subscription {
    /// Clear the active flag; must happen under the registry lock.
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn stop(mut self) {
        self.monitor.cancel();
    }
}

/// Table of active directory watches keyed by the exact path string.
#[derive(Default)]
pub struct WatchRegistry {
    subscriptions: Mutex<HashMap<String, Subscription>>,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("paths", &self.watched_paths())
            .finish()
    }
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Watch `path`, replacing any existing watch on the same string.
    ///
    /// `handler` runs on the backend's notification thread, once per event,
    /// in arrival order. If the backend cannot start a monitor the error is
    /// returned and the path is left unwatched.
    pub fn watch<B, F>(&self, backend: &B, path: &str, handler: F) -> FsResult<()>
    where
        B: Backend + ?Sized,
        F: FnMut(WatchEvent) + Send + 'static,
    {
        let location = Location::parse(path)?;
        let active = Arc::new(AtomicBool::new(true));
        let sink = dispatch_sink(path.to_string(), Arc::clone(&active), handler);

        let (replaced, started) = {
            let mut subscriptions = self.lock();
            let replaced = subscriptions.remove(path);
            if let Some(old) = &replaced {
                old.deactivate();
            }

            let started = backend.watch_directory(&location, sink).map(|monitor| {
                subscriptions.insert(path.to_string(), Subscription { active, monitor });
            });
            (replaced, started)
        };

        if let Some(old) = replaced {
            info!(path, "replacing watch");
            old.stop();
        }
        started?;
        info!(path, "watch registered");
        Ok(())
    }

    /// Watch `path` and receive its events on a channel instead of a callback.
    pub fn watch_channel<B>(
        &self,
        backend: &B,
        path: &str,
    ) -> FsResult<mpsc::UnboundedReceiver<WatchEvent>>
    where
        B: Backend + ?Sized,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        self.watch(backend, path, move |event| {
            let _ = tx.send(event);
        })?;
        Ok(rx)
    }

    /// Stop watching `path`. Fails with `NotFound` if it is not watched.
    pub fn unwatch(&self, path: &str) -> FsResult<()> {
        let removed = {
            let mut subscriptions = self.lock();
            let removed = subscriptions.remove(path);
            if let Some(subscription) = &removed {
                subscription.deactivate();
            }
            removed
        };

        match removed {
            Some(subscription) => {
                subscription.stop();
                info!(path, "watch removed");
                Ok(())
            }
            None => Err(FsError::not_found(path)),
        }
    }

    /// Stop every watch.
    pub fn unwatch_all(&self) {
        let drained: Vec<_> = {
            let mut subscriptions = self.lock();
            subscriptions
                .drain()
                .inspect(|(_, subscription)| subscription.deactivate())
                .collect()
        };

        for (path, subscription) in drained {
            subscription.stop();
            debug!(path = %path, "watch removed");
        }
    }

    pub fn is_watching(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    /// Watched path strings, sorted.
    pub fn watched_paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.lock().keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Drop for WatchRegistry {
    fn drop(&mut self) {
        self.unwatch_all();
    }
}

/// Wrap `handler` so it only runs while its subscription is active.
fn dispatch_sink<F>(watched_path: String, active: Arc<AtomicBool>, handler: F) -> NativeEventSink
where
    F: FnMut(WatchEvent) + Send + 'static,
{
    let handler = Mutex::new(handler);
    Arc::new(move |native: NativeEvent| {
        if !active.load(Ordering::Acquire) {
            return;
        }
        let event = WatchEvent {
            event_kind: native.kind,
            affected_path: native.path,
            other_path: native.other_path,
            watched_path: watched_path.clone(),
        };

        let mut handler = handler.lock().unwrap_or_else(PoisonError::into_inner);
        if active.load(Ordering::Acquire) {
            (*handler)(event);
        }
    })
}

//! Native directory monitors backed by `notify`.

use std::path::{Path, PathBuf};

use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{trace, warn};

use fsweave_core::{FsError, FsResult, NativeEvent, NativeEventSink, NativeMonitor, WatchEventKind};

/// A running `notify` watcher on one directory.
pub struct NotifyMonitor {
    watcher: Option<RecommendedWatcher>,
    path: PathBuf,
}

impl NativeMonitor for NotifyMonitor {
    fn cancel(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.unwatch(&self.path);
            trace!(path = %self.path.display(), "monitor cancelled");
        }
    }
}

impl Drop for NotifyMonitor {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Start a non-recursive watch on `path`.
pub fn watch_directory(path: &Path, sink: NativeEventSink) -> FsResult<NotifyMonitor> {
    let meta = std::fs::metadata(path).map_err(|e| FsError::io(path.display(), e))?;
    if !meta.is_dir() {
        return Err(FsError::invalid(format!(
            "{}: not a directory",
            path.display()
        )));
    }

    let watched = path.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
        match result {
            Ok(event) => {
                for native in translate(&watched, event) {
                    sink(native);
                }
            }
            Err(err) => {
                warn!(path = %watched.display(), "watcher error: {err}");
                sink(NativeEvent::new(
                    WatchEventKind::Unknown,
                    watched.display().to_string(),
                ));
            }
        }
    })
    .map_err(|e| FsError::backend(format!("{}: {e}", path.display())))?;

    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|e| FsError::backend(format!("{}: {e}", path.display())))?;

    Ok(NotifyMonitor {
        watcher: Some(watcher),
        path: path.to_path_buf(),
    })
}

/// Classify one `notify` event. Open and read access is not reported.
fn classify(kind: &EventKind) -> Option<WatchEventKind> {
    let kind = match kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Remove(_) => WatchEventKind::Deleted,
        EventKind::Modify(ModifyKind::Data(_)) => WatchEventKind::Changed,
        EventKind::Modify(ModifyKind::Metadata(_)) => WatchEventKind::AttributesChanged,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::MovedOut,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::MovedIn,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => WatchEventKind::Renamed,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => WatchEventKind::ChangesDoneHint,
        EventKind::Access(_) => return None,
        _ => WatchEventKind::Unknown,
    };
    Some(kind)
}

fn translate(watched: &Path, event: Event) -> Vec<NativeEvent> {
    let Some(kind) = classify(&event.kind) else {
        return Vec::new();
    };
    let mut paths = event.paths.into_iter().map(|p| p.display().to_string());

    if kind == WatchEventKind::Renamed {
        let from = paths
            .next()
            .unwrap_or_else(|| watched.display().to_string());
        return vec![NativeEvent {
            kind,
            path: from,
            other_path: paths.next(),
        }];
    }

    let events: Vec<_> = paths.map(|path| NativeEvent::new(kind, path)).collect();
    if events.is_empty() {
        vec![NativeEvent::new(kind, watched.display().to_string())]
    } else {
        events
    }
}

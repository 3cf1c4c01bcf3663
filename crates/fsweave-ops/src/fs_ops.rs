//! Single-entry queries and mutations.
//!
//! These run on the caller's thread; wrap them in [`TaskEngine::submit`]
//! when the backend may be slow. Deleting many entries has its own
//! background variant, [`start_delete_batch`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fsweave_core::{
    AppDescriptor, Backend, FileRecord, FilesystemUsage, FsError, FsResult, Location, RawFileType,
};
use fsweave_scan::build_record;

use crate::batch::BatchSummary;
use crate::task::{ProgressEmitter, TaskEngine, TaskHandle};

/// Full record of one entry, including owner, group and mode bits.
/// Symlinks are described, not followed.
pub fn stat<B>(backend: &B, path: &str) -> FsResult<FileRecord>
where
    B: Backend + ?Sized,
{
    let location = Location::parse(path)?;
    let raw = backend.query_info(&location, false)?;
    let parent = location.parent().unwrap_or_else(|| location.clone());

    let mut record = build_record(&parent, raw);
    record.absolute_path = location.to_string();
    Ok(record)
}

/// True if the entry exists. A dangling symlink exists.
pub fn exists<B>(backend: &B, path: &str) -> FsResult<bool>
where
    B: Backend + ?Sized,
{
    backend.exists(&Location::parse(path)?)
}

/// True if the entry is a directory, following symlinks.
pub fn is_dir<B>(backend: &B, path: &str) -> FsResult<bool>
where
    B: Backend + ?Sized,
{
    match backend.query_info(&Location::parse(path)?, true) {
        Ok(info) => Ok(info.file_type == RawFileType::Directory),
        Err(FsError::NotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Number of immediate children of a directory.
pub fn count_children<B>(backend: &B, path: &str) -> FsResult<usize>
where
    B: Backend + ?Sized,
{
    fsweave_scan::count_children(backend, &Location::parse(path)?)
}

/// Create a directory and any missing parents.
pub fn make_directory<B>(backend: &B, path: &str) -> FsResult<()>
where
    B: Backend + ?Sized,
{
    let location = Location::parse(path)?;
    backend.make_directory_with_parents(&location)?;
    debug!(path, "directory created");
    Ok(())
}

/// Delete one entry, or move it to the trash.
///
/// Without the trash a non-empty directory is refused by the backend.
pub fn delete<B>(backend: &B, path: &str, use_trash: bool) -> FsResult<()>
where
    B: Backend + ?Sized,
{
    let location = Location::parse(path)?;
    if use_trash {
        backend.trash(&location)?;
    } else {
        backend.delete(&location)?;
    }
    debug!(path, use_trash, "deleted");
    Ok(())
}

/// Set or clear the executable bits.
pub fn set_executable<B>(backend: &B, path: &str, executable: bool) -> FsResult<()>
where
    B: Backend + ?Sized,
{
    backend.set_executable(&Location::parse(path)?, executable)
}

/// Capacity of the filesystem containing `path`.
pub fn disk_usage<B>(backend: &B, path: &str) -> FsResult<FilesystemUsage>
where
    B: Backend + ?Sized,
{
    backend.filesystem_usage(&Location::parse(path)?)
}

/// Default application for the content type of `path`.
///
/// `Ok(None)` when the type is unknown or nothing is registered for it.
pub fn default_handler<B>(backend: &B, path: &str) -> FsResult<Option<AppDescriptor>>
where
    B: Backend + ?Sized,
{
    let info = backend.query_info(&Location::parse(path)?, true)?;
    match info.content_type {
        Some(content_type) => backend.default_handler(&content_type),
        None => Ok(None),
    }
}

/// Outcome of one entry of a delete batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub index: usize,
    pub path: String,
    pub result: Result<(), FsError>,
}

/// Handle of a running delete batch.
pub type DeleteHandle = TaskHandle<DeleteEvent, BatchSummary>;

/// Delete `paths` one after another in the background.
///
/// Every path is attempted; failures are reported per entry and collected
/// in the summary.
pub fn start_delete_batch<B>(
    engine: &TaskEngine,
    backend: Arc<B>,
    paths: Vec<String>,
    use_trash: bool,
) -> DeleteHandle
where
    B: Backend + ?Sized,
{
    engine.submit(move |events: ProgressEmitter<DeleteEvent>| {
        let mut summary = BatchSummary::default();

        for (index, path) in paths.into_iter().enumerate() {
            let result = delete(backend.as_ref(), &path, use_trash);
            if let Err(err) = &result {
                warn!(index, path = %path, "delete failed: {err}");
            }
            summary.record(index, result.as_ref().copied());
            events.emit(DeleteEvent {
                index,
                path,
                result,
            });
        }

        Ok(summary)
    })
}

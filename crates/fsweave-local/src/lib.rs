//! Local-disk backend for fsweave.
//!
//! [`LocalBackend`] implements [`Backend`] with `std::fs` for metadata and
//! transfers, `notify` for directory monitors, `sysinfo` and `/dev/disk`
//! for volumes and mounts, `trash` for recoverable deletes, and the XDG
//! `mimeapps.list` files for default applications.
//!
//! Only plain paths and `file://` URIs are served; any other scheme is a
//! backend error.

mod apps;
mod content_type;
mod copy;
mod info;
mod volumes;
mod watch;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use fsweave_core::{
    AppDescriptor, Backend, CancelToken, CopyFlags, EngineConfig, FilesystemUsage, FsError,
    FsResult, Location, NativeEventSink, NativeMonitor, ProgressSink, RawEntries, RawInfo,
    RawMount, RawVolume,
};

pub use content_type::guess as guess_content_type;
pub use watch::NotifyMonitor;

/// Backend serving the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    copy_buffer_size: usize,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl LocalBackend {
    /// Create a backend using the copy chunk size from `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            copy_buffer_size: config.copy_buffer_size.max(1),
        }
    }

    /// Copy chunk size; one chunk is one progress tick.
    pub fn copy_buffer_size(&self) -> usize {
        self.copy_buffer_size
    }
}

/// The local path behind `location`.
fn local_path(location: &Location) -> FsResult<PathBuf> {
    location.to_local_path().ok_or_else(|| {
        FsError::backend(format!(
            "{location}: scheme '{}' is not supported by the local backend",
            location.scheme().unwrap_or_default()
        ))
    })
}

impl Backend for LocalBackend {
    fn query_info(&self, location: &Location, follow_symlinks: bool) -> FsResult<RawInfo> {
        let path = local_path(location)?;
        let mut info = info::query_detailed(&path, follow_symlinks)?;
        info.filesystem_type = volumes::filesystem_type(&path);
        Ok(info)
    }

    fn exists(&self, location: &Location) -> FsResult<bool> {
        let path = local_path(location)?;
        match fs::symlink_metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(FsError::io(path.display(), e)),
        }
    }

    fn enumerate_children(
        &self,
        location: &Location,
        follow_symlinks: bool,
    ) -> FsResult<RawEntries<'_>> {
        let path = local_path(location)?;
        let entries = fs::read_dir(&path).map_err(|e| FsError::io(path.display(), e))?;
        let filesystem_type = volumes::filesystem_type(&path);

        let iter = entries.filter_map(move |entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => return Some(Err(FsError::io(path.display(), e))),
            };
            match info::query(&entry.path(), follow_symlinks) {
                Ok(mut info) => {
                    info.filesystem_type = filesystem_type.clone();
                    Some(Ok(info))
                }
                // Removed between readdir and stat.
                Err(FsError::NotFound { path: vanished }) => {
                    trace!(path = %vanished, "entry vanished during enumeration");
                    None
                }
                Err(e) => Some(Err(e)),
            }
        });
        Ok(Box::new(iter))
    }

    fn copy(
        &self,
        source: &Location,
        dest: &Location,
        flags: CopyFlags,
        cancel: &CancelToken,
        progress: ProgressSink<'_>,
    ) -> FsResult<()> {
        let source = local_path(source)?;
        let dest = local_path(dest)?;
        if cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let total = fs::metadata(&source).map(|meta| meta.len()).unwrap_or(0);
        let mut progress = copy::Progress::new(total, progress);
        copy::copy_file(
            &source,
            &dest,
            flags,
            self.copy_buffer_size,
            cancel,
            &mut progress,
        )
    }

    fn move_to(
        &self,
        source: &Location,
        dest: &Location,
        flags: CopyFlags,
        cancel: &CancelToken,
        progress: ProgressSink<'_>,
    ) -> FsResult<()> {
        let source = local_path(source)?;
        let dest = local_path(dest)?;
        copy::move_entry(
            &source,
            &dest,
            flags,
            self.copy_buffer_size,
            cancel,
            progress,
        )
    }

    fn make_directory_with_parents(&self, location: &Location) -> FsResult<()> {
        let path = local_path(location)?;
        if fs::symlink_metadata(&path).is_ok() {
            return Err(FsError::already_exists(path.display()));
        }
        fs::create_dir_all(&path).map_err(|e| FsError::io(path.display(), e))
    }

    fn make_symlink(&self, location: &Location, target: &Path) -> FsResult<()> {
        let path = local_path(location)?;
        copy::make_symlink(target, &path)
    }

    fn delete(&self, location: &Location) -> FsResult<()> {
        let path = local_path(location)?;
        let meta = fs::symlink_metadata(&path).map_err(|e| FsError::io(path.display(), e))?;
        let removed = if meta.is_dir() {
            fs::remove_dir(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| FsError::io(path.display(), e))
    }

    fn trash(&self, location: &Location) -> FsResult<()> {
        let path = local_path(location)?;
        fs::symlink_metadata(&path).map_err(|e| FsError::io(path.display(), e))?;
        trash::delete(&path).map_err(|e| FsError::backend(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "moved to trash");
        Ok(())
    }

    #[cfg(unix)]
    fn set_executable(&self, location: &Location, executable: bool) -> FsResult<()> {
        use std::os::unix::fs::PermissionsExt;

        const EXECUTE_BITS: u32 = 0o111;

        let path = local_path(location)?;
        let meta = fs::metadata(&path).map_err(|e| FsError::io(path.display(), e))?;
        let mode = meta.permissions().mode();
        let mode = if executable {
            mode | EXECUTE_BITS
        } else {
            mode & !EXECUTE_BITS
        };
        fs::set_permissions(&path, fs::Permissions::from_mode(mode))
            .map_err(|e| FsError::io(path.display(), e))
    }

    fn watch_directory(
        &self,
        location: &Location,
        sink: NativeEventSink,
    ) -> FsResult<Box<dyn NativeMonitor>> {
        let path = local_path(location)?;
        let monitor = watch::watch_directory(&path, sink)?;
        Ok(Box::new(monitor))
    }

    fn list_volumes(&self) -> FsResult<Vec<RawVolume>> {
        volumes::list_volumes()
    }

    fn list_mounts(&self) -> FsResult<Vec<RawMount>> {
        volumes::list_mounts()
    }

    fn filesystem_usage(&self, location: &Location) -> FsResult<FilesystemUsage> {
        volumes::usage(&local_path(location)?)
    }

    fn default_handler(&self, content_type: &str) -> FsResult<Option<AppDescriptor>> {
        Ok(apps::default_for(content_type))
    }
}

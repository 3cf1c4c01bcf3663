//! Chunked copies and moves with progress and cancellation.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use filetime::FileTime;
use tracing::{debug, trace};

use fsweave_core::{CancelToken, CopyFlags, FsError, FsResult};

/// Running byte count shared by every file of one operation.
pub struct Progress<'a> {
    copied: u64,
    total: u64,
    sink: &'a mut dyn FnMut(u64, u64),
}

impl<'a> Progress<'a> {
    pub fn new(total: u64, sink: &'a mut dyn FnMut(u64, u64)) -> Self {
        Self {
            copied: 0,
            total,
            sink,
        }
    }

    fn advance(&mut self, bytes: u64) {
        self.copied += bytes;
        (self.sink)(self.copied, self.total);
    }
}

/// Copy one regular file in `buffer_size` chunks.
///
/// The token is checked before every chunk; a cancelled or failed copy
/// removes the partial destination. Copying a file onto itself, including
/// through another hard link, is refused before anything is opened.
pub fn copy_file(
    source: &Path,
    dest: &Path,
    flags: CopyFlags,
    buffer_size: usize,
    cancel: &CancelToken,
    progress: &mut Progress<'_>,
) -> FsResult<()> {
    let meta = fs::metadata(source).map_err(|e| FsError::io(source.display(), e))?;
    if meta.is_dir() {
        return Err(FsError::backend(format!(
            "{}: is a directory",
            source.display()
        )));
    }

    if is_same_file(source, &meta, dest) {
        return Err(FsError::invalid(format!(
            "{}: can't copy file over itself",
            dest.display()
        )));
    }

    let mut reader = File::open(source).map_err(|e| FsError::io(source.display(), e))?;
    let mut writer = open_dest(dest, flags.overwrite)?;

    let result = pump(&mut reader, &mut writer, buffer_size, cancel, progress)
        .and_then(|()| writer.flush().map_err(|e| FsError::io(dest.display(), e)));
    drop(writer);

    if let Err(err) = result {
        let _ = fs::remove_file(dest);
        debug!(dest = %dest.display(), "removed partial copy: {err}");
        return Err(err);
    }

    if flags.preserve_metadata {
        preserve(&meta, dest)?;
    }
    Ok(())
}

#[cfg(unix)]
fn is_same_file(_source: &Path, source_meta: &fs::Metadata, dest: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    fs::metadata(dest)
        .is_ok_and(|meta| meta.dev() == source_meta.dev() && meta.ino() == source_meta.ino())
}

#[cfg(not(unix))]
fn is_same_file(source: &Path, _source_meta: &fs::Metadata, dest: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(dest)) {
        (Ok(source), Ok(dest)) => source == dest,
        _ => false,
    }
}

fn open_dest(dest: &Path, overwrite: bool) -> FsResult<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        if fs::symlink_metadata(dest).is_ok_and(|meta| meta.is_dir()) {
            return Err(FsError::backend(format!(
                "{}: cannot overwrite a directory with a file",
                dest.display()
            )));
        }
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options.open(dest).map_err(|e| FsError::io(dest.display(), e))
}

fn pump(
    reader: &mut File,
    writer: &mut File,
    buffer_size: usize,
    cancel: &CancelToken,
    progress: &mut Progress<'_>,
) -> FsResult<()> {
    let mut buffer = vec![0u8; buffer_size.max(1)];
    loop {
        if cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }
        let read = match reader.read(&mut buffer) {
            Ok(0) => return Ok(()),
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FsError::backend(format!("read failed: {e}"))),
        };
        writer
            .write_all(&buffer[..read])
            .map_err(|e| FsError::backend(format!("write failed: {e}")))?;
        progress.advance(read as u64);
    }
}

fn preserve(meta: &fs::Metadata, dest: &Path) -> FsResult<()> {
    fs::set_permissions(dest, meta.permissions()).map_err(|e| FsError::io(dest.display(), e))?;
    let mtime = FileTime::from_last_modification_time(meta);
    let atime = FileTime::from_last_access_time(meta);
    filetime::set_file_times(dest, atime, mtime).map_err(|e| FsError::io(dest.display(), e))
}

/// Move an entry: rename when possible, copy and delete across devices.
pub fn move_entry(
    source: &Path,
    dest: &Path,
    flags: CopyFlags,
    buffer_size: usize,
    cancel: &CancelToken,
    sink: &mut dyn FnMut(u64, u64),
) -> FsResult<()> {
    if cancel.is_cancelled() {
        return Err(FsError::Cancelled);
    }
    let meta = fs::symlink_metadata(source).map_err(|e| FsError::io(source.display(), e))?;
    if !flags.overwrite && fs::symlink_metadata(dest).is_ok() {
        return Err(FsError::already_exists(dest.display()));
    }

    match fs::rename(source, dest) {
        Ok(()) => {
            trace!(source = %source.display(), dest = %dest.display(), "renamed");
            return Ok(());
        }
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            debug!(source = %source.display(), "cross-device move, copying");
        }
        Err(e) => return Err(FsError::io(source.display(), e)),
    }

    let mut progress = Progress::new(tree_size(source), sink);
    copy_tree(source, &meta, dest, flags, buffer_size, cancel, &mut progress)?;

    let removed = if meta.is_dir() {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    };
    removed.map_err(|e| FsError::io(source.display(), e))
}

/// Copy an entry and, for directories, everything below it.
fn copy_tree(
    source: &Path,
    meta: &fs::Metadata,
    dest: &Path,
    flags: CopyFlags,
    buffer_size: usize,
    cancel: &CancelToken,
    progress: &mut Progress<'_>,
) -> FsResult<()> {
    if meta.file_type().is_symlink() {
        let target = fs::read_link(source).map_err(|e| FsError::io(source.display(), e))?;
        return make_symlink(&target, dest);
    }
    if !meta.is_dir() {
        return copy_file(source, dest, flags, buffer_size, cancel, progress);
    }

    fs::create_dir_all(dest).map_err(|e| FsError::io(dest.display(), e))?;
    let entries = fs::read_dir(source).map_err(|e| FsError::io(source.display(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| FsError::io(source.display(), e))?;
        let child_meta = entry
            .metadata()
            .map_err(|e| FsError::io(entry.path().display(), e))?;
        copy_tree(
            &entry.path(),
            &child_meta,
            &dest.join(entry.file_name()),
            flags,
            buffer_size,
            cancel,
            progress,
        )?;
    }

    if flags.preserve_metadata {
        preserve(meta, dest)?;
    }
    Ok(())
}

/// Total bytes of regular files at or below `path`, not following links.
fn tree_size(path: &Path) -> u64 {
    let Ok(meta) = fs::symlink_metadata(path) else {
        return 0;
    };
    if !meta.is_dir() {
        return if meta.is_file() { meta.len() } else { 0 };
    }
    fs::read_dir(path)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| tree_size(&entry.path()))
                .sum()
        })
        .unwrap_or(0)
}

#[cfg(unix)]
pub fn make_symlink(target: &Path, link: &Path) -> FsResult<()> {
    std::os::unix::fs::symlink(target, link).map_err(|e| FsError::io(link.display(), e))
}

#[cfg(windows)]
pub fn make_symlink(target: &Path, link: &Path) -> FsResult<()> {
    let result = if target.is_dir() {
        std::os::windows::fs::symlink_dir(target, link)
    } else {
        std::os::windows::fs::symlink_file(target, link)
    };
    result.map_err(|e| FsError::io(link.display(), e))
}

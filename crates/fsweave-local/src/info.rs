//! Metadata queries against the local disk.

use std::fs::{self, Metadata};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use fsweave_core::{FsError, FsResult, RawFileType, RawInfo};

use crate::content_type;

/// Query one entry. Symlinks are always flagged; `follow` selects whether
/// type, size and times describe the link or its target. A dangling link
/// falls back to the link itself.
pub fn query(path: &Path, follow: bool) -> FsResult<RawInfo> {
    let link_meta = fs::symlink_metadata(path).map_err(|e| FsError::io(path.display(), e))?;
    let is_symlink = link_meta.file_type().is_symlink();

    let meta = if follow && is_symlink {
        fs::metadata(path).unwrap_or(link_meta)
    } else {
        link_meta
    };

    let mut info = RawInfo::new(entry_name(path), file_type(&meta));
    info.is_symlink = is_symlink;
    info.is_hidden = Some(info.name.starts_with('.'));
    info.size = i64::try_from(meta.len()).unwrap_or(-1);
    info.mtime = meta.modified().ok().and_then(epoch_seconds);
    info.atime = meta.accessed().ok().and_then(epoch_seconds);
    info.ctime = meta.created().ok().and_then(epoch_seconds);
    info.content_type = content_type_of(path, &info).map(str::to_string);

    if is_symlink {
        info.symlink_target = fs::read_link(path)
            .ok()
            .map(|target| target.to_string_lossy().into_owned());
    }

    fill_access(path, &meta, &mut info);
    Ok(info)
}

/// Query one entry and add owner, group and mode bits.
pub fn query_detailed(path: &Path, follow: bool) -> FsResult<RawInfo> {
    let mut info = query(path, follow)?;
    fill_ownership(path, follow, &mut info);
    Ok(info)
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_type(meta: &Metadata) -> RawFileType {
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        RawFileType::Symlink
    } else if file_type.is_dir() {
        RawFileType::Directory
    } else if file_type.is_file() {
        RawFileType::Regular
    } else {
        RawFileType::Special
    }
}

fn content_type_of(path: &Path, info: &RawInfo) -> Option<&'static str> {
    match info.file_type {
        RawFileType::Directory => Some(content_type::DIRECTORY),
        RawFileType::Symlink => Some(content_type::SYMLINK),
        RawFileType::Regular => content_type::guess(path),
        RawFileType::Special | RawFileType::Unknown => None,
    }
}

fn epoch_seconds(time: SystemTime) -> Option<i64> {
    let seconds = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).ok()?,
        Err(before) => -i64::try_from(before.duration().as_secs()).ok()?,
    };
    Some(seconds)
}

#[cfg(unix)]
fn fill_access(path: &Path, _meta: &Metadata, info: &mut RawInfo) {
    use nix::unistd::{AccessFlags, access};

    info.can_read = Some(access(path, AccessFlags::R_OK).is_ok());
    info.can_write = Some(access(path, AccessFlags::W_OK).is_ok());
    info.can_execute = Some(access(path, AccessFlags::X_OK).is_ok());
}

#[cfg(not(unix))]
fn fill_access(_path: &Path, meta: &Metadata, info: &mut RawInfo) {
    info.can_read = Some(true);
    info.can_write = Some(!meta.permissions().readonly());
    info.can_execute = Some(meta.is_dir());
}

#[cfg(unix)]
fn fill_ownership(path: &Path, follow: bool, info: &mut RawInfo) {
    use std::os::unix::fs::MetadataExt;

    use nix::unistd::{Gid, Group, Uid, User};

    let meta = if follow {
        fs::metadata(path).or_else(|_| fs::symlink_metadata(path))
    } else {
        fs::symlink_metadata(path)
    };
    let Ok(meta) = meta else {
        return;
    };

    info.unix_mode = Some(meta.mode());
    info.owner = User::from_uid(Uid::from_raw(meta.uid()))
        .ok()
        .flatten()
        .map(|user| user.name)
        .or_else(|| Some(meta.uid().to_string()));
    info.group = Group::from_gid(Gid::from_raw(meta.gid()))
        .ok()
        .flatten()
        .map(|group| group.name)
        .or_else(|| Some(meta.gid().to_string()));
}

#[cfg(not(unix))]
fn fill_ownership(_path: &Path, _follow: bool, _info: &mut RawInfo) {}

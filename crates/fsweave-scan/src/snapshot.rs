//! Raw attributes to normalized records.

use compact_str::CompactString;

use fsweave_core::{FileKind, FileRecord, Location, RawFileType, RawInfo};

/// Filesystem type reported when the backend has none.
const UNKNOWN_FILESYSTEM: &str = "unknown";

/// Build a [`FileRecord`] for one entry of `parent`.
///
/// Optional attributes the backend did not report stay unset. The only
/// fallbacks are the ones a listing needs to be usable: the display name
/// falls back to the name, hidden falls back to the dot-file convention,
/// access flags fall back to `false`, and the filesystem type to
/// `"unknown"`.
pub fn build_record(parent: &Location, raw: RawInfo) -> FileRecord {
    let kind = resolve_kind(&raw);
    let absolute_path = parent.child(&raw.name).to_string();
    let is_hidden = raw.is_hidden.unwrap_or_else(|| raw.name.starts_with('.'));
    let display_name = raw
        .display_name
        .map(CompactString::from)
        .unwrap_or_else(|| CompactString::from(raw.name.as_str()));

    FileRecord {
        name: raw.name.into(),
        display_name,
        absolute_path,
        parent_path: parent.to_string(),
        kind,
        is_hidden,
        content_type: raw.content_type,
        size_bytes: raw.size,
        mtime: raw.mtime,
        atime: raw.atime,
        ctime: raw.ctime,
        can_read: raw.can_read.unwrap_or(false),
        can_write: raw.can_write.unwrap_or(false),
        can_execute: raw.can_execute.unwrap_or(false),
        filesystem_type: raw
            .filesystem_type
            .map(CompactString::from)
            .unwrap_or_else(|| CompactString::const_new(UNKNOWN_FILESYSTEM)),
        symlink_target: raw.symlink_target,
        owner: raw.owner,
        group: raw.group,
        unix_mode: raw.unix_mode,
    }
}

/// A symlink flag wins over the followed type.
fn resolve_kind(raw: &RawInfo) -> FileKind {
    if raw.is_symlink {
        return FileKind::Symlink;
    }
    match raw.file_type {
        RawFileType::Regular => FileKind::File,
        RawFileType::Directory => FileKind::Directory,
        RawFileType::Symlink => FileKind::Symlink,
        RawFileType::Special | RawFileType::Unknown => FileKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> Location {
        Location::parse("/tmp/a").unwrap()
    }

    #[test]
    fn test_missing_attributes_stay_unset() {
        let record = build_record(&parent(), RawInfo::new("x.txt", RawFileType::Regular));

        assert_eq!(record.kind, FileKind::File);
        assert_eq!(record.display_name, "x.txt");
        assert_eq!(record.absolute_path, "/tmp/a/x.txt");
        assert_eq!(record.parent_path, "/tmp/a");
        assert_eq!(record.content_type, None);
        assert_eq!(record.mtime, None);
        assert_eq!(record.atime, None);
        assert_eq!(record.ctime, None);
        assert_eq!(record.size_bytes, -1);
        assert_eq!(record.size(), None);
        assert_eq!(record.filesystem_type, "unknown");
        assert!(!record.can_read);
    }

    #[test]
    fn test_all_attributes_carried_over() {
        let mut raw = RawInfo::new("report.pdf", RawFileType::Regular).with_size(4096);
        raw.display_name = Some("Report.pdf".to_string());
        raw.is_hidden = Some(true);
        raw.content_type = Some("application/pdf".to_string());
        raw.mtime = Some(10);
        raw.atime = Some(20);
        raw.ctime = Some(30);
        raw.can_read = Some(true);
        raw.can_write = Some(true);
        raw.can_execute = Some(false);
        raw.filesystem_type = Some("btrfs".to_string());

        let record = build_record(&parent(), raw);
        assert_eq!(record.display_name, "Report.pdf");
        assert!(record.is_hidden);
        assert_eq!(record.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(record.size(), Some(4096));
        assert_eq!((record.mtime, record.atime, record.ctime), (Some(10), Some(20), Some(30)));
        assert!(record.can_read && record.can_write && !record.can_execute);
        assert_eq!(record.filesystem_type, "btrfs");
    }

    #[test]
    fn test_dotfile_is_hidden_when_unreported() {
        let record = build_record(&parent(), RawInfo::new(".bashrc", RawFileType::Regular));
        assert!(record.is_hidden);
    }

    #[test]
    fn test_followed_symlink_is_still_a_symlink() {
        let mut raw = RawInfo::new("link", RawFileType::Directory);
        raw.is_symlink = true;
        raw.symlink_target = Some("/etc".to_string());

        let record = build_record(&parent(), raw);
        assert_eq!(record.kind, FileKind::Symlink);
        assert_eq!(record.symlink_target.as_deref(), Some("/etc"));
    }

    #[test]
    fn test_special_files_are_other() {
        let record = build_record(&parent(), RawInfo::new("fifo", RawFileType::Special));
        assert_eq!(record.kind, FileKind::Other);
    }

    #[test]
    fn test_uri_parent_builds_uri_paths() {
        let parent = Location::parse("sftp://host/home/user").unwrap();
        let record = build_record(&parent, RawInfo::new("notes.md", RawFileType::Regular));
        assert_eq!(record.absolute_path, "sftp://host/home/user/notes.md");
        assert_eq!(record.parent_path, "sftp://host/home/user");
    }
}

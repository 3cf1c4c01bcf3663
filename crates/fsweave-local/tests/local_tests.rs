use std::fs;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use fsweave_core::{
    Backend, CancelToken, CopyFlags, EngineConfig, FsError, Location, NativeEvent, RawFileType,
    WatchEventKind,
};
use fsweave_local::LocalBackend;
use tempfile::TempDir;

fn location(path: &std::path::Path) -> Location {
    Location::from_path(path)
}

fn small_chunks() -> LocalBackend {
    let config = EngineConfig::builder()
        .copy_buffer_size(100usize)
        .build()
        .unwrap();
    LocalBackend::new(&config)
}

#[test]
fn test_enumerate_children_reports_every_entry() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("x.txt"), b"0123456789").unwrap();
    fs::create_dir(temp.path().join("y")).unwrap();

    let backend = LocalBackend::default();
    let mut entries: Vec<_> = backend
        .enumerate_children(&location(temp.path()), false)
        .unwrap()
        .map(Result::unwrap)
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "x.txt");
    assert_eq!(entries[0].file_type, RawFileType::Regular);
    assert_eq!(entries[0].size, 10);
    assert_eq!(entries[1].name, "y");
    assert_eq!(entries[1].file_type, RawFileType::Directory);
}

#[test]
fn test_enumerate_missing_directory_fails_to_open() {
    let temp = TempDir::new().unwrap();
    let backend = LocalBackend::default();
    let result = backend.enumerate_children(&location(&temp.path().join("nope")), false);
    assert!(matches!(result, Err(FsError::NotFound { .. })));
}

#[test]
fn test_remote_schemes_are_rejected() {
    let backend = LocalBackend::default();
    let remote = Location::parse("sftp://host/home").unwrap();
    let err = backend.query_info(&remote, false).unwrap_err();
    assert!(matches!(err, FsError::Backend { .. }));
    assert!(err.to_string().contains("sftp"));
}

#[test]
fn test_file_uri_is_served() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("f"), b"abc").unwrap();

    let uri = format!("file://{}", temp.path().join("f").display());
    let info = LocalBackend::default()
        .query_info(&Location::parse(&uri).unwrap(), false)
        .unwrap();
    assert_eq!(info.size, 3);
}

#[test]
fn test_exists_does_not_follow_symlinks() {
    let temp = TempDir::new().unwrap();
    let backend = LocalBackend::default();
    fs::write(temp.path().join("f"), b"").unwrap();

    assert!(backend.exists(&location(&temp.path().join("f"))).unwrap());
    assert!(!backend.exists(&location(&temp.path().join("gone"))).unwrap());

    #[cfg(unix)]
    {
        let dangling = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("nowhere"), &dangling).unwrap();
        assert!(backend.exists(&location(&dangling)).unwrap());
    }
}

#[test]
fn test_copy_reports_cumulative_progress() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("big.bin");
    fs::write(&source, vec![0u8; 1000]).unwrap();

    let mut ticks = Vec::new();
    small_chunks()
        .copy(
            &location(&source),
            &location(&temp.path().join("out.bin")),
            CopyFlags::default(),
            &CancelToken::new(),
            &mut |copied, total| ticks.push((copied, total)),
        )
        .unwrap();

    assert_eq!(ticks.len(), 10);
    assert!(ticks.windows(2).all(|w| w[0].0 <= w[1].0));
    assert_eq!(ticks.last(), Some(&(1000, 1000)));
}

#[test]
fn test_copy_onto_itself_keeps_the_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("self.bin");
    fs::write(&path, vec![9u8; 1000]).unwrap();

    let flags = CopyFlags {
        overwrite: true,
        preserve_metadata: false,
    };
    let mut ticks = 0;
    let err = small_chunks()
        .copy(
            &location(&path),
            &location(&path),
            flags,
            &CancelToken::new(),
            &mut |_, _| ticks += 1,
        )
        .unwrap_err();

    assert!(matches!(err, FsError::InvalidArgument { .. }));
    assert!(err.to_string().contains("itself"));
    assert_eq!(ticks, 0);
    assert_eq!(fs::read(&path).unwrap(), vec![9u8; 1000]);
}

#[test]
fn test_copy_with_cancelled_token_does_nothing() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a");
    let dest = temp.path().join("b");
    fs::write(&source, b"data").unwrap();

    let token = CancelToken::new();
    token.cancel();
    let err = LocalBackend::default()
        .copy(
            &location(&source),
            &location(&dest),
            CopyFlags::default(),
            &token,
            &mut |_, _| {},
        )
        .unwrap_err();

    assert_eq!(err, FsError::Cancelled);
    assert!(!dest.exists());
}

#[test]
fn test_overwrite_replaces_contents() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("a");
    let dest = temp.path().join("b");
    fs::write(&source, b"new").unwrap();
    fs::write(&dest, b"older contents").unwrap();

    let flags = CopyFlags {
        overwrite: true,
        preserve_metadata: false,
    };
    LocalBackend::default()
        .copy(
            &location(&source),
            &location(&dest),
            flags,
            &CancelToken::new(),
            &mut |_, _| {},
        )
        .unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"new");
}

#[test]
fn test_make_directory_with_parents() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("a/b/c");
    let backend = LocalBackend::default();

    backend.make_directory_with_parents(&location(&nested)).unwrap();
    assert!(nested.is_dir());

    let err = backend
        .make_directory_with_parents(&location(&nested))
        .unwrap_err();
    assert!(matches!(err, FsError::AlreadyExists { .. }));
}

#[test]
fn test_delete_refuses_non_empty_directory() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("full");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("f"), b"x").unwrap();

    let backend = LocalBackend::default();
    assert!(backend.delete(&location(&dir)).is_err());
    assert!(dir.exists());

    backend.delete(&location(&dir.join("f"))).unwrap();
    backend.delete(&location(&dir)).unwrap();
    assert!(!dir.exists());
}

#[cfg(unix)]
#[test]
fn test_set_executable_toggles_bits() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let script = temp.path().join("run.sh");
    fs::write(&script, b"#!/bin/sh\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();

    let backend = LocalBackend::default();
    backend.set_executable(&location(&script), true).unwrap();
    assert_eq!(fs::metadata(&script).unwrap().permissions().mode() & 0o777, 0o755);

    backend.set_executable(&location(&script), false).unwrap();
    assert_eq!(fs::metadata(&script).unwrap().permissions().mode() & 0o777, 0o644);
}

#[cfg(unix)]
#[test]
fn test_symlink_creation() {
    let temp = TempDir::new().unwrap();
    let link = temp.path().join("link");
    LocalBackend::default()
        .make_symlink(&location(&link), std::path::Path::new("/etc/hostname"))
        .unwrap();
    assert_eq!(
        fs::read_link(&link).unwrap(),
        std::path::PathBuf::from("/etc/hostname")
    );
}

#[test]
fn test_watch_reports_created_file() {
    let temp = TempDir::new().unwrap();
    let events = Arc::new(Mutex::new(Vec::<NativeEvent>::new()));
    let seen = Arc::clone(&events);

    let backend = LocalBackend::default();
    let mut monitor = backend
        .watch_directory(
            &location(temp.path()),
            Arc::new(move |event| seen.lock().unwrap().push(event)),
        )
        .unwrap();

    let created = temp.path().join("new.txt");
    fs::write(&created, b"hello").unwrap();

    let expected = created.display().to_string();
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        let found = events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.kind == WatchEventKind::Created && e.path == expected);
        if found {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    monitor.cancel();

    let created_events = events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.kind == WatchEventKind::Created && e.path == expected)
        .count();
    assert_eq!(created_events, 1);
}

#[test]
fn test_watch_rejects_plain_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("f");
    fs::write(&file, b"").unwrap();

    let result = LocalBackend::default().watch_directory(&location(&file), Arc::new(|_| {}));
    assert!(matches!(result, Err(FsError::InvalidArgument { .. })));
}

#[test]
fn test_mount_listing_does_not_fail() {
    let backend = LocalBackend::default();
    assert!(backend.list_volumes().is_ok());
    assert!(backend.list_mounts().is_ok());
}

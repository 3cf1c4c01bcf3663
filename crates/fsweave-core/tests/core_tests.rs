use fsweave_core::{
    CancelToken, EngineConfig, FileKind, FileRecord, FsError, Location, MountEntry, MountKind,
    OverwritePolicy, WatchEvent, WatchEventKind,
};

fn sample_record() -> FileRecord {
    FileRecord {
        name: "x.txt".into(),
        display_name: "x.txt".into(),
        absolute_path: "/tmp/a/x.txt".to_string(),
        parent_path: "/tmp/a".to_string(),
        kind: FileKind::File,
        is_hidden: false,
        content_type: Some("text/plain".to_string()),
        size_bytes: 10,
        mtime: Some(1_700_000_000),
        atime: None,
        ctime: None,
        can_read: true,
        can_write: true,
        can_execute: false,
        filesystem_type: "ext4".into(),
        symlink_target: None,
        owner: None,
        group: None,
        unix_mode: None,
    }
}

#[test]
fn test_record_size_and_kind_helpers() {
    let mut record = sample_record();
    assert_eq!(record.size(), Some(10));
    assert!(record.is_file());
    assert!(!record.is_dir());
    assert!(!record.is_symlink());

    // Negative sizes mean unknown, never an error.
    record.size_bytes = -1;
    assert_eq!(record.size(), None);
}

#[test]
fn test_record_timestamps_stay_unset() {
    let record = sample_record();
    assert_eq!(
        record.modified_at().map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
    assert!(record.accessed_at().is_none());
    assert!(record.created_at().is_none());
}

#[test]
fn test_record_json_shape() {
    let json = serde_json::to_value(sample_record()).unwrap();
    assert_eq!(json["kind"], "file");
    assert_eq!(json["size_bytes"], 10);
    assert_eq!(json["filesystem_type"], "ext4");
    assert!(json["atime"].is_null());
    // Single-entry extras are omitted from listings.
    assert!(json.get("owner").is_none());

    let back: FileRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, sample_record());
}

#[test]
fn test_watch_event_json_uses_snake_case() {
    let event = WatchEvent {
        event_kind: WatchEventKind::MovedOut,
        affected_path: "/tmp/w/a".to_string(),
        other_path: None,
        watched_path: "/tmp/w".to_string(),
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["event_kind"], "moved_out");
}

#[test]
fn test_mount_kind_display() {
    let entry = MountEntry {
        name: "backup".to_string(),
        uri_or_path: "smb://nas/backup".to_string(),
        kind: MountKind::Network,
        volume_identifier: None,
        filesystem_type: None,
    };
    assert_eq!(entry.kind.to_string(), "network");
}

#[test]
fn test_location_scheme_sniffing_is_per_string() {
    let local = Location::parse("/home/user/file.txt").unwrap();
    let remote = Location::parse("sftp://host/file.txt").unwrap();
    assert!(!local.is_uri());
    assert!(remote.is_uri());
    assert_eq!(local.file_name(), remote.file_name());
}

#[test]
fn test_error_display() {
    let err = FsError::already_exists("/b/big.bin");
    assert_eq!(err.to_string(), "Already exists: /b/big.bin");
    assert_eq!(FsError::Cancelled.to_string(), "Operation was cancelled");
}

#[test]
fn test_token_and_policy_defaults() {
    let token = CancelToken::default();
    assert!(!token.is_cancelled());
    assert!(!token.is_completed());
    assert_eq!(OverwritePolicy::default(), OverwritePolicy::FailIfExists);
}

#[test]
fn test_config_round_trips_through_toml() {
    let config = EngineConfig::builder()
        .max_concurrent_tasks(8usize)
        .build()
        .unwrap();
    let text = toml_text(&config);
    let parsed = EngineConfig::from_toml_str(&text).unwrap();
    assert_eq!(parsed, config);
}

fn toml_text(config: &EngineConfig) -> String {
    format!(
        "max_concurrent_tasks = {}\nchannel_capacity = {}\ncopy_buffer_size = {}\npreserve_metadata = {}\nfollow_symlinks_in_listing = {}\n",
        config.max_concurrent_tasks,
        config.channel_capacity,
        config.copy_buffer_size,
        config.preserve_metadata,
        config.follow_symlinks_in_listing,
    )
}

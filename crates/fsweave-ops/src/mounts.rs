//! Volume and mount directory.

use std::collections::HashMap;

use tracing::debug;

use fsweave_core::{Backend, FsResult, MountEntry, MountKind, RawMount, RawVolume};

/// Snapshot the backend's volumes and mounts as one list.
///
/// Volumes come first in backend order, followed by the mounts that are
/// not already represented by a volume. Shadowed mounts are skipped.
pub fn list_mounts<B>(backend: &B) -> FsResult<Vec<MountEntry>>
where
    B: Backend + ?Sized,
{
    let volumes = backend.list_volumes()?;
    let mounts = backend.list_mounts()?;
    debug!(volumes = volumes.len(), mounts = mounts.len(), "listing mounts");
    Ok(correlate(volumes, mounts))
}

/// Join volumes and mounts by display name.
///
/// The join is a heuristic: two distinct volumes sharing a name collapse
/// onto the last one seen.
pub fn correlate(volumes: Vec<RawVolume>, mounts: Vec<RawMount>) -> Vec<MountEntry> {
    let mut entries = Vec::with_capacity(volumes.len() + mounts.len());
    let mut by_name: HashMap<String, (usize, bool)> = HashMap::new();

    for volume in volumes {
        let kind = volume_kind(&volume);
        let identified = volume.identifier.is_some() || volume.activation_root.is_some();
        by_name.insert(volume.name.clone(), (entries.len(), identified));

        entries.push(MountEntry {
            uri_or_path: volume
                .mount_root
                .or(volume.activation_root)
                .unwrap_or_default(),
            name: volume.name,
            kind,
            volume_identifier: volume.identifier,
            filesystem_type: volume.filesystem_type,
        });
    }

    for mount in mounts {
        if mount.is_shadowed {
            continue;
        }
        let location = mount
            .root
            .clone()
            .unwrap_or_else(|| mount.default_location.clone());

        match by_name.get(&mount.name).copied() {
            Some((index, true)) => {
                let entry = &mut entries[index];
                if entry.uri_or_path.is_empty() {
                    entry.uri_or_path = location;
                }
                if entry.filesystem_type.is_none() {
                    entry.filesystem_type = mount.filesystem_type;
                }
            }
            matched => {
                let kind = matched.map_or(MountKind::Network, |(index, _)| entries[index].kind);
                entries.push(MountEntry {
                    name: mount.name,
                    uri_or_path: location,
                    kind,
                    volume_identifier: None,
                    filesystem_type: mount.filesystem_type,
                });
            }
        }
    }

    entries
}

/// A volume without a class is assumed to be a network volume.
fn volume_kind(volume: &RawVolume) -> MountKind {
    match volume.class.as_deref() {
        Some("network") | None => MountKind::Network,
        Some(_) if volume.removable => MountKind::Removable,
        Some(_) => MountKind::Local,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(name: &str, identifier: Option<&str>, class: Option<&str>) -> RawVolume {
        RawVolume {
            name: name.to_string(),
            identifier: identifier.map(str::to_string),
            class: class.map(str::to_string),
            ..Default::default()
        }
    }

    fn mount(name: &str, root: Option<&str>, default_location: &str) -> RawMount {
        RawMount {
            name: name.to_string(),
            root: root.map(str::to_string),
            default_location: default_location.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_volume_kinds() {
        let mut usb = volume("USB", Some("1234-ABCD"), Some("device"));
        usb.removable = true;
        let entries = correlate(
            vec![
                volume("Disk", Some("uuid-1"), Some("device")),
                usb,
                volume("Share", None, Some("network")),
                volume("Classless", None, None),
            ],
            Vec::new(),
        );

        let kinds: Vec<_> = entries.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                MountKind::Local,
                MountKind::Removable,
                MountKind::Network,
                MountKind::Network
            ]
        );
    }

    #[test]
    fn test_every_mount_of_a_volume_keeps_its_kind() {
        let mut root = volume("Filesystem root", None, Some("device"));
        root.mount_root = Some("/".to_string());
        let entries = correlate(
            vec![root],
            vec![
                mount("Filesystem root", Some("/"), "file:///"),
                mount("Filesystem root", Some("/home"), "file:///home"),
            ],
        );

        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.kind == MountKind::Local));
        assert_eq!(entries[2].uri_or_path, "/home");
    }

    #[test]
    fn test_identified_volume_absorbs_its_mount() {
        let mut disk = volume("Data", Some("uuid-1"), Some("device"));
        disk.mount_root = None;
        let entries = correlate(vec![disk], vec![mount("Data", Some("/mnt/data"), "file:///mnt/data")]);

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri_or_path, "/mnt/data");
        assert_eq!(entries[0].volume_identifier.as_deref(), Some("uuid-1"));
    }

    #[test]
    fn test_unmatched_mount_is_network() {
        let entries = correlate(
            Vec::new(),
            vec![mount("backup on nas", None, "smb://nas/backup")],
        );

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, MountKind::Network);
        assert_eq!(entries[0].uri_or_path, "smb://nas/backup");
        assert_eq!(entries[0].volume_identifier, None);
    }

    #[test]
    fn test_mount_of_anonymous_volume_inherits_kind() {
        let mut stick = volume("Stick", None, Some("device"));
        stick.removable = true;
        let entries = correlate(vec![stick], vec![mount("Stick", Some("/media/stick"), "file:///media/stick")]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].kind, MountKind::Removable);
        assert_eq!(entries[1].uri_or_path, "/media/stick");
    }

    #[test]
    fn test_shadowed_mounts_are_skipped() {
        let mut hidden = mount("proc", Some("/proc"), "file:///proc");
        hidden.is_shadowed = true;
        assert!(correlate(Vec::new(), vec![hidden]).is_empty());
    }

    #[test]
    fn test_volumes_come_first() {
        let entries = correlate(
            vec![volume("Disk", Some("uuid-1"), Some("device"))],
            vec![
                mount("nfs export", Some("/net/export"), "file:///net/export"),
                mount("Disk", Some("/"), "file:///"),
            ],
        );

        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Disk", "nfs export"]);
        assert_eq!(entries[0].uri_or_path, "/");
    }
}

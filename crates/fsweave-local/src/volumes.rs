//! Volumes and mounts of the local machine.
//!
//! Mounts come from `sysinfo`. On Linux, volumes are the block devices
//! listed under `/dev/disk/by-uuid`, named by their label when they have
//! one and joined to mounts through the resolved device path. Per-path
//! filesystem types come from a single `statfs` call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sysinfo::{Disk, Disks};
use url::Url;

#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
use nix::sys::statfs;
#[cfg(target_os = "linux")]
use nix::sys::statfs::FsType;

use fsweave_core::{FilesystemUsage, FsError, FsResult, RawMount, RawVolume};

/// Filesystems that only exist for the kernel's bookkeeping.
const PSEUDO_FILESYSTEMS: &[&str] = &[
    "autofs",
    "binfmt_misc",
    "bpf",
    "cgroup",
    "cgroup2",
    "configfs",
    "debugfs",
    "devpts",
    "devtmpfs",
    "efivarfs",
    "fusectl",
    "hugetlbfs",
    "mqueue",
    "nsfs",
    "overlay",
    "proc",
    "pstore",
    "securityfs",
    "squashfs",
    "sysfs",
    "tmpfs",
    "tracefs",
];

/// Filesystems served over the network.
const NETWORK_FILESYSTEMS: &[&str] = &[
    "nfs", "nfs4", "cifs", "smb3", "smbfs", "afpfs", "sshfs", "fuse.sshfs", "9p", "davfs",
];

struct DiskInfo {
    device: String,
    mount_point: PathBuf,
    filesystem: String,
    removable: bool,
    total: u64,
    available: u64,
}

impl From<&Disk> for DiskInfo {
    fn from(disk: &Disk) -> Self {
        Self {
            device: disk.name().to_string_lossy().into_owned(),
            mount_point: disk.mount_point().to_path_buf(),
            filesystem: disk.file_system().to_string_lossy().into_owned(),
            removable: disk.is_removable(),
            total: disk.total_space(),
            available: disk.available_space(),
        }
    }
}

fn disks() -> Vec<DiskInfo> {
    Disks::new_with_refreshed_list()
        .iter()
        .map(DiskInfo::from)
        .filter(|disk| disk.mount_point.is_absolute())
        .collect()
}

fn is_pseudo(filesystem: &str) -> bool {
    PSEUDO_FILESYSTEMS.contains(&filesystem)
}

fn is_network(filesystem: &str) -> bool {
    NETWORK_FILESYSTEMS.contains(&filesystem)
}

/// Device identity read from `/dev/disk`.
#[derive(Debug, Default, Clone)]
struct DeviceIds {
    uuid: Option<String>,
    label: Option<String>,
}

/// Map resolved device paths to their uuid and label.
fn device_ids() -> HashMap<PathBuf, DeviceIds> {
    let mut ids: HashMap<PathBuf, DeviceIds> = HashMap::new();
    for (link, name) in read_links(Path::new("/dev/disk/by-uuid")) {
        ids.entry(link).or_default().uuid = Some(name);
    }
    for (link, name) in read_links(Path::new("/dev/disk/by-label")) {
        ids.entry(link).or_default().label = Some(unescape_label(&name));
    }
    ids
}

fn read_links(dir: &Path) -> Vec<(PathBuf, String)> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter_map(|entry| {
            let device = std::fs::canonicalize(entry.path()).ok()?;
            Some((device, entry.file_name().to_string_lossy().into_owned()))
        })
        .collect()
}

/// udev escapes spaces and slashes in labels as `\x20` style sequences.
fn unescape_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find("\\x") {
        out.push_str(&rest[..pos]);
        let hex = rest.get(pos + 2..pos + 4);
        match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
            Some(byte) => {
                out.push(char::from(byte));
                rest = &rest[pos + 4..];
            }
            None => {
                out.push_str("\\x");
                rest = &rest[pos + 2..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Name shown for a disk. Every mount of a device that has a volume carries
/// the volume's name so the two join.
fn display_name(disk: &DiskInfo, ids: Option<&DeviceIds>) -> String {
    if let Some(label) = ids.and_then(|ids| ids.label.clone()) {
        return label;
    }
    if disk.mount_point == Path::new("/") {
        return "Filesystem root".to_string();
    }
    disk.mount_point
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| disk.device.clone())
}

fn resolve_device(device: &str) -> Option<PathBuf> {
    if !device.starts_with("/dev/") {
        return None;
    }
    std::fs::canonicalize(device).ok()
}

fn file_uri(path: &Path) -> String {
    Url::from_file_path(path).map_or_else(|()| format!("file://{}", path.display()), String::from)
}

/// Volumes and mounts built from one disk snapshot.
#[derive(Debug, Default)]
struct Inventory {
    volumes: Vec<RawVolume>,
    mounts: Vec<RawMount>,
}

/// Every block device backing a real mount is a volume, named after its
/// first mount. Every disk is a mount; kernel pseudo filesystems are
/// shadowed.
fn inventory(
    disks: Vec<DiskInfo>,
    ids: &HashMap<PathBuf, DeviceIds>,
    resolve: impl Fn(&str) -> Option<PathBuf>,
) -> Inventory {
    let mut names: HashMap<PathBuf, String> = HashMap::new();
    let mut inventory = Inventory::default();

    for disk in disks {
        let device = resolve(&disk.device);
        let device_ids = device.as_ref().and_then(|device| ids.get(device));
        let real = !is_pseudo(&disk.filesystem) && !is_network(&disk.filesystem);

        if let Some(device) = device.as_ref().filter(|_| real) {
            if !names.contains_key(device) {
                let name = display_name(&disk, device_ids);
                names.insert(device.clone(), name.clone());
                inventory.volumes.push(RawVolume {
                    name,
                    identifier: device_ids.and_then(|ids| ids.uuid.clone()),
                    class: Some("device".to_string()),
                    removable: disk.removable,
                    activation_root: None,
                    mount_root: Some(disk.mount_point.display().to_string()),
                    filesystem_type: Some(disk.filesystem.clone()),
                });
            }
        }

        let name = match device.as_ref().and_then(|device| names.get(device)) {
            Some(name) => name.clone(),
            None if device_ids.is_some() || disk.device.starts_with("/dev/") => {
                display_name(&disk, device_ids)
            }
            None => format!("{} on {}", disk.device, disk.mount_point.display()),
        };
        inventory.mounts.push(RawMount {
            name,
            default_location: file_uri(&disk.mount_point),
            root: Some(disk.mount_point.display().to_string()),
            is_shadowed: is_pseudo(&disk.filesystem),
            filesystem_type: Some(disk.filesystem),
        });
    }
    inventory
}

fn snapshot() -> Inventory {
    inventory(disks(), &device_ids(), resolve_device)
}

pub fn list_volumes() -> FsResult<Vec<RawVolume>> {
    Ok(snapshot().volumes)
}

pub fn list_mounts() -> FsResult<Vec<RawMount>> {
    Ok(snapshot().mounts)
}

/// Mount point of the filesystem containing `path`.
fn containing_disk(path: &Path) -> Option<DiskInfo> {
    let path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    disks()
        .into_iter()
        .filter(|disk| path.starts_with(&disk.mount_point))
        .max_by_key(|disk| disk.mount_point.components().count())
}

#[cfg(target_os = "linux")]
const FILESYSTEM_MAGIC: &[(FsType, &str)] = &[
    (statfs::EXT4_SUPER_MAGIC, "ext4"),
    (statfs::BTRFS_SUPER_MAGIC, "btrfs"),
    (statfs::XFS_SUPER_MAGIC, "xfs"),
    (statfs::F2FS_SUPER_MAGIC, "f2fs"),
    (statfs::REISERFS_SUPER_MAGIC, "reiserfs"),
    (statfs::MSDOS_SUPER_MAGIC, "vfat"),
    (statfs::ISOFS_SUPER_MAGIC, "iso9660"),
    (statfs::UDF_SUPER_MAGIC, "udf"),
    (statfs::NFS_SUPER_MAGIC, "nfs"),
    (statfs::SMB_SUPER_MAGIC, "smbfs"),
    (statfs::FUSE_SUPER_MAGIC, "fuse"),
    (statfs::OVERLAYFS_SUPER_MAGIC, "overlay"),
    (statfs::TMPFS_MAGIC, "tmpfs"),
    (statfs::PROC_SUPER_MAGIC, "proc"),
    (statfs::SYSFS_MAGIC, "sysfs"),
    (statfs::DEVPTS_SUPER_MAGIC, "devpts"),
    (statfs::CGROUP2_SUPER_MAGIC, "cgroup2"),
    (statfs::CGROUP_SUPER_MAGIC, "cgroup"),
    (statfs::HUGETLBFS_MAGIC, "hugetlbfs"),
    (statfs::AUTOFS_SUPER_MAGIC, "autofs"),
    (statfs::BPF_FS_MAGIC, "bpf"),
    (statfs::DEBUGFS_MAGIC, "debugfs"),
    (statfs::TRACEFS_MAGIC, "tracefs"),
    (statfs::SECURITYFS_MAGIC, "securityfs"),
    (statfs::NSFS_MAGIC, "nsfs"),
];

/// Filesystem type name of the filesystem containing `path`.
///
/// One `statfs` on the path itself; the mount table is not consulted.
#[cfg(target_os = "linux")]
pub fn filesystem_type(path: &Path) -> Option<String> {
    let magic = statfs::statfs(path).ok()?.filesystem_type();
    FILESYSTEM_MAGIC
        .iter()
        .find(|(known, _)| *known == magic)
        .map(|(_, name)| name.to_string())
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
pub fn filesystem_type(path: &Path) -> Option<String> {
    let stat = statfs::statfs(path).ok()?;
    Some(stat.filesystem_type_name().to_string())
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
pub fn filesystem_type(path: &Path) -> Option<String> {
    containing_disk(path).map(|disk| disk.filesystem)
}

/// Capacity of the filesystem containing `path`.
pub fn usage(path: &Path) -> FsResult<FilesystemUsage> {
    std::fs::symlink_metadata(path).map_err(|e| FsError::io(path.display(), e))?;
    let disk = containing_disk(path).ok_or_else(|| {
        FsError::backend(format!("{}: no mounted filesystem found", path.display()))
    })?;
    Ok(FilesystemUsage {
        total: disk.total,
        used: disk.total.saturating_sub(disk.available),
        free: disk.available,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_label() {
        assert_eq!(unescape_label("My\\x20Disk"), "My Disk");
        assert_eq!(unescape_label("plain"), "plain");
        assert_eq!(unescape_label("odd\\xZZ"), "odd\\xZZ");
    }

    #[test]
    fn test_filesystem_classes() {
        assert!(is_pseudo("proc"));
        assert!(is_pseudo("tmpfs"));
        assert!(!is_pseudo("ext4"));
        assert!(is_network("nfs4"));
        assert!(!is_network("btrfs"));
    }

    #[test]
    fn test_display_name_prefers_label() {
        let disk = DiskInfo {
            device: "/dev/sdb1".to_string(),
            mount_point: PathBuf::from("/media/user/STICK"),
            filesystem: "vfat".to_string(),
            removable: true,
            total: 0,
            available: 0,
        };
        let ids = DeviceIds {
            uuid: Some("1234-ABCD".to_string()),
            label: Some("Backup Stick".to_string()),
        };
        assert_eq!(display_name(&disk, Some(&ids)), "Backup Stick");
        assert_eq!(display_name(&disk, None), "STICK");
    }

    fn disk(device: &str, mount_point: &str, filesystem: &str) -> DiskInfo {
        DiskInfo {
            device: device.to_string(),
            mount_point: PathBuf::from(mount_point),
            filesystem: filesystem.to_string(),
            removable: false,
            total: 0,
            available: 0,
        }
    }

    fn identity(device: &str) -> Option<PathBuf> {
        device.starts_with("/dev/").then(|| PathBuf::from(device))
    }

    #[test]
    fn test_mounts_of_one_device_share_the_volume_name() {
        let disks = vec![
            disk("/dev/sda2", "/", "btrfs"),
            disk("/dev/sda2", "/home", "btrfs"),
            disk("server:/share", "/mnt/share", "nfs"),
            disk("proc", "/proc", "proc"),
        ];
        let inventory = inventory(disks, &HashMap::new(), identity);

        assert_eq!(inventory.volumes.len(), 1);
        assert_eq!(inventory.volumes[0].name, "Filesystem root");
        assert_eq!(inventory.volumes[0].mount_root.as_deref(), Some("/"));

        let names: Vec<_> = inventory.mounts.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Filesystem root",
                "Filesystem root",
                "server:/share on /mnt/share",
                "proc on /proc"
            ]
        );
        assert_eq!(inventory.mounts[1].root.as_deref(), Some("/home"));
        assert!(inventory.mounts[3].is_shadowed);
        assert!(!inventory.mounts[0].is_shadowed);
    }

    #[test]
    fn test_labelled_device_names_every_mount() {
        let mut ids = HashMap::new();
        ids.insert(
            PathBuf::from("/dev/sdb1"),
            DeviceIds {
                uuid: Some("1234-ABCD".to_string()),
                label: Some("Data".to_string()),
            },
        );
        let disks = vec![
            disk("/dev/sdb1", "/mnt/data", "ext4"),
            disk("/dev/sdb1", "/srv/bind", "ext4"),
        ];
        let inventory = inventory(disks, &ids, identity);

        assert_eq!(inventory.volumes.len(), 1);
        assert_eq!(inventory.volumes[0].identifier.as_deref(), Some("1234-ABCD"));
        assert!(inventory.mounts.iter().all(|m| m.name == "Data"));
    }

    #[test]
    fn test_default_location_is_percent_encoded() {
        let disks = vec![disk("/dev/sdc1", "/media/user/My Disk", "vfat")];
        let inventory = inventory(disks, &HashMap::new(), identity);

        let mount = &inventory.mounts[0];
        assert_eq!(mount.default_location, "file:///media/user/My%20Disk");
        assert_eq!(mount.root.as_deref(), Some("/media/user/My Disk"));
        assert_eq!(mount.name, "My Disk");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_filesystem_type_of_proc() {
        assert_eq!(filesystem_type(Path::new("/proc")).as_deref(), Some("proc"));
        assert_eq!(filesystem_type(Path::new("/no/such/path")), None);
    }
}

//! Content type guessing from file names.

use std::ffi::OsStr;
use std::path::Path;

/// Content type of directories.
pub const DIRECTORY: &str = "inode/directory";

/// Content type of symlinks that are not followed.
pub const SYMLINK: &str = "inode/symlink";

/// Known extensions and their content types, lowercase.
const BY_EXTENSION: &[(&str, &str)] = &[
    // Text and documentation
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
    ("rst", "text/x-rst"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("log", "text/x-log"),
    ("pdf", "application/pdf"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("ods", "application/vnd.oasis.opendocument.spreadsheet"),
    ("docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ("xlsx", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
    // Web
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "text/javascript"),
    ("ts", "text/x-typescript"),
    ("svg", "image/svg+xml"),
    // Config and data
    ("json", "application/json"),
    ("yaml", "application/x-yaml"),
    ("yml", "application/x-yaml"),
    ("toml", "application/toml"),
    ("xml", "application/xml"),
    ("ini", "text/plain"),
    ("conf", "text/plain"),
    ("sql", "application/sql"),
    // Source code
    ("rs", "text/rust"),
    ("py", "text/x-python"),
    ("c", "text/x-csrc"),
    ("h", "text/x-chdr"),
    ("cpp", "text/x-c++src"),
    ("hpp", "text/x-c++hdr"),
    ("go", "text/x-go"),
    ("java", "text/x-java"),
    ("sh", "application/x-shellscript"),
    ("bash", "application/x-shellscript"),
    // Images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("ico", "image/vnd.microsoft.icon"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    // Audio and video
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("ogg", "audio/ogg"),
    ("wav", "audio/x-wav"),
    ("mp4", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    // Archives
    ("zip", "application/zip"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("tgz", "application/x-compressed-tar"),
    ("xz", "application/x-xz"),
    ("bz2", "application/x-bzip2"),
    ("7z", "application/x-7z-compressed"),
    ("rar", "application/vnd.rar"),
    // Packages and binaries
    ("deb", "application/vnd.debian.binary-package"),
    ("rpm", "application/x-rpm"),
    ("appimage", "application/vnd.appimage"),
    ("iso", "application/x-cd-image"),
];

/// Guess a regular file's content type from its extension.
pub fn guess(path: &Path) -> Option<&'static str> {
    let extension = path.extension().and_then(OsStr::to_str)?.to_ascii_lowercase();
    BY_EXTENSION
        .iter()
        .find(|(known, _)| *known == extension)
        .map(|(_, content_type)| *content_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_extensions() {
        assert_eq!(guess(Path::new("/tmp/x.txt")), Some("text/plain"));
        assert_eq!(guess(Path::new("Photo.JPG")), Some("image/jpeg"));
    }

    #[test]
    fn test_unknown_or_missing_extension() {
        assert_eq!(guess(Path::new("Makefile")), None);
        assert_eq!(guess(Path::new("data.unknownext")), None);
    }
}

//! Scheme sniffing and location resolution.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::FsError;

/// A resolved location: either a local filesystem path or a URI.
///
/// The choice is made once, by [`Location::parse`], and holds for the
/// whole operation that uses the location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// A plain local path (no scheme prefix).
    Path(PathBuf),
    /// A URI with a scheme (`file://`, `smb://`, `sftp://`, ...).
    Uri(Url),
}

impl Location {
    /// Resolve a path-or-URI string.
    ///
    /// A string beginning with an RFC 3986 scheme followed by `:` is parsed
    /// as a URI; anything else is taken as a local path. Single-letter
    /// schemes are treated as paths so `C:\dir` stays a path.
    pub fn parse(input: &str) -> Result<Self, FsError> {
        if input.trim().is_empty() {
            return Err(FsError::invalid("empty path"));
        }

        if sniff_scheme(input).is_some() {
            let url = Url::parse(input)
                .map_err(|e| FsError::invalid(format!("malformed URI '{input}': {e}")))?;
            Ok(Self::Uri(url))
        } else {
            Ok(Self::Path(PathBuf::from(input)))
        }
    }

    /// Create a location for a local path.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Check if this location was resolved as a URI.
    pub fn is_uri(&self) -> bool {
        matches!(self, Self::Uri(_))
    }

    /// The URI scheme, if any.
    pub fn scheme(&self) -> Option<&str> {
        match self {
            Self::Path(_) => None,
            Self::Uri(url) => Some(url.scheme()),
        }
    }

    /// The local filesystem path for this location, if it has one.
    ///
    /// `file://` URIs convert to paths; other schemes return `None`.
    pub fn to_local_path(&self) -> Option<PathBuf> {
        match self {
            Self::Path(path) => Some(path.clone()),
            Self::Uri(url) if url.scheme() == "file" => url.to_file_path().ok(),
            Self::Uri(_) => None,
        }
    }

    /// Borrow the local path when this location is a plain path.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Uri(_) => None,
        }
    }

    /// Last component of the location.
    pub fn file_name(&self) -> Option<String> {
        match self {
            Self::Path(path) => path.file_name().map(|n| n.to_string_lossy().into_owned()),
            Self::Uri(url) => url
                .path_segments()
                .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
                .map(str::to_string),
        }
    }

    /// The child location with the given name.
    pub fn child(&self, name: &str) -> Self {
        match self {
            Self::Path(path) => Self::Path(path.join(name)),
            Self::Uri(url) => {
                let mut child = url.clone();
                if let Ok(mut segments) = child.path_segments_mut() {
                    segments.pop_if_empty().push(name);
                }
                Self::Uri(child)
            }
        }
    }

    /// The parent location, if there is one.
    pub fn parent(&self) -> Option<Self> {
        match self {
            Self::Path(path) => path.parent().map(|p| Self::Path(p.to_path_buf())),
            Self::Uri(url) => {
                let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
                if segments.is_empty() {
                    return None;
                }
                let mut parent = url.clone();
                {
                    let mut parent_segments = parent.path_segments_mut().ok()?;
                    parent_segments.clear();
                    parent_segments.extend(&segments[..segments.len() - 1]);
                }
                Some(Self::Uri(parent))
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Uri(url) => write!(f, "{url}"),
        }
    }
}

/// Return the scheme prefix of `input` if it starts with one.
fn sniff_scheme(input: &str) -> Option<&str> {
    let colon = input.find(':')?;
    let scheme = &input[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;

    if scheme.len() < 2 || !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        Some(scheme)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let loc = Location::parse("/tmp/a").unwrap();
        assert_eq!(loc, Location::Path(PathBuf::from("/tmp/a")));
        assert!(!loc.is_uri());
        assert_eq!(loc.scheme(), None);
    }

    #[test]
    fn test_uri_with_scheme() {
        let loc = Location::parse("sftp://host/home/user").unwrap();
        assert!(loc.is_uri());
        assert_eq!(loc.scheme(), Some("sftp"));
        assert_eq!(loc.to_local_path(), None);
        assert_eq!(loc.file_name().as_deref(), Some("user"));
    }

    #[test]
    fn test_file_uri_converts_to_path() {
        let loc = Location::parse("file:///tmp/some%20dir").unwrap();
        assert_eq!(loc.to_local_path(), Some(PathBuf::from("/tmp/some dir")));
    }

    #[test]
    fn test_drive_letter_is_not_a_scheme() {
        let loc = Location::parse("C:\\Users").unwrap();
        assert!(!loc.is_uri());
    }

    #[test]
    fn test_colon_later_in_path_is_not_a_scheme() {
        let loc = Location::parse("/tmp/a:b").unwrap();
        assert!(!loc.is_uri());
    }

    #[test]
    fn test_empty_is_invalid() {
        assert!(matches!(
            Location::parse("  "),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_malformed_uri_is_invalid() {
        assert!(matches!(
            Location::parse("http://[bad"),
            Err(FsError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_uri_child_and_parent() {
        let loc = Location::parse("smb://server/share/").unwrap();
        let child = loc.child("docs");
        assert_eq!(child.to_string(), "smb://server/share/docs");
        assert_eq!(child.parent().unwrap().to_string(), "smb://server/share");
    }
}

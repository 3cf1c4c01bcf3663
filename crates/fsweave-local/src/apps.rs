//! Default application lookup through XDG `mimeapps.list` files.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

use fsweave_core::AppDescriptor;

const DEFAULT_SECTION: &str = "Default Applications";
const DESKTOP_SECTION: &str = "Desktop Entry";

/// Directories searched for `mimeapps.list`, most specific first.
fn mimeapps_dirs() -> Vec<PathBuf> {
    let mut search = Vec::new();
    search.extend(dirs::config_dir());
    search.push(PathBuf::from("/etc/xdg"));
    search.extend(data_dirs().into_iter().map(|dir| dir.join("applications")));
    search
}

/// `$XDG_DATA_HOME` then `$XDG_DATA_DIRS`.
fn data_dirs() -> Vec<PathBuf> {
    let mut search = Vec::new();
    search.extend(dirs::data_dir());
    match std::env::var("XDG_DATA_DIRS") {
        Ok(value) if !value.is_empty() => {
            search.extend(value.split(':').filter(|s| !s.is_empty()).map(PathBuf::from));
        }
        _ => {
            search.push(PathBuf::from("/usr/local/share"));
            search.push(PathBuf::from("/usr/share"));
        }
    }
    search
}

/// Value of `key` in `[section]` of a desktop-style ini file.
fn ini_value(text: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;
    for line in text.lines().map(str::trim) {
        if line.starts_with('[') && line.ends_with(']') {
            in_section = &line[1..line.len() - 1] == section;
            continue;
        }
        if !in_section || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((k, v)) if k.trim() == key => return Some(v.trim().to_string()),
            _ => {}
        }
    }
    None
}

fn find_desktop_file(id: &str) -> Option<PathBuf> {
    data_dirs()
        .into_iter()
        .map(|dir| dir.join("applications").join(id))
        .find(|path| path.is_file())
}

fn read_descriptor(path: &Path, id: &str, content_type: &str) -> Option<AppDescriptor> {
    let text = fs::read_to_string(path).ok()?;
    let name = ini_value(&text, DESKTOP_SECTION, "Name")?;
    let exec = ini_value(&text, DESKTOP_SECTION, "Exec").unwrap_or_default();
    Some(AppDescriptor {
        id: id.to_string(),
        name,
        exec,
        content_type: content_type.to_string(),
    })
}

/// Resolve the default application for `content_type`, searching the given
/// `mimeapps.list` directories in order.
pub fn default_for_in(content_type: &str, mimeapps_dirs: &[PathBuf]) -> Option<AppDescriptor> {
    for dir in mimeapps_dirs {
        let Ok(text) = fs::read_to_string(dir.join("mimeapps.list")) else {
            continue;
        };
        let Some(ids) = ini_value(&text, DEFAULT_SECTION, content_type) else {
            continue;
        };

        for id in ids.split(';').map(str::trim).filter(|id| !id.is_empty()) {
            let candidate = dir.join(id);
            let path = if candidate.is_file() {
                Some(candidate)
            } else {
                find_desktop_file(id)
            };
            if let Some(app) = path.and_then(|path| read_descriptor(&path, id, content_type)) {
                trace!(content_type, id, "default application resolved");
                return Some(app);
            }
        }
    }
    None
}

/// Resolve the default application for `content_type`.
pub fn default_for(content_type: &str) -> Option<AppDescriptor> {
    default_for_in(content_type, &mimeapps_dirs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ini_value_respects_sections() {
        let text = "[Added Associations]\ntext/plain=other.desktop\n\n[Default Applications]\ntext/plain=editor.desktop;\n";
        assert_eq!(
            ini_value(text, DEFAULT_SECTION, "text/plain").as_deref(),
            Some("editor.desktop;")
        );
        assert_eq!(ini_value(text, DEFAULT_SECTION, "image/png"), None);
    }

    #[test]
    fn test_resolves_desktop_file_next_to_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("mimeapps.list"),
            "[Default Applications]\ntext/plain=editor.desktop;\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("editor.desktop"),
            "[Desktop Entry]\nName=Editor\nExec=editor %U\n",
        )
        .unwrap();

        let app = default_for_in("text/plain", &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(app.id, "editor.desktop");
        assert_eq!(app.name, "Editor");
        assert_eq!(app.exec, "editor %U");
        assert_eq!(app.content_type, "text/plain");
    }

    #[test]
    fn test_unregistered_type_is_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("mimeapps.list"), "[Default Applications]\n").unwrap();
        assert_eq!(default_for_in("text/plain", &[dir.path().to_path_buf()]), None);
    }
}

// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::path::{Component, Path, PathBuf};

/// Lexically clean a path.
///
/// `.` components are dropped and `..` consumes the preceding normal
/// component. `..` directly under the root stays at the root. No
/// filesystem access happens here, so symlinks are not resolved.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();

    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(comp),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Convert a relative path into a string with forward slashes.
pub fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Both paths are cleaned first; the prefix check is component-wise, so
/// `/proj2/file` is not considered to be under `/proj`.
///
/// Returns `None` if the path is not inside `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let root = clean_path(root);
    let path = clean_path(path);
    path.strip_prefix(&root).ok().map(to_slash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_path_drops_dots_and_resolves_parents() {
        assert_eq!(clean_path(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(clean_path(Path::new("/a//b/")), PathBuf::from("/a/b"));
        assert_eq!(clean_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(clean_path(Path::new("a/../..")), PathBuf::from(".."));
        assert_eq!(clean_path(Path::new("./")), PathBuf::from("."));
    }

    #[test]
    fn relative_str_is_component_wise() {
        assert_eq!(
            relative_str(Path::new("/proj"), Path::new("/proj/src/main.rs")),
            Some("src/main.rs".to_string())
        );
        assert_eq!(relative_str(Path::new("/proj"), Path::new("/proj2/x")), None);
        assert_eq!(
            relative_str(Path::new("/proj/"), Path::new("/proj")),
            Some(String::new())
        );
    }
}

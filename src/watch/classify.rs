// src/watch/classify.rs

//! Pure classification of raw filesystem events.
//!
//! [`classify`] decides, for a single [`RawEvent`], whether it should be
//! ignored, should trigger a run, or announces a new directory that needs
//! to be watched. It does no IO of its own: whether a path is a directory
//! is answered by an injected oracle, which keeps the function
//! deterministic under test.

use std::path::Path;

use crate::errors::ClassifyError;
use crate::types::{Action, Operation, RawEvent};
use crate::watch::path_utils::clean_path;
use crate::watch::patterns::ExclusionRules;

/// Leading marker of editor lock files (emacs writes `.#file` next to
/// the file being edited).
pub const LOCK_FILE_MARKER: &str = ".#";

/// Classify a single event relative to `base`.
///
/// `is_dir` receives the path relative to `base` and reports whether it
/// currently is a directory.
pub fn classify<F>(
    event: &RawEvent,
    base: &Path,
    rules: &ExclusionRules,
    is_dir: F,
) -> Result<Action, ClassifyError>
where
    F: Fn(&Path) -> bool,
{
    // Permission changes and removals carry no content signal.
    if matches!(event.operation, Operation::Chmod | Operation::Remove) {
        return Ok(Action::Ignore);
    }

    if !event.path.is_absolute() {
        return Err(ClassifyError::InvalidPath(event.path.clone()));
    }

    let path = clean_path(&event.path);
    let base = clean_path(base);

    let Ok(rel) = path.strip_prefix(&base) else {
        return Err(ClassifyError::OutsideBase {
            path: path.clone(),
            base: base.clone(),
        });
    };

    if rules.excludes(rel) {
        return Ok(Action::Ignore);
    }

    if is_lock_file(rel) {
        return Ok(Action::Ignore);
    }

    if is_dir(rel) {
        // Only the appearance of a directory matters.
        if event.operation == Operation::Create {
            return Ok(Action::WatchNewDir(path));
        }
        return Ok(Action::Ignore);
    }

    Ok(Action::Trigger(path))
}

fn is_lock_file(rel: &Path) -> bool {
    rel.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOCK_FILE_MARKER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn no_dirs(_: &Path) -> bool {
        false
    }

    fn rules() -> ExclusionRules {
        ExclusionRules::new([".git"], ["bin"])
    }

    #[test]
    fn chmod_and_remove_are_ignored_even_for_bad_paths() {
        for op in [Operation::Chmod, Operation::Remove] {
            let event = RawEvent::new("not/absolute", op);
            let act = classify(&event, Path::new("/proj"), &rules(), no_dirs);
            assert_eq!(act, Ok(Action::Ignore));
        }
    }

    #[test]
    fn relative_path_is_invalid() {
        let event = RawEvent::new("local/path", Operation::Create);
        let act = classify(&event, Path::new("/proj"), &rules(), no_dirs);
        assert_eq!(act, Err(ClassifyError::InvalidPath(PathBuf::from("local/path"))));
    }

    #[test]
    fn path_outside_base_is_rejected() {
        let event = RawEvent::new("/absolute/but/wrong/base", Operation::Create);
        let act = classify(&event, Path::new("/absolute/with/right"), &rules(), no_dirs);
        assert!(matches!(act, Err(ClassifyError::OutsideBase { .. })));

        // Sibling sharing a string prefix is still outside.
        let event = RawEvent::new("/proj2/file", Operation::Write);
        let act = classify(&event, Path::new("/proj"), &rules(), no_dirs);
        assert!(matches!(act, Err(ClassifyError::OutsideBase { .. })));
    }

    #[test]
    fn dot_dot_cannot_escape_base() {
        let event = RawEvent::new("/proj/src/../../etc/passwd", Operation::Write);
        let act = classify(&event, Path::new("/proj"), &rules(), no_dirs);
        assert!(matches!(act, Err(ClassifyError::OutsideBase { .. })));
    }

    #[test]
    fn git_internals_are_ignored() {
        let event = RawEvent::new("/proj/.git/index", Operation::Create);
        let act = classify(&event, Path::new("/proj"), &rules(), no_dirs);
        assert_eq!(act, Ok(Action::Ignore));
    }

    #[test]
    fn subpath_only_matches_at_the_root() {
        let base = Path::new("/proj");
        let ignored = RawEvent::new("/proj/bin/app", Operation::Create);
        assert_eq!(classify(&ignored, base, &rules(), no_dirs), Ok(Action::Ignore));

        let nested = RawEvent::new("/proj/sub/bin/app", Operation::Create);
        assert_eq!(
            classify(&nested, base, &rules(), no_dirs),
            Ok(Action::Trigger(PathBuf::from("/proj/sub/bin/app")))
        );
    }

    #[test]
    fn editor_lock_files_are_ignored() {
        let event = RawEvent::new("/proj/src/.#main.rs", Operation::Create);
        let act = classify(&event, Path::new("/proj"), &rules(), no_dirs);
        assert_eq!(act, Ok(Action::Ignore));
    }

    #[test]
    fn created_directory_is_watched_other_ops_ignored() {
        let is_dir = |rel: &Path| rel == Path::new("foo/bar");
        let base = Path::new("/");

        let created = RawEvent::new("/foo/bar", Operation::Create);
        assert_eq!(
            classify(&created, base, &ExclusionRules::default(), is_dir),
            Ok(Action::WatchNewDir(PathBuf::from("/foo/bar")))
        );

        let written = RawEvent::new("/foo/bar", Operation::Write);
        assert_eq!(
            classify(&written, base, &ExclusionRules::default(), is_dir),
            Ok(Action::Ignore)
        );
    }

    #[test]
    fn trigger_carries_cleaned_path() {
        let event = RawEvent::new("/proj/./src//lib.rs", Operation::Write);
        let act = classify(&event, Path::new("/proj/"), &rules(), no_dirs);
        assert_eq!(act, Ok(Action::Trigger(PathBuf::from("/proj/src/lib.rs"))));
    }
}

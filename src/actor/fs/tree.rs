use std::path::Path;

use jwalk::WalkDir;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::WatchError;

/// Register `root` and every directory below it, non-recursively.
///
/// Returns the number of directories registered. A missing root is an error.
pub(super) fn watch_tree(watcher: &mut RecommendedWatcher, root: &Path) -> Result<usize, WatchError> {
    if !root.is_dir() {
        return Err(WatchError::Register {
            path: root.to_path_buf(),
            source: notify::Error::path_not_found().add_path(root.to_path_buf()),
        });
    }

    let mut count = 0;
    for entry in WalkDir::new(root).skip_hidden(false).sort(true) {
        let entry = entry.map_err(|source| WatchError::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_dir() {
            continue;
        }

        let path = entry.path();
        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Register { path, source })?;
        count += 1;
    }

    Ok(count)
}

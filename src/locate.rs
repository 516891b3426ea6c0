use std::path::{Path, PathBuf};

use crate::utils::LogError;

/// Directory holding the project's logical view.
pub const LOGICAL_DIR: &str = "Logical";

/// Depth-first search below `root` for a directory called `name`. Children
/// are visited in sorted order so the first match is stable across runs.
pub fn find_dir(root: &Path, name: &str) -> Option<PathBuf> {
    let mut children: Vec<PathBuf> = std::fs::read_dir(root)
        .log_err(&format!("cannot read {}", root.display()))?
        .filter_map(|e| {
            let e = e.ok()?;
            e.file_type().ok()?.is_dir().then(|| e.path())
        })
        .collect();
    children.sort();

    for child in children {
        if child.file_name().is_some_and(|n| n == name) {
            return Some(child);
        }
        if let Some(found) = find_dir(&child, name) {
            return Some(found);
        }
    }
    None
}

/// Declaration file of the program directory `program` below the logical view.
pub fn declaration_file(project_root: &Path, program: &str, file_name: &str) -> Option<PathBuf> {
    let logical = project_root.join(LOGICAL_DIR);
    let dir = find_dir(&logical, program)?;
    log::debug!("program directory {}", dir.display());
    Some(dir.join(file_name))
}

pub fn global_file(project_root: &Path, file_name: &str) -> PathBuf {
    project_root.join(LOGICAL_DIR).join(file_name)
}

//! Removal of mod directories no longer referenced by the lock

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::MODFILE_NAME;
use crate::error::{ModError, Result};
use crate::lockfile::WorkspaceLock;

/// Removed mods: mod name -> removed versions
pub type PruneResult = BTreeMap<String, Vec<String>>;

/// Deletes orphaned directories under the mods directory
#[derive(Debug, Clone)]
pub struct Pruner {
    mods_dir: PathBuf,
}

/// Split a dependency path into (name, version), e.g. `a/b@v1.0.0`
fn split_dependency_path(dependency_path: &str) -> (String, String) {
    match dependency_path.rfind(['@', '#']) {
        Some(i) if dependency_path[i..].starts_with('#') => (
            dependency_path[..i].to_string(),
            dependency_path[i..].to_string(),
        ),
        Some(i) => (
            dependency_path[..i].to_string(),
            dependency_path[i + 1..].to_string(),
        ),
        None => (dependency_path.to_string(), String::new()),
    }
}

fn has_version_marker(relative: &str) -> bool {
    relative.contains('@') || relative.contains('#')
}

/// An unreferenced directory and the dependency path it was installed as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orphan {
    /// Directory to remove, relative to the mods directory
    pub dir: String,
    pub dependency_path: String,
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl Pruner {
    pub fn new(mods_dir: impl Into<PathBuf>) -> Self {
        Self {
            mods_dir: mods_dir.into(),
        }
    }

    /// Directories under the mods directory that no path in `keep` leads to
    ///
    /// Refs may contain `/` (`name#feature/x`), so a directory carrying a
    /// version marker is only an orphan once no kept path continues below it.
    pub fn orphans(&self, keep: &BTreeSet<String>) -> Result<Vec<Orphan>> {
        let mut found = Vec::new();
        if !self.mods_dir.is_dir() {
            return Ok(found);
        }

        let mut walker = WalkDir::new(&self.mods_dir)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();
        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| ModError::IoError {
                message: e.to_string(),
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let relative = relative_path(&self.mods_dir, entry.path());
            if !has_version_marker(&relative) {
                continue;
            }
            if keep.contains(&relative) {
                walker.skip_current_dir();
                continue;
            }
            let prefix = format!("{relative}/");
            if keep.iter().any(|k| k.starts_with(&prefix)) {
                continue;
            }

            walker.skip_current_dir();
            let dependency_path = self
                .mod_root_below(entry.path())
                .unwrap_or_else(|| relative.clone());
            found.push(Orphan {
                dir: relative,
                dependency_path,
            });
        }
        Ok(found)
    }

    /// Shallowest directory at or below `dir` holding a mod definition
    fn mod_root_below(&self, dir: &Path) -> Option<String> {
        WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_type().is_dir() && e.path().join(MODFILE_NAME).is_file())
            .min_by_key(walkdir::DirEntry::depth)
            .map(|e| relative_path(&self.mods_dir, e.path()))
    }

    /// Delete every mod directory `lock` does not reference
    ///
    /// Empty parent directories are removed up to, not including, the mods
    /// directory itself.
    pub fn prune(&self, lock: &WorkspaceLock) -> Result<PruneResult> {
        let keep = lock.dependency_paths();
        let mut removed = PruneResult::new();

        for orphan in self.orphans(&keep)? {
            let dir = self.mods_dir.join(&orphan.dir);
            fs::remove_dir_all(&dir).map_err(|e| ModError::IoError {
                message: format!("failed to remove {}: {e}", dir.display()),
            })?;
            tracing::info!(dependency = %orphan.dependency_path, "pruned");
            self.remove_empty_parents(&dir);

            let (name, version) = split_dependency_path(&orphan.dependency_path);
            removed.entry(name).or_default().push(version);
        }

        Ok(removed)
    }

    fn remove_empty_parents(&self, removed: &Path) {
        let mut current = removed.parent();
        while let Some(dir) = current {
            if dir == self.mods_dir || !dir.starts_with(&self.mods_dir) {
                break;
            }
            let is_empty = fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none());
            if !is_empty || fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

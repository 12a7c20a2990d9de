//! Shadow-directory staging for atomic mod installs
//!
//! Fetched mods are written into a shadow directory next to the mods
//! directory, never into the mods directory itself. Only when the whole batch
//! is done does [`Staging::commit`] copy the staged mods over. The shadow
//! directory is removed at the end of every run.
//!
//! ## Usage
//!
//! ```ignore
//! let mut staging = Staging::begin(&workspace.root, &workspace.mods_dir())?;
//!
//! let target = staging.path_for("github.com/acme/net@v1.2.0");
//! repository.fetch("github.com/acme/net", &git_ref, &target)?;
//! staging.add("github.com/acme/net@v1.2.0");
//!
//! // On success:
//! staging.commit()?;
//!
//! // On error (automatic via Drop if not committed):
//! // the shadow directory is deleted and .mods is untouched
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::config::SHADOW_DIR_PREFIX;
use crate::error::{ModError, Result};

/// An in-progress batch of staged mods
#[derive(Debug)]
pub struct Staging {
    /// Permanent mods directory
    mods_dir: PathBuf,

    /// Shadow directory, removed when dropped
    shadow: Option<TempDir>,

    /// Dependency paths staged so far, in staging order
    staged: Vec<String>,
}

impl Staging {
    /// Create a fresh shadow directory under `workspace_root`
    pub fn begin(workspace_root: &Path, mods_dir: &Path) -> Result<Self> {
        let shadow = tempfile::Builder::new()
            .prefix(SHADOW_DIR_PREFIX)
            .tempdir_in(workspace_root)
            .map_err(|e| ModError::StagingFailed {
                message: format!(
                    "cannot create shadow directory in {}: {e}",
                    workspace_root.display()
                ),
            })?;
        tracing::debug!(shadow = %shadow.path().display(), "staging started");

        Ok(Self {
            mods_dir: mods_dir.to_path_buf(),
            shadow: Some(shadow),
            staged: Vec::new(),
        })
    }

    /// Root of the shadow directory
    pub fn shadow_dir(&self) -> &Path {
        self.shadow
            .as_ref()
            .map(TempDir::path)
            .unwrap_or(self.mods_dir.as_path())
    }

    /// Where a dependency path is staged
    pub fn path_for(&self, dependency_path: &str) -> PathBuf {
        self.shadow_dir().join(dependency_path)
    }

    /// Record a dependency path as fully staged
    pub fn add(&mut self, dependency_path: impl Into<String>) {
        let dependency_path = dependency_path.into();
        if !self.staged.contains(&dependency_path) {
            self.staged.push(dependency_path);
        }
    }

    pub fn contains(&self, dependency_path: &str) -> bool {
        self.staged.iter().any(|p| p == dependency_path)
    }

    pub fn staged(&self) -> &[String] {
        &self.staged
    }

    /// Copy every staged mod into the mods directory, replacing existing ones
    ///
    /// The shadow directory is removed afterwards whether or not the copy
    /// succeeded. Returns the number of mods committed.
    pub fn commit(mut self) -> Result<usize> {
        let result = self.copy_staged();
        self.cleanup();
        result
    }

    fn copy_staged(&self) -> Result<usize> {
        let commit_failed = |path: &Path, e: std::io::Error| ModError::CommitFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        for dependency_path in &self.staged {
            let src = self.path_for(dependency_path);
            let dst = self.mods_dir.join(dependency_path);
            if !src.is_dir() {
                return Err(ModError::CommitFailed {
                    path: dst.display().to_string(),
                    reason: format!("{dependency_path} was not staged"),
                });
            }

            if dst.exists() {
                fs::remove_dir_all(&dst).map_err(|e| commit_failed(&dst, e))?;
            }
            copy_dir_recursive(&src, &dst).map_err(|e| commit_failed(&dst, e))?;
            tracing::info!(dependency = %dependency_path, "committed");
        }
        Ok(self.staged.len())
    }

    /// Discard everything staged
    pub fn rollback(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        if let Some(shadow) = self.shadow.take() {
            let path = shadow.path().to_path_buf();
            if let Err(e) = shadow.close() {
                tracing::warn!(shadow = %path.display(), error = %e, "failed to remove shadow directory");
            }
        }
    }
}

impl Drop for Staging {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Remove shadow directories left behind by interrupted runs
///
/// Returns how many were removed.
pub fn sweep_stale(workspace_root: &Path) -> Result<usize> {
    if !workspace_root.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(workspace_root)? {
        let entry = entry?;
        let is_shadow = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(SHADOW_DIR_PREFIX));
        if is_shadow && entry.path().is_dir() {
            fs::remove_dir_all(entry.path())?;
            tracing::info!(path = %entry.path().display(), "removed stale shadow directory");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Copy a directory tree, skipping `.git`
fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");
    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;

//! Workspace detection and loading
//!
//! A workspace is a directory containing a `mod.yaml`. Its lock, mods
//! directory and shadow directories live next to it.

use std::path::{Path, PathBuf};

use crate::config::{LOCKFILE_NAME, MODFILE_NAME, MODS_DIR};
use crate::error::{ModError, Result};
use crate::lockfile::WorkspaceLock;
use crate::modfile::{ModDefinition, ModfileLoader};

/// An opened workspace
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Root directory (where mod.yaml is located)
    pub root: PathBuf,

    /// Workspace mod definition (mod.yaml)
    pub definition: ModDefinition,

    /// Lock as found on disk (mod.lock)
    pub lock: WorkspaceLock,
}

impl Workspace {
    /// Detect if a workspace exists at the given path
    pub fn exists(root: &Path) -> bool {
        root.join(MODFILE_NAME).is_file()
    }

    /// Find a workspace by searching upward from the given path
    pub fn find_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if Self::exists(&current) {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Open an existing workspace
    pub fn open(root: &Path, loader: &dyn ModfileLoader) -> Result<Self> {
        let root = dunce::canonicalize(root).map_err(|_| ModError::WorkspaceNotFound {
            path: root.display().to_string(),
        })?;
        let definition =
            loader
                .load_modfile(&root)?
                .ok_or_else(|| ModError::WorkspaceNotFound {
                    path: root.display().to_string(),
                })?;
        let lock = WorkspaceLock::load(&root.join(LOCKFILE_NAME), &definition.name)?;

        Ok(Self {
            root,
            definition,
            lock,
        })
    }

    /// Workspace mod name, also the root key of the lock
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.root.join(MODS_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modfile::YamlModfileLoader;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_from_nested_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MODFILE_NAME), "name: ws\n").unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(Workspace::find_from(&nested), Some(temp.path().to_path_buf()));
    }

    #[test]
    fn test_open_without_modfile_fails() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Workspace::open(temp.path(), &YamlModfileLoader),
            Err(ModError::WorkspaceNotFound { .. })
        ));
    }

    #[test]
    fn test_open_loads_definition_and_empty_lock() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MODFILE_NAME), "name: github.com/acme/ws\n").unwrap();

        let ws = Workspace::open(temp.path(), &YamlModfileLoader).unwrap();
        assert_eq!(ws.name(), "github.com/acme/ws");
        assert!(ws.lock.is_empty());
        assert_eq!(ws.lock.workspace, "github.com/acme/ws");
        assert!(ws.mods_dir().ends_with(MODS_DIR));
    }
}

//! Dependency lock (mod.lock) data structures
//!
//! The lock records, for every parent in the installed tree, which resolved
//! version of each direct dependency was installed. The root parent key is the
//! workspace mod name; every other key is the dependency path of the parent mod.
//!
//! ```json
//! {
//!   "workspace": "github.com/acme/workspace",
//!   "install_cache": {
//!     "github.com/acme/workspace": {
//!       "github.com/acme/net": {
//!         "name": "github.com/acme/net",
//!         "ref": { "type": "version", "version": "1.2.0", "tag": "v1.2.0" },
//!         "commit": "4f3c...",
//!         "constraint": "^1.0",
//!         "alias": "net"
//!       }
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fs;
use std::io::Write;
use std::path::Path;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::constraint::ModVersionConstraint;
use crate::error::{ModError, Result};
use crate::git::GitRef;
use crate::version::display_version;

/// What a constraint resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResolvedRef {
    /// Semantic version, with the tag it was published under
    Version { version: Version, tag: String },
    Tag { tag: String },
    Branch { branch: String },
    /// Local directory, referenced in place
    Path { path: String },
}

/// The concrete outcome of satisfying a constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedVersionConstraint {
    pub name: String,

    #[serde(rename = "ref")]
    pub reference: ResolvedRef,

    /// Commit checked out (absent for local directories)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// Constraint text this was resolved from
    pub constraint: String,
}

impl ResolvedVersionConstraint {
    /// Canonical identity of this resolution, also its directory under `.mods`
    ///
    /// `name@v1.2.0`, `name@<tag>`, `name#<branch>`, or the local path.
    pub fn dependency_path(&self) -> String {
        match &self.reference {
            ResolvedRef::Version { version, .. } => {
                format!("{}@{}", self.name, display_version(version))
            }
            ResolvedRef::Tag { tag } => format!("{}@{tag}", self.name),
            ResolvedRef::Branch { branch } => format!("{}#{branch}", self.name),
            ResolvedRef::Path { path } => path.clone(),
        }
    }

    pub fn version(&self) -> Option<&Version> {
        match &self.reference {
            ResolvedRef::Version { version, .. } => Some(version),
            _ => None,
        }
    }

    /// Git reference to check out, if this is a remote mod
    pub fn git_ref(&self) -> Option<GitRef> {
        match &self.reference {
            ResolvedRef::Version { tag, .. } | ResolvedRef::Tag { tag } => {
                Some(GitRef::Tag(tag.clone()))
            }
            ResolvedRef::Branch { branch } => Some(GitRef::Branch(branch.clone())),
            ResolvedRef::Path { .. } => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.reference, ResolvedRef::Path { .. })
    }

    /// Human-readable version: `v1.2.0`, `release-x`, `#main`, or the path
    pub fn display_version(&self) -> String {
        match &self.reference {
            ResolvedRef::Version { version, .. } => display_version(version),
            ResolvedRef::Tag { tag } => tag.clone(),
            ResolvedRef::Branch { branch } => format!("#{branch}"),
            ResolvedRef::Path { path } => path.clone(),
        }
    }
}

/// One edge of the installed tree: a resolved dependency plus its alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledModVersion {
    #[serde(flatten)]
    pub resolved: ResolvedVersionConstraint,

    /// Short name the parent refers to the dependency by
    pub alias: String,
}

impl InstalledModVersion {
    pub fn new(resolved: ResolvedVersionConstraint, alias: impl Into<String>) -> Self {
        Self {
            resolved,
            alias: alias.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.resolved.name
    }

    pub fn dependency_path(&self) -> String {
        self.resolved.dependency_path()
    }

    /// Same installation, recorded against a different requiring constraint
    pub fn for_constraint(&self, required: &ModVersionConstraint) -> Self {
        let mut edge = self.clone();
        edge.resolved.constraint = required.constraint_string();
        edge
    }

    /// Whether two edges refer to the same installed content
    pub fn same_content(&self, other: &InstalledModVersion) -> bool {
        self.resolved.reference == other.resolved.reference
            && self.resolved.commit == other.resolved.commit
    }
}

type InstallCache = BTreeMap<String, BTreeMap<String, InstalledModVersion>>;

/// Persisted dependency tree of a workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WorkspaceLock {
    /// Root parent key (the workspace mod name)
    pub workspace: String,

    /// parent key -> dependency name -> installed version
    #[serde(default)]
    pub install_cache: InstallCache,
}

impl WorkspaceLock {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            install_cache: BTreeMap::new(),
        }
    }

    /// Load the lock for `workspace`, or an empty lock if the file is absent
    ///
    /// A lock written under a previous workspace name is re-rooted.
    pub fn load(path: &Path, workspace: &str) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(workspace));
        }

        let json = fs::read_to_string(path).map_err(|e| ModError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut lock = Self::from_json(&json).map_err(|e| ModError::LockParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        if lock.workspace != workspace {
            if let Some(root) = lock.install_cache.remove(&lock.workspace) {
                lock.install_cache.insert(workspace.to_string(), root);
            }
            lock.workspace = workspace.to_string();
        }
        Ok(lock)
    }

    /// Persist the lock; an empty lock deletes the file instead
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_failed = |reason: String| ModError::LockWriteFailed {
            path: path.display().to_string(),
            reason,
        };

        if self.is_empty() {
            if path.exists() {
                fs::remove_file(path).map_err(|e| write_failed(e.to_string()))?;
            }
            return Ok(());
        }

        let json = self.to_json()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| write_failed(e.to_string()))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| write_failed(e.to_string()))?;
        tmp.persist(path).map_err(|e| write_failed(e.error.to_string()))?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ModError::LockParseFailed {
            path: "mod.lock".to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize to pretty JSON with a trailing newline
    pub fn to_json(&self) -> Result<String> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| ModError::LockWriteFailed {
            path: "mod.lock".to_string(),
            reason: e.to_string(),
        })?;
        json.push('\n');
        Ok(json)
    }

    pub fn is_empty(&self) -> bool {
        self.install_cache.values().all(BTreeMap::is_empty)
    }

    /// Record that `parent` depends on `installed`
    pub fn add(&mut self, parent: &str, installed: InstalledModVersion) {
        self.install_cache
            .entry(parent.to_string())
            .or_default()
            .insert(installed.name().to_string(), installed);
    }

    pub fn get(&self, parent: &str, name: &str) -> Option<&InstalledModVersion> {
        self.install_cache.get(parent)?.get(name)
    }

    /// Direct dependencies of `parent`
    pub fn dependencies_of(&self, parent: &str) -> impl Iterator<Item = &InstalledModVersion> {
        self.install_cache
            .get(parent)
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Direct dependencies of the workspace
    pub fn root_dependencies(&self) -> impl Iterator<Item = &InstalledModVersion> {
        self.dependencies_of(&self.workspace)
    }

    /// Every (parent key, dependency) edge
    pub fn edges(&self) -> impl Iterator<Item = (&str, &InstalledModVersion)> {
        self.install_cache
            .iter()
            .flat_map(|(parent, deps)| deps.values().map(move |dep| (parent.as_str(), dep)))
    }

    pub fn contains_mod_name(&self, name: &str) -> bool {
        self.edges().any(|(_, dep)| dep.name() == name)
    }

    /// Installation of `required.name` under any parent that satisfies it
    ///
    /// When several satisfy a version requirement the highest version wins.
    pub fn find_compatible(&self, required: &ModVersionConstraint) -> Option<&InstalledModVersion> {
        self.edges()
            .map(|(_, dep)| dep)
            .filter(|dep| required.is_satisfied_by(dep))
            .max_by(|a, b| a.resolved.version().cmp(&b.resolved.version()))
    }

    /// Dependency paths of every installed mod
    pub fn dependency_paths(&self) -> BTreeSet<String> {
        self.edges().map(|(_, dep)| dep.dependency_path()).collect()
    }

    /// Parent keys from the root's child down to `parent` (root excluded)
    ///
    /// Follows the shortest path from the root. Returns an empty chain for the
    /// root itself or for keys unreachable from it.
    pub fn parent_chain(&self, parent: &str) -> Vec<String> {
        let mut came_from: HashMap<String, String> = HashMap::new();
        let mut queue = VecDeque::from([self.workspace.clone()]);
        let mut seen = BTreeSet::from([self.workspace.clone()]);

        while let Some(key) = queue.pop_front() {
            if key == parent {
                break;
            }
            for dep in self.dependencies_of(&key) {
                let child = dep.dependency_path();
                if seen.insert(child.clone()) {
                    came_from.insert(child.clone(), key.clone());
                    queue.push_back(child);
                }
            }
        }

        let mut chain = Vec::new();
        let mut current = parent.to_string();
        while let Some(prev) = came_from.get(&current) {
            chain.push(current.clone());
            current = prev.clone();
        }
        chain.reverse();
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn version_edge(name: &str, version: &str, constraint: &str) -> InstalledModVersion {
        let version = Version::parse(version).unwrap();
        InstalledModVersion::new(
            ResolvedVersionConstraint {
                name: name.to_string(),
                reference: ResolvedRef::Version {
                    tag: display_version(&version),
                    version,
                },
                commit: Some("0123456789abcdef0123456789abcdef01234567".to_string()),
                constraint: constraint.to_string(),
            },
            crate::constraint::short_name(name),
        )
    }

    fn branch_edge(name: &str, branch: &str) -> InstalledModVersion {
        InstalledModVersion::new(
            ResolvedVersionConstraint {
                name: name.to_string(),
                reference: ResolvedRef::Branch {
                    branch: branch.to_string(),
                },
                commit: Some("fedcba9876543210fedcba9876543210fedcba98".to_string()),
                constraint: format!("#{branch}"),
            },
            crate::constraint::short_name(name),
        )
    }

    fn sample_lock() -> WorkspaceLock {
        let mut lock = WorkspaceLock::new("ws");
        lock.add("ws", version_edge("github.com/acme/net", "1.2.0", "^1.0"));
        lock.add("ws", branch_edge("github.com/acme/tools", "main"));
        lock.add(
            "github.com/acme/net@v1.2.0",
            version_edge("github.com/acme/core", "0.3.1", "0.3"),
        );
        lock
    }

    #[test]
    fn test_dependency_paths() {
        let lock = sample_lock();
        let paths: Vec<String> = lock.dependency_paths().into_iter().collect();
        assert_eq!(
            paths,
            vec![
                "github.com/acme/core@v0.3.1",
                "github.com/acme/net@v1.2.0",
                "github.com/acme/tools#main",
            ]
        );
    }

    #[test]
    fn test_roundtrip_through_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mod.lock");
        let lock = sample_lock();

        lock.save(&path).unwrap();
        let loaded = WorkspaceLock::load(&path, "ws").unwrap();

        assert_eq!(loaded, lock);
    }

    #[test]
    fn test_serialized_form_is_tagged() {
        let json = sample_lock().to_json().unwrap();
        assert!(json.contains("\"type\": \"version\""));
        assert!(json.contains("\"tag\": \"v1.2.0\""));
        assert!(json.contains("\"type\": \"branch\""));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let lock = WorkspaceLock::load(&temp.path().join("mod.lock"), "ws").unwrap();
        assert!(lock.is_empty());
        assert_eq!(lock.workspace, "ws");
    }

    #[test]
    fn test_saving_empty_lock_deletes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mod.lock");
        sample_lock().save(&path).unwrap();
        assert!(path.exists());

        WorkspaceLock::new("ws").save(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mod.lock");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            WorkspaceLock::load(&path, "ws"),
            Err(ModError::LockParseFailed { .. })
        ));
    }

    #[test]
    fn test_load_reroots_renamed_workspace() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mod.lock");
        sample_lock().save(&path).unwrap();

        let lock = WorkspaceLock::load(&path, "renamed").unwrap();
        assert_eq!(lock.workspace, "renamed");
        assert_eq!(lock.root_dependencies().count(), 2);
    }

    #[test]
    fn test_find_compatible_prefers_highest() {
        let mut lock = WorkspaceLock::new("ws");
        lock.add("ws", version_edge("github.com/acme/core", "0.3.1", "0.3"));
        lock.add("a@v1.0.0", version_edge("github.com/acme/core", "0.3.4", "0.3"));
        lock.add("b@v1.0.0", version_edge("github.com/acme/core", "0.4.0", "0.4"));

        let required = ModVersionConstraint::version("github.com/acme/core", "0.3").unwrap();
        let found = lock.find_compatible(&required).unwrap();
        assert_eq!(found.resolved.version(), Some(&Version::new(0, 3, 4)));

        let required = ModVersionConstraint::version("github.com/acme/core", "^2").unwrap();
        assert!(lock.find_compatible(&required).is_none());
    }

    #[test]
    fn test_parent_chain() {
        let lock = sample_lock();
        assert_eq!(
            lock.parent_chain("github.com/acme/net@v1.2.0"),
            vec!["github.com/acme/net@v1.2.0".to_string()]
        );
        assert!(lock.parent_chain("ws").is_empty());
        assert!(lock.parent_chain("unknown@v1.0.0").is_empty());
    }

    #[test]
    fn test_git_ref_for_references() {
        let edge = version_edge("github.com/acme/net", "1.2.0", "^1");
        assert_eq!(edge.resolved.git_ref(), Some(GitRef::Tag("v1.2.0".to_string())));
        let edge = branch_edge("github.com/acme/net", "dev");
        assert_eq!(edge.resolved.git_ref(), Some(GitRef::Branch("dev".to_string())));
    }
}

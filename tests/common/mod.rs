//! Common test utilities for moddeps integration tests

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use git2::{Commit, Oid, Repository, Signature};
use moddeps::git::{self, AuthKind, GitRef, RemoteRefs};
use moddeps::{ModError, ModRepository, Result};
use tempfile::TempDir;

/// A test workspace for integration tests
#[allow(dead_code)]
pub struct TestWorkspace {
    /// Temporary directory
    pub temp: TempDir,
    /// Path to workspace root
    pub path: PathBuf,
}

#[allow(dead_code)]
impl TestWorkspace {
    /// Create a workspace named `name` with the given mod.yaml `require` block
    pub fn new(name: &str, require_yaml: &str) -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = temp.path().join("ws");
        std::fs::create_dir_all(&path).expect("Failed to create workspace directory");
        let workspace = Self { temp, path };
        workspace.write_file("mod.yaml", &format!("name: {name}\n{require_yaml}"));
        workspace
    }

    /// Write a file in workspace
    pub fn write_file(&self, path: &str, content: &str) {
        let file_path = self.path.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
    }

    /// Read a file from workspace
    pub fn read_file(&self, path: &str) -> String {
        let file_path = self.path.join(path);
        std::fs::read_to_string(&file_path).expect("Failed to read file")
    }

    /// Check if a file exists in workspace
    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// Whether a mod is installed under `.mods` at `dependency_path`
    pub fn has_mod(&self, dependency_path: &str) -> bool {
        self.path
            .join(".mods")
            .join(dependency_path)
            .join("mod.yaml")
            .is_file()
    }

    /// Create a local mod directory next to the workspace
    pub fn create_local_mod(&self, dir: &str, modfile: &str) -> PathBuf {
        let mod_dir = self.temp.path().join(dir);
        std::fs::create_dir_all(&mod_dir).expect("Failed to create mod directory");
        std::fs::write(mod_dir.join("mod.yaml"), modfile).expect("Failed to write mod.yaml");
        mod_dir
    }

    /// Count shadow directories left in the workspace root
    pub fn shadow_dirs(&self) -> usize {
        std::fs::read_dir(&self.path)
            .expect("Failed to read workspace")
            .filter_map(std::result::Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".mods.tmp."))
            .count()
    }

    /// Get path to moddeps binary
    pub fn moddeps_bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_moddeps"))
    }
}

/// mod.yaml `require` block; entries use the CLI forms `n`, `n@req`, `n#branch`
#[allow(dead_code)]
pub fn require_yaml(requires: &[&str]) -> String {
    if requires.is_empty() {
        return String::new();
    }
    let mut yaml = String::from("require:\n");
    for require in requires {
        if let Some((name, branch)) = require.split_once('#') {
            yaml.push_str(&format!("  - name: {name}\n    branch: {branch}\n"));
        } else if let Some((name, req)) = require.split_once('@') {
            yaml.push_str(&format!("  - name: {name}\n    version: \"{req}\"\n"));
        } else {
            yaml.push_str(&format!("  - name: {require}\n"));
        }
    }
    yaml
}

/// Mods hosted as bare git repositories in a temporary directory
///
/// Listing reads references through git2; fetching goes through the real
/// `moddeps::git::fetch_ref` against the repository's local path.
#[allow(dead_code)]
pub struct LocalRegistry {
    pub temp: TempDir,
    broken: RefCell<BTreeSet<String>>,
    fetches: RefCell<Vec<String>>,
}

#[allow(dead_code)]
impl LocalRegistry {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().expect("Failed to create registry directory"),
            broken: RefCell::new(BTreeSet::new()),
            fetches: RefCell::new(Vec::new()),
        }
    }

    fn repo_path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    fn open_or_init(&self, name: &str) -> Repository {
        let path = self.repo_path(name);
        Repository::open_bare(&path)
            .or_else(|_| Repository::init_bare(&path))
            .expect("Failed to open registry repository")
    }

    /// Commit a mod.yaml requiring `requires` on `branch`
    fn commit(&self, repo: &Repository, name: &str, branch: &str, requires: &[&str], note: &str) -> Oid {
        let modfile = format!("name: {name}\n{}", require_yaml(requires));
        let mut builder = repo.treebuilder(None).expect("Failed to create tree");
        for (file, content) in [("mod.yaml", modfile.as_str()), ("NOTES.md", note)] {
            let blob = repo.blob(content.as_bytes()).expect("Failed to write blob");
            builder.insert(file, blob, 0o100_644).expect("Failed to insert blob");
        }
        let tree = repo
            .find_tree(builder.write().expect("Failed to write tree"))
            .expect("Failed to find tree");

        let refname = format!("refs/heads/{branch}");
        let parent = repo
            .find_reference(&refname)
            .ok()
            .and_then(|r| r.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        let sig = Signature::now("Test", "test@test.com").expect("Failed to create signature");
        repo.commit(Some(&refname), &sig, &sig, note, &tree, &parents)
            .expect("Failed to commit")
    }

    /// Publish `name` at `tag` with the given requirements
    pub fn publish(&self, name: &str, tag: &str, requires: &[&str]) -> String {
        let repo = self.open_or_init(name);
        let oid = self.commit(&repo, name, "release", requires, tag);
        let object = repo.find_object(oid, None).expect("Failed to find commit");
        repo.tag_lightweight(tag, &object, true)
            .expect("Failed to create tag");
        oid.to_string()
    }

    /// Push a new commit to `branch`, returning its SHA
    pub fn push(&self, name: &str, branch: &str, requires: &[&str], note: &str) -> String {
        let repo = self.open_or_init(name);
        self.commit(&repo, name, branch, requires, note).to_string()
    }

    /// Make every later fetch of `name` fail
    pub fn break_mod(&self, name: &str) {
        self.broken.borrow_mut().insert(name.to_string());
    }

    pub fn fetch_count(&self, name: &str) -> usize {
        self.fetches.borrow().iter().filter(|n| *n == name).count()
    }
}

impl Default for LocalRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModRepository for LocalRegistry {
    fn list_refs(&self, name: &str) -> Result<RemoteRefs> {
        let repo = Repository::open_bare(self.repo_path(name)).map_err(|e| {
            ModError::RemoteUnreachable {
                name: name.to_string(),
                https: e.message().to_string(),
                ssh: e.message().to_string(),
            }
        })?;

        let mut refs = RemoteRefs::default();
        for reference in repo.references()? {
            let reference = reference?;
            let Some(refname) = reference.name().map(str::to_string) else {
                continue;
            };
            let commit = reference.peel_to_commit()?.id().to_string();
            if let Some(tag) = refname.strip_prefix("refs/tags/") {
                refs.tags.insert(tag.to_string(), commit);
            } else if let Some(branch) = refname.strip_prefix("refs/heads/") {
                refs.branches.insert(branch.to_string(), commit);
            }
        }
        Ok(refs)
    }

    fn fetch(&self, name: &str, git_ref: &GitRef, target: &Path) -> Result<String> {
        self.fetches.borrow_mut().push(name.to_string());
        if self.broken.borrow().contains(name) {
            return Err(ModError::GitCloneFailed {
                url: name.to_string(),
                reason: "Network error".to_string(),
            });
        }
        let url = self.repo_path(name).display().to_string();
        git::fetch_ref(&url, git_ref, target, &AuthKind::Anonymous)
    }
}

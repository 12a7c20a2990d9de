//! Mod definition files (mod.yaml)
//!
//! Parsing a mod definition is a collaborator concern: the installer only
//! needs a mod's name, version and required mods, through [`ModfileLoader`].
//! [`YamlModfileLoader`] is the default implementation.
//!
//! ```yaml
//! name: github.com/acme/workspace
//! version: 1.0.0
//! require:
//!   - name: github.com/acme/net
//!     version: "^1.2"
//!   - name: github.com/acme/tools
//!     branch: main
//!   - name: local/helpers
//!     path: ../helpers
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::MODFILE_NAME;
use crate::constraint::{ModVersionConstraint, VersionReference};
use crate::error::{ModError, Result};

/// One entry of a `require` list, as written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireEntry {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RequireEntry {
    /// Convert into a constraint; relative paths resolve against `base_dir`
    pub fn to_constraint(&self, base_dir: &Path) -> Result<ModVersionConstraint> {
        let selectors = [&self.version, &self.tag, &self.branch, &self.path]
            .iter()
            .filter(|s| s.is_some())
            .count();
        if selectors > 1 {
            return Err(ModError::InvalidConstraint {
                constraint: self.name.clone(),
                reason: "only one of version, tag, branch or path may be set".to_string(),
            });
        }

        if let Some(version) = &self.version {
            return ModVersionConstraint::version(&self.name, version);
        }
        if let Some(tag) = &self.tag {
            return Ok(ModVersionConstraint::tag(&self.name, tag));
        }
        if let Some(branch) = &self.branch {
            return Ok(ModVersionConstraint::branch(&self.name, branch));
        }
        if let Some(raw) = &self.path {
            let joined = base_dir.join(raw);
            let path = dunce::canonicalize(&joined).unwrap_or(joined);
            return Ok(ModVersionConstraint::file_path(&self.name, path, raw));
        }
        Ok(ModVersionConstraint::any(&self.name))
    }

    pub fn from_constraint(constraint: &ModVersionConstraint) -> Self {
        let mut entry = Self {
            name: constraint.name.clone(),
            version: None,
            tag: None,
            branch: None,
            path: None,
        };
        match &constraint.reference {
            VersionReference::Version { raw, .. } if raw == "*" => {}
            VersionReference::Version { raw, .. } => entry.version = Some(raw.clone()),
            VersionReference::Tag(tag) => entry.tag = Some(tag.clone()),
            VersionReference::Branch(branch) => entry.branch = Some(branch.clone()),
            VersionReference::FilePath { raw, .. } => entry.path = Some(raw.clone()),
        }
        entry
    }
}

/// A parsed mod definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<RequireEntry>,

    /// Directory the definition was loaded from
    #[serde(skip)]
    pub mod_path: PathBuf,

    /// Dependency path this mod was installed as (unset for the workspace)
    #[serde(skip)]
    pub dependency_path: Option<String>,
}

impl ModDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            require: Vec::new(),
            mod_path: PathBuf::new(),
            dependency_path: None,
        }
    }

    /// Required mods as constraints
    pub fn required_mods(&self) -> Result<Vec<ModVersionConstraint>> {
        self.require
            .iter()
            .map(|entry| entry.to_constraint(&self.mod_path))
            .collect()
    }

    /// Stamp a loaded dependency with the identity it was installed under
    pub fn set_dependency_config(&mut self, dependency_path: impl Into<String>) {
        self.dependency_path = Some(dependency_path.into());
    }

    /// Key this mod's own dependencies are recorded under in the lock
    pub fn install_cache_key(&self) -> &str {
        self.dependency_path.as_deref().unwrap_or(&self.name)
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ModError::ModfileParseFailed {
            path: self.mod_path.join(MODFILE_NAME).display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Loads mod definitions from mod directories
pub trait ModfileLoader {
    /// Load the definition in `dir`; `Ok(None)` when the directory has none
    fn load_modfile(&self, dir: &Path) -> Result<Option<ModDefinition>>;
}

/// Reads `mod.yaml` with `serde_yaml`
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlModfileLoader;

impl ModfileLoader for YamlModfileLoader {
    fn load_modfile(&self, dir: &Path) -> Result<Option<ModDefinition>> {
        let path = dir.join(MODFILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| ModError::FileReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut definition: ModDefinition =
            serde_yaml::from_str(&content).map_err(|e| ModError::ModfileParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if definition.name.trim().is_empty() {
            return Err(ModError::ModfileParseFailed {
                path: path.display().to_string(),
                reason: "mod name cannot be empty".to_string(),
            });
        }
        definition.mod_path = dir.to_path_buf();
        Ok(Some(definition))
    }
}

/// How the workspace's require set changed during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequireChanges {
    pub added: Vec<ModVersionConstraint>,
    pub removed: Vec<ModVersionConstraint>,
    /// (before, after)
    pub changed: Vec<(ModVersionConstraint, ModVersionConstraint)>,
}

impl RequireChanges {
    /// Compare two require sets by mod name
    pub fn between(before: &[ModVersionConstraint], after: &[ModVersionConstraint]) -> Self {
        let mut changes = Self::default();
        for new in after {
            match before.iter().find(|old| old.name == new.name) {
                None => changes.added.push(new.clone()),
                Some(old) if old != new => changes.changed.push((old.clone(), new.clone())),
                Some(_) => {}
            }
        }
        changes.removed = before
            .iter()
            .filter(|old| !after.iter().any(|new| new.name == old.name))
            .cloned()
            .collect();
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Rewrite the `require` block of the definition in `dir`
///
/// Entries are written in `requires` order. Other fields are preserved.
pub fn save_requires(dir: &Path, requires: &[ModVersionConstraint]) -> Result<()> {
    let path = dir.join(MODFILE_NAME);
    let mut definition =
        YamlModfileLoader
            .load_modfile(dir)?
            .ok_or_else(|| ModError::MissingModDefinition {
                path: dir.display().to_string(),
            })?;
    definition.require = requires.iter().map(RequireEntry::from_constraint).collect();

    let yaml = definition.to_yaml()?;
    fs::write(&path, yaml).map_err(|e| ModError::FileWriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_modfile(dir: &Path, content: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MODFILE_NAME), content).unwrap();
    }

    #[test]
    fn test_load_missing_returns_none() {
        let temp = TempDir::new().unwrap();
        assert!(YamlModfileLoader.load_modfile(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_requires() {
        let temp = TempDir::new().unwrap();
        write_modfile(
            temp.path(),
            "name: ws\nrequire:\n  - name: github.com/acme/net\n    version: \"^1.2\"\n  - name: github.com/acme/tools\n    branch: main\n  - name: github.com/acme/any\n",
        );
        let def = YamlModfileLoader.load_modfile(temp.path()).unwrap().unwrap();
        assert_eq!(def.name, "ws");
        assert_eq!(def.mod_path, temp.path());

        let requires = def.required_mods().unwrap();
        assert_eq!(requires.len(), 3);
        assert_eq!(requires[0].to_string(), "github.com/acme/net@^1.2");
        assert_eq!(requires[1].to_string(), "github.com/acme/tools#main");
        assert_eq!(requires[2].to_string(), "github.com/acme/any");
    }

    #[test]
    fn test_relative_path_resolves_against_mod_dir() {
        let temp = TempDir::new().unwrap();
        let ws = temp.path().join("ws");
        write_modfile(&temp.path().join("helpers"), "name: local/helpers\n");
        write_modfile(&ws, "name: ws\nrequire:\n  - name: local/helpers\n    path: ../helpers\n");

        let def = YamlModfileLoader.load_modfile(&ws).unwrap().unwrap();
        let requires = def.required_mods().unwrap();
        match &requires[0].reference {
            VersionReference::FilePath { path, raw } => {
                assert_eq!(raw, "../helpers");
                assert!(path.ends_with("helpers"));
                assert!(path.is_dir());
            }
            other => panic!("unexpected reference {other:?}"),
        }
    }

    #[test]
    fn test_multiple_selectors_rejected() {
        let entry = RequireEntry {
            name: "github.com/acme/net".to_string(),
            version: Some("1.0".to_string()),
            tag: None,
            branch: Some("main".to_string()),
            path: None,
        };
        assert!(entry.to_constraint(Path::new(".")).is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let temp = TempDir::new().unwrap();
        write_modfile(temp.path(), "name: \"\"\n");
        assert!(YamlModfileLoader.load_modfile(temp.path()).is_err());
    }

    #[test]
    fn test_save_requires_preserves_other_fields() {
        let temp = TempDir::new().unwrap();
        write_modfile(temp.path(), "name: ws\nversion: 2.0.0\n");

        let requires = vec![
            ModVersionConstraint::version("github.com/acme/net", "^1.2").unwrap(),
            ModVersionConstraint::branch("github.com/acme/tools", "dev"),
        ];
        save_requires(temp.path(), &requires).unwrap();

        let def = YamlModfileLoader.load_modfile(temp.path()).unwrap().unwrap();
        assert_eq!(def.version.as_deref(), Some("2.0.0"));
        assert_eq!(def.required_mods().unwrap(), requires);
    }

    #[test]
    fn test_require_changes() {
        let net1 = ModVersionConstraint::version("github.com/acme/net", "^1").unwrap();
        let net2 = ModVersionConstraint::version("github.com/acme/net", "^2").unwrap();
        let tools = ModVersionConstraint::any("github.com/acme/tools");
        let core = ModVersionConstraint::any("github.com/acme/core");

        let changes = RequireChanges::between(
            &[net1.clone(), tools.clone()],
            &[net2.clone(), core.clone()],
        );
        assert_eq!(changes.added, vec![core]);
        assert_eq!(changes.removed, vec![tools]);
        assert_eq!(changes.changed, vec![(net1, net2)]);
        assert!(RequireChanges::between(&[], &[]).is_empty());
    }
}

//! Mod version constraints
//!
//! A constraint names a mod and selects exactly one of: a semver requirement,
//! an explicit tag, a branch, or a local directory. Constraints come from two
//! places: `require` entries of a mod definition and command-line arguments.
//!
//! Command-line forms:
//! - `github.com/acme/net` (any version)
//! - `github.com/acme/net@^1.2` / `@v1.2.3` / `@>=1.0,<2.0`
//! - `github.com/acme/net@release-2024` (not a semver requirement, so a tag)
//! - `github.com/acme/net#main`
//! - `./path/to/mod` (a directory containing a mod definition)

use std::fmt;
use std::path::{Path, PathBuf};

use semver::VersionReq;

use crate::error::{ModError, Result};
use crate::lockfile::{InstalledModVersion, ResolvedRef};
use crate::modfile::ModfileLoader;
use crate::version::{matches_with_prerelease, parse_version_req_loose};

/// Which reference a constraint selects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionReference {
    /// Semver requirement, with the text it was parsed from
    Version { req: VersionReq, raw: String },
    Tag(String),
    Branch(String),
    /// Local mod directory (resolved), with the text it was written as
    FilePath { path: PathBuf, raw: String },
}

impl VersionReference {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            VersionReference::Version { .. } => ReferenceKind::Version,
            VersionReference::Tag(_) => ReferenceKind::Tag,
            VersionReference::Branch(_) => ReferenceKind::Branch,
            VersionReference::FilePath { .. } => ReferenceKind::FilePath,
        }
    }
}

/// Reference kind, used by the update strategy matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Version,
    Tag,
    Branch,
    FilePath,
}

/// A requested dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModVersionConstraint {
    /// Remote identity, e.g. `github.com/acme/net`
    pub name: String,
    pub reference: VersionReference,
}

impl ModVersionConstraint {
    /// Constraint on any released version
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: VersionReference::Version {
                req: VersionReq::STAR,
                raw: "*".to_string(),
            },
        }
    }

    /// Constraint from a semver requirement string
    pub fn version(name: impl Into<String>, raw: &str) -> Result<Self> {
        let req = parse_version_req_loose(raw).ok_or_else(|| ModError::InvalidConstraint {
            constraint: raw.to_string(),
            reason: "not a valid semantic version requirement".to_string(),
        })?;
        Ok(Self {
            name: name.into(),
            reference: VersionReference::Version {
                req,
                raw: raw.trim().to_string(),
            },
        })
    }

    pub fn tag(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: VersionReference::Tag(tag.into()),
        }
    }

    pub fn branch(name: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: VersionReference::Branch(branch.into()),
        }
    }

    /// Constraint on a local directory; `raw` is kept for writing back
    pub fn file_path(name: impl Into<String>, path: PathBuf, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: VersionReference::FilePath {
                path,
                raw: raw.into(),
            },
        }
    }

    /// Parse a command-line argument
    ///
    /// A string naming a directory that holds a mod definition is a file-path
    /// constraint; the mod's declared name becomes the constraint name.
    /// Relative paths are resolved against `cwd`.
    pub fn parse_arg(arg: &str, cwd: &Path, loader: &dyn ModfileLoader) -> Result<Self> {
        let arg = arg.trim();
        if arg.is_empty() {
            return Err(invalid(arg, "empty mod reference"));
        }

        let candidate = cwd.join(arg);
        if candidate.is_dir() {
            if let Some(definition) = loader.load_modfile(&candidate)? {
                let path = dunce::canonicalize(&candidate)?;
                return Ok(Self::file_path(definition.name, path, arg));
            }
        }

        parse_remote_reference(arg)
    }

    /// Parse an argument to `uninstall`, which must be a bare mod name
    pub fn parse_uninstall_arg(arg: &str) -> Result<String> {
        bare_name(arg, "uninstall takes a mod name only, without version, branch or path")
    }

    /// Parse an argument to `update`, which must not pin a new reference
    pub fn parse_update_arg(arg: &str) -> Result<String> {
        bare_name(
            arg,
            "update takes a mod name only; change the version with install instead",
        )
    }

    pub fn is_file_path(&self) -> bool {
        matches!(self.reference, VersionReference::FilePath { .. })
    }

    /// Constraint text recorded in the lock for provenance
    pub fn constraint_string(&self) -> String {
        match &self.reference {
            VersionReference::Version { raw, .. } => raw.clone(),
            VersionReference::Tag(tag) => tag.clone(),
            VersionReference::Branch(branch) => format!("#{branch}"),
            VersionReference::FilePath { raw, .. } => raw.clone(),
        }
    }

    /// Whether an installed version meets this constraint
    pub fn is_satisfied_by(&self, installed: &InstalledModVersion) -> bool {
        if installed.name() != self.name {
            return false;
        }
        match (&self.reference, &installed.resolved.reference) {
            (VersionReference::Version { req, .. }, ResolvedRef::Version { version, .. }) => {
                matches_with_prerelease(req, version)
            }
            (VersionReference::Tag(wanted), ResolvedRef::Tag { tag })
            | (VersionReference::Tag(wanted), ResolvedRef::Version { tag, .. }) => wanted == tag,
            (VersionReference::Branch(wanted), ResolvedRef::Branch { branch }) => wanted == branch,
            (VersionReference::FilePath { path, .. }, ResolvedRef::Path { path: installed }) => {
                Path::new(installed) == path
            }
            _ => false,
        }
    }

    /// Short name used as the installed alias (last path segment)
    pub fn alias(&self) -> String {
        short_name(&self.name)
    }
}

impl fmt::Display for ModVersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            VersionReference::Version { raw, .. } if raw == "*" => write!(f, "{}", self.name),
            VersionReference::Version { raw, .. } => write!(f, "{}@{raw}", self.name),
            VersionReference::Tag(tag) => write!(f, "{}@{tag}", self.name),
            VersionReference::Branch(branch) => write!(f, "{}#{branch}", self.name),
            VersionReference::FilePath { raw, .. } => write!(f, "{raw}"),
        }
    }
}

/// Last segment of a mod name
pub fn short_name(name: &str) -> String {
    name.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(name)
        .trim_end_matches(".git")
        .to_string()
}

fn invalid(arg: &str, reason: &str) -> ModError {
    ModError::InvalidArgument {
        arg: arg.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_name(arg: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(arg, "missing mod name"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(invalid(arg, "mod names cannot contain whitespace"));
    }
    Ok(())
}

fn parse_remote_reference(arg: &str) -> Result<ModVersionConstraint> {
    if arg.contains('@') && arg.contains('#') {
        return Err(invalid(arg, "specify either @version or #branch, not both"));
    }

    if let Some((name, branch)) = arg.split_once('#') {
        validate_name(arg, name)?;
        if branch.is_empty() {
            return Err(invalid(arg, "missing branch name after '#'"));
        }
        return Ok(ModVersionConstraint::branch(name, branch));
    }

    if let Some((name, selector)) = arg.split_once('@') {
        validate_name(arg, name)?;
        if selector.is_empty() {
            return Err(invalid(arg, "missing version after '@'"));
        }
        return match ModVersionConstraint::version(name, selector) {
            Ok(constraint) => Ok(constraint),
            Err(_) => Ok(ModVersionConstraint::tag(name, selector)),
        };
    }

    validate_name(arg, arg)?;
    Ok(ModVersionConstraint::any(arg))
}

fn bare_name(arg: &str, reason: &str) -> Result<String> {
    let arg = arg.trim();
    let looks_like_path = arg.starts_with('.')
        || arg.starts_with('/')
        || arg.starts_with('~')
        || Path::new(arg).is_absolute();
    if arg.contains('@') || arg.contains('#') || looks_like_path {
        return Err(invalid(arg, reason));
    }
    validate_name(arg, arg)?;
    Ok(arg.to_string())
}

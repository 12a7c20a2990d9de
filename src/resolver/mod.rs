//! Version resolution for mods
//!
//! This module handles:
//! - Listing a mod's remote tags and branches (HTTPS, then SSH)
//! - Turning a constraint into a concrete resolved reference
//! - Caching remote listings for the length of one run
//!
//! Remote access goes through [`ModRepository`], so the installer can be
//! driven against any source of tags and trees.

pub mod strategy;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs;
use std::path::Path;

use crate::constraint::{ModVersionConstraint, VersionReference};
use crate::error::{ModError, Result};
use crate::git::{self, AuthKind, GitRef, RemoteRefs};
use crate::lockfile::{ResolvedRef, ResolvedVersionConstraint};
use crate::version::DependencyVersionList;

pub use strategy::{UpdateChecks, should_update_mod};

/// Where mods are listed and fetched from
pub trait ModRepository {
    /// Tags and branch heads of the mod `name`
    fn list_refs(&self, name: &str) -> Result<RemoteRefs>;

    /// Materialize `git_ref` of `name` into `target`, returning the commit
    fn fetch(&self, name: &str, git_ref: &GitRef, target: &Path) -> Result<String>;
}

/// Mods hosted in git repositories named by their mod name
#[derive(Debug, Clone, Default)]
pub struct GitModRepository {
    auth: AuthKind,
}

impl GitModRepository {
    pub fn new(auth: AuthKind) -> Self {
        Self { auth }
    }

    /// Repository authenticated with the token in `GITHUB_TOKEN`, if any
    pub fn from_env() -> Self {
        Self::new(git::token_from_env())
    }
}

impl ModRepository for GitModRepository {
    fn list_refs(&self, name: &str) -> Result<RemoteRefs> {
        let https = git::https_url(name);
        let https_err = match git::list_remote_refs(&https, &self.auth) {
            Ok(refs) => return Ok(refs),
            Err(e) => e,
        };
        tracing::debug!(mod_name = name, error = %https_err, "HTTPS listing failed, trying SSH");

        let ssh = git::ssh_url(name);
        git::list_remote_refs(&ssh, &AuthKind::Anonymous).map_err(|ssh_err| {
            ModError::RemoteUnreachable {
                name: name.to_string(),
                https: https_err.to_string(),
                ssh: ssh_err.to_string(),
            }
        })
    }

    fn fetch(&self, name: &str, git_ref: &GitRef, target: &Path) -> Result<String> {
        let https = git::https_url(name);
        let https_err = match git::fetch_ref(&https, git_ref, target, &self.auth) {
            Ok(sha) => return Ok(sha),
            Err(e) => e,
        };
        tracing::debug!(mod_name = name, error = %https_err, "HTTPS fetch failed, trying SSH");

        if target.exists() {
            fs::remove_dir_all(target)?;
        }
        let ssh = git::ssh_url(name);
        git::fetch_ref(&ssh, git_ref, target, &AuthKind::Anonymous).map_err(|ssh_err| {
            ModError::GitCloneFailed {
                url: name.to_string(),
                reason: format!("HTTPS: {https_err}\nSSH: {ssh_err}"),
            }
        })
    }
}

/// Resolves constraints against remote tags, caching listings per mod
pub struct VersionResolver<'a> {
    repository: &'a dyn ModRepository,
    include_prerelease: bool,
    all_available: HashMap<String, RemoteRefs>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(repository: &'a dyn ModRepository, include_prerelease: bool) -> Self {
        Self {
            repository,
            include_prerelease,
            all_available: HashMap::new(),
        }
    }

    /// Remote listing of `name`, fetched at most once per resolver
    pub fn remote_refs(&mut self, name: &str) -> Result<&RemoteRefs> {
        match self.all_available.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                tracing::debug!(mod_name = name, "listing remote versions");
                let refs = self.repository.list_refs(name)?;
                Ok(entry.insert(refs))
            }
        }
    }

    /// Semver-tagged versions of `name`, most recent first
    pub fn available_versions(&mut self, name: &str) -> Result<DependencyVersionList> {
        let include_prerelease = self.include_prerelease;
        let refs = self.remote_refs(name)?;
        Ok(DependencyVersionList::from_tags(
            refs.tag_pairs(),
            include_prerelease,
        ))
    }

    pub fn tag_commit(&mut self, name: &str, tag: &str) -> Result<Option<String>> {
        Ok(self.remote_refs(name)?.tag_commit(tag).map(str::to_string))
    }

    pub fn branch_commit(&mut self, name: &str, branch: &str) -> Result<Option<String>> {
        Ok(self.remote_refs(name)?.branch_commit(branch).map(str::to_string))
    }

    /// Resolve `constraint` to a concrete reference
    ///
    /// Version requirements pick the highest satisfying tag. Local paths
    /// resolve without touching the network.
    pub fn resolve(&mut self, constraint: &ModVersionConstraint) -> Result<ResolvedVersionConstraint> {
        let name = &constraint.name;
        let (reference, commit) = match &constraint.reference {
            VersionReference::Version { req, raw } => {
                let versions = self.available_versions(name)?;
                let picked = versions.first_satisfying(req).ok_or_else(|| {
                    ModError::NoSatisfyingVersion {
                        name: name.clone(),
                        constraint: raw.clone(),
                    }
                })?;
                (
                    ResolvedRef::Version {
                        version: picked.version.clone(),
                        tag: picked.tag.clone(),
                    },
                    Some(picked.commit.clone()),
                )
            }
            VersionReference::Tag(tag) => {
                let commit =
                    self.tag_commit(name, tag)?
                        .ok_or_else(|| ModError::NoSatisfyingVersion {
                            name: name.clone(),
                            constraint: tag.clone(),
                        })?;
                (ResolvedRef::Tag { tag: tag.clone() }, Some(commit))
            }
            VersionReference::Branch(branch) => {
                let commit = self.branch_commit(name, branch)?.ok_or_else(|| {
                    ModError::DependencyResolutionFailure {
                        name: name.clone(),
                        reason: format!("branch '{branch}' not found"),
                    }
                })?;
                (
                    ResolvedRef::Branch {
                        branch: branch.clone(),
                    },
                    Some(commit),
                )
            }
            VersionReference::FilePath { path, .. } => (
                ResolvedRef::Path {
                    path: path.display().to_string(),
                },
                None,
            ),
        };

        tracing::debug!(mod_name = %name, constraint = %constraint.constraint_string(), "resolved");
        Ok(ResolvedVersionConstraint {
            name: name.clone(),
            reference,
            commit,
            constraint: constraint.constraint_string(),
        })
    }

    /// Fetch a resolved remote mod into `target`
    pub fn fetch(&self, resolved: &ResolvedVersionConstraint, target: &Path) -> Result<String> {
        let git_ref = resolved
            .git_ref()
            .ok_or_else(|| ModError::StagingFailed {
                message: format!("{} is a local mod and is not fetched", resolved.name),
            })?;
        self.repository.fetch(&resolved.name, &git_ref, target)
    }
}

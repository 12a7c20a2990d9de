//! Update strategies
//!
//! Decides whether an already-installed mod that satisfies its constraint
//! should still be re-resolved.
//!
//! | strategy    | newer version | version commit | tag commit | branch commit |
//! |-------------|:-------------:|:--------------:|:----------:|:-------------:|
//! | full        | yes           | yes            | yes        | yes           |
//! | latest      | yes           | no             | no         | yes           |
//! | development | no            | no             | no         | yes           |
//! | minimal     | no            | no             | no         | no            |

use crate::config::UpdateStrategy;
use crate::constraint::{ModVersionConstraint, ReferenceKind, VersionReference};
use crate::error::Result;
use crate::lockfile::{InstalledModVersion, ResolvedRef};

use super::VersionResolver;

/// Which checks a strategy runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateChecks {
    /// A strictly higher satisfying version exists
    pub newer_version: bool,
    /// The tag of the installed version moved
    pub version_commit: bool,
    /// An explicitly requested tag moved
    pub tag_commit: bool,
    /// The branch head moved
    pub branch_commit: bool,
}

impl UpdateChecks {
    pub fn for_strategy(strategy: UpdateStrategy) -> Self {
        let (newer_version, version_commit, tag_commit, branch_commit) = match strategy {
            UpdateStrategy::Full => (true, true, true, true),
            UpdateStrategy::Latest => (true, false, false, true),
            UpdateStrategy::Development => (false, false, false, true),
            UpdateStrategy::Minimal => (false, false, false, false),
        };
        Self {
            newer_version,
            version_commit,
            tag_commit,
            branch_commit,
        }
    }

    /// Whether the commit check runs for a reference kind
    pub fn checks_commit(&self, kind: ReferenceKind) -> bool {
        match kind {
            ReferenceKind::Version => self.version_commit,
            ReferenceKind::Tag => self.tag_commit,
            ReferenceKind::Branch => self.branch_commit,
            ReferenceKind::FilePath => false,
        }
    }
}

fn moved(remote: Option<String>, installed: &InstalledModVersion) -> bool {
    match remote {
        Some(commit) => installed.resolved.commit.as_deref() != Some(commit.as_str()),
        None => false,
    }
}

/// Whether `installed` should be replaced when `required` asks for it
///
/// `targeted` is true when the running command targets this mod, directly
/// or through an updated ancestor.
pub fn should_update_mod(
    installed: &InstalledModVersion,
    required: &ModVersionConstraint,
    targeted: bool,
    strategy: UpdateStrategy,
    resolver: &mut VersionResolver<'_>,
) -> Result<bool> {
    if !targeted {
        return Ok(false);
    }
    if !required.is_satisfied_by(installed) {
        return Ok(true);
    }

    let checks = UpdateChecks::for_strategy(strategy);
    let name = &required.name;
    let update = match (&required.reference, &installed.resolved.reference) {
        (VersionReference::FilePath { .. }, _) => true,
        (VersionReference::Version { req, .. }, ResolvedRef::Version { version, tag }) => {
            let newer = checks.newer_version
                && resolver
                    .available_versions(name)?
                    .newer_satisfying(version, req)
                    .is_some();
            newer
                || (checks.checks_commit(ReferenceKind::Version)
                    && moved(resolver.tag_commit(name, tag)?, installed))
        }
        (VersionReference::Tag(tag), _) => {
            checks.checks_commit(ReferenceKind::Tag)
                && moved(resolver.tag_commit(name, tag)?, installed)
        }
        (VersionReference::Branch(branch), _) => {
            checks.checks_commit(ReferenceKind::Branch)
                && moved(resolver.branch_commit(name, branch)?, installed)
        }
        _ => false,
    };

    if update {
        tracing::debug!(mod_name = %name, %strategy, "update available");
    }
    Ok(update)
}

//! Differences between the lock before and after a run
//!
//! Edges are compared by (parent key, dependency name). An edge only in the
//! new lock is installed, one only in the old lock is uninstalled, and one in
//! both whose content changed is upgraded or downgraded.

use std::cmp::Ordering;

use crate::lockfile::{InstalledModVersion, WorkspaceLock};

/// How an edge changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Installed,
    Uninstalled,
    Upgraded,
    Downgraded,
}

impl ChangeKind {
    pub fn verb(self) -> &'static str {
        match self {
            ChangeKind::Installed => "install",
            ChangeKind::Uninstalled => "uninstall",
            ChangeKind::Upgraded => "upgrade",
            ChangeKind::Downgraded => "downgrade",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            ChangeKind::Installed => "Installed",
            ChangeKind::Uninstalled => "Uninstalled",
            ChangeKind::Upgraded => "Upgraded",
            ChangeKind::Downgraded => "Downgraded",
        }
    }
}

/// One changed edge of the dependency tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChange {
    /// Parent key the edge hangs under
    pub parent: String,
    /// Parent keys from the root's child down to `parent` (root excluded)
    pub chain: Vec<String>,
    /// Edge after the run (absent when uninstalled)
    pub current: Option<InstalledModVersion>,
    /// Edge before the run (absent when installed)
    pub previous: Option<InstalledModVersion>,
}

impl DependencyChange {
    /// The edge this change is about
    pub fn edge(&self) -> Option<&InstalledModVersion> {
        self.current.as_ref().or(self.previous.as_ref())
    }

    pub fn name(&self) -> &str {
        self.edge().map_or("", InstalledModVersion::name)
    }
}

/// Result of comparing two locks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockDiff {
    pub installed: Vec<DependencyChange>,
    pub uninstalled: Vec<DependencyChange>,
    pub upgraded: Vec<DependencyChange>,
    pub downgraded: Vec<DependencyChange>,
}

fn classify(previous: &InstalledModVersion, current: &InstalledModVersion) -> ChangeKind {
    match (previous.resolved.version(), current.resolved.version()) {
        (Some(old), Some(new)) if new.cmp(old) == Ordering::Less => ChangeKind::Downgraded,
        _ => ChangeKind::Upgraded,
    }
}

impl LockDiff {
    /// Compare the lock before a run with the lock after it
    ///
    /// Both locks must share the same root key.
    pub fn between(old: &WorkspaceLock, new: &WorkspaceLock) -> Self {
        let mut diff = Self::default();

        for (parent, current) in new.edges() {
            let change = |previous: Option<&InstalledModVersion>| DependencyChange {
                parent: parent.to_string(),
                chain: new.parent_chain(parent),
                current: Some(current.clone()),
                previous: previous.cloned(),
            };
            match old.get(parent, current.name()) {
                None => diff.installed.push(change(None)),
                Some(previous) if !previous.same_content(current) => {
                    match classify(previous, current) {
                        ChangeKind::Downgraded => diff.downgraded.push(change(Some(previous))),
                        _ => diff.upgraded.push(change(Some(previous))),
                    }
                }
                Some(_) => {}
            }
        }

        for (parent, previous) in old.edges() {
            if new.get(parent, previous.name()).is_none() {
                diff.uninstalled.push(DependencyChange {
                    parent: parent.to_string(),
                    chain: old.parent_chain(parent),
                    current: None,
                    previous: Some(previous.clone()),
                });
            }
        }

        diff
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
            && self.uninstalled.is_empty()
            && self.upgraded.is_empty()
            && self.downgraded.is_empty()
    }

    /// Changes of one kind
    pub fn changes(&self, kind: ChangeKind) -> &[DependencyChange] {
        match kind {
            ChangeKind::Installed => &self.installed,
            ChangeKind::Uninstalled => &self.uninstalled,
            ChangeKind::Upgraded => &self.upgraded,
            ChangeKind::Downgraded => &self.downgraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::{ResolvedRef, ResolvedVersionConstraint};
    use semver::Version;

    fn edge(name: &str, version: &str, commit: &str) -> InstalledModVersion {
        let version = Version::parse(version).unwrap();
        InstalledModVersion::new(
            ResolvedVersionConstraint {
                name: name.to_string(),
                reference: ResolvedRef::Version {
                    tag: format!("v{version}"),
                    version,
                },
                commit: Some(commit.to_string()),
                constraint: "*".to_string(),
            },
            name,
        )
    }

    #[test]
    fn test_identical_locks_have_no_changes() {
        let mut lock = WorkspaceLock::new("ws");
        lock.add("ws", edge("a", "1.0.0", "c1"));
        assert!(LockDiff::between(&lock, &lock.clone()).is_empty());
    }

    #[test]
    fn test_installed_and_uninstalled() {
        let mut old = WorkspaceLock::new("ws");
        old.add("ws", edge("a", "1.0.0", "c1"));
        let mut new = WorkspaceLock::new("ws");
        new.add("ws", edge("b", "2.0.0", "c2"));

        let diff = LockDiff::between(&old, &new);
        assert_eq!(diff.installed.len(), 1);
        assert_eq!(diff.installed[0].name(), "b");
        assert_eq!(diff.uninstalled.len(), 1);
        assert_eq!(diff.uninstalled[0].name(), "a");
        assert!(diff.upgraded.is_empty());
    }

    #[test]
    fn test_upgrade_and_downgrade_by_version() {
        let mut old = WorkspaceLock::new("ws");
        old.add("ws", edge("a", "1.0.0", "c1"));
        old.add("ws", edge("b", "2.0.0", "c2"));
        let mut new = WorkspaceLock::new("ws");
        new.add("ws", edge("a", "1.1.0", "c3"));
        new.add("ws", edge("b", "1.9.0", "c4"));

        let diff = LockDiff::between(&old, &new);
        assert_eq!(diff.upgraded.len(), 1);
        assert_eq!(diff.upgraded[0].name(), "a");
        assert_eq!(diff.downgraded.len(), 1);
        assert_eq!(diff.downgraded[0].name(), "b");
        assert!(diff.installed.is_empty());
        assert!(diff.uninstalled.is_empty());
    }

    #[test]
    fn test_moved_commit_counts_as_upgrade() {
        let mut old = WorkspaceLock::new("ws");
        old.add("ws", edge("a", "1.0.0", "c1"));
        let mut new = WorkspaceLock::new("ws");
        new.add("ws", edge("a", "1.0.0", "c9"));

        let diff = LockDiff::between(&old, &new);
        assert_eq!(diff.upgraded.len(), 1);
    }

    #[test]
    fn test_nested_change_carries_chain() {
        let mut old = WorkspaceLock::new("ws");
        old.add("ws", edge("a", "1.0.0", "c1"));
        let mut new = old.clone();
        new.add("a@v1.0.0", edge("b", "1.0.0", "c2"));

        let diff = LockDiff::between(&old, &new);
        assert_eq!(diff.installed.len(), 1);
        assert_eq!(diff.installed[0].parent, "a@v1.0.0");
        assert_eq!(diff.installed[0].chain, vec!["a@v1.0.0".to_string()]);
    }
}

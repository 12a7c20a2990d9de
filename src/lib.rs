//! moddeps - dependency installer for git-hosted mods
//!
//! A workspace declares the mods it requires in `mod.yaml`. This crate resolves
//! those requirements against git tags, branches, or local directories, stages the
//! resolved mods transactionally into `.mods/`, and records the resolved tree in
//! `mod.lock`.
//!
//! The entry points are [`installer::install_workspace_dependencies`],
//! [`installer::uninstall_workspace_dependencies`] and [`installer::Pruner`].

pub mod cancel;
pub mod config;
pub mod constraint;
pub mod error;
pub mod git;
pub mod installer;
pub mod lockfile;
pub mod modfile;
pub mod resolver;
pub mod transaction;
pub mod ui;
pub mod version;
pub mod workspace;

pub use cancel::CancelToken;
pub use config::{Command, InstallOptions, UpdateStrategy};
pub use constraint::{ModVersionConstraint, VersionReference};
pub use error::{ModError, Result};
pub use installer::{
    InstallContext, InstallReport, LockDiff, Pruner, install_workspace_dependencies,
    prune_workspace, uninstall_workspace_dependencies,
};
pub use lockfile::{InstalledModVersion, ResolvedVersionConstraint, WorkspaceLock};
pub use modfile::{ModDefinition, ModfileLoader, YamlModfileLoader};
pub use resolver::{GitModRepository, ModRepository, VersionResolver};

//! Dependency graph installation
//!
//! This module handles:
//! - Walking a workspace's required mods and their requirements recursively
//! - Reusing compatible installations from this run or the previous lock
//! - Resolving, fetching and staging new or updated mods
//! - Committing the staged batch, writing the lock and mod.yaml, pruning
//!
//! A run keeps two locks: the one found on disk and the one being built.
//! The mods directory only changes when the staged batch is committed.

pub mod diff;
pub mod prune;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::{Command, InstallOptions};
use crate::constraint::{ModVersionConstraint, VersionReference};
use crate::error::{ModError, Result};
use crate::lockfile::{InstalledModVersion, WorkspaceLock};
use crate::modfile::{self, ModDefinition, ModfileLoader, RequireChanges};
use crate::resolver::{ModRepository, VersionResolver, should_update_mod};
use crate::transaction::{self, Staging};
use crate::workspace::Workspace;

pub use diff::{ChangeKind, DependencyChange, LockDiff};
pub use prune::{PruneResult, Pruner};

/// Collaborators of an install run
pub struct InstallContext<'a> {
    pub repository: &'a dyn ModRepository,
    pub loader: &'a dyn ModfileLoader,
    pub cancel: CancelToken,
}

impl<'a> InstallContext<'a> {
    pub fn new(repository: &'a dyn ModRepository, loader: &'a dyn ModfileLoader) -> Self {
        Self {
            repository,
            loader,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Outcome of an install, update or uninstall run
#[derive(Debug)]
pub struct InstallReport {
    /// Workspace mod name
    pub workspace: String,
    pub command: Command,
    pub diff: LockDiff,
    pub require_changes: RequireChanges,
    pub pruned: PruneResult,
    pub dry_run: bool,
    /// Failures tolerated because of `--force`
    pub suppressed: Option<ModError>,
}

/// Which mods the running command asks to re-check
#[derive(Debug, Clone, PartialEq, Eq)]
enum Targets {
    Nothing,
    Everything,
    Named(BTreeSet<String>),
}

impl Targets {
    fn matches(&self, name: &str) -> bool {
        match self {
            Targets::Nothing => false,
            Targets::Everything => true,
            Targets::Named(names) => names.contains(name),
        }
    }
}

/// A mod loaded during this run
#[derive(Debug, Clone)]
struct DependencyMod {
    definition: ModDefinition,
    installed: InstalledModVersion,
}

/// Mutable state of one run
struct InstallData<'a> {
    /// Lock before this run
    lock: WorkspaceLock,
    /// Lock being built
    new_lock: WorkspaceLock,
    resolver: VersionResolver<'a>,
    /// Mods loaded and walked in this run, by dependency path
    mods: HashMap<String, DependencyMod>,
}

/// Walks and installs the dependency graph of one workspace
struct ModInstaller<'a> {
    ctx: &'a InstallContext<'a>,
    opts: &'a InstallOptions,
    mods_dir: PathBuf,
    targets: Targets,
    staging: Staging,
    data: InstallData<'a>,
}

impl<'a> ModInstaller<'a> {
    fn new(
        ctx: &'a InstallContext<'a>,
        opts: &'a InstallOptions,
        workspace: &Workspace,
        targets: Targets,
        staging: Staging,
    ) -> Self {
        Self {
            ctx,
            opts,
            mods_dir: workspace.mods_dir(),
            targets,
            staging,
            data: InstallData {
                lock: workspace.lock.clone(),
                new_lock: WorkspaceLock::new(workspace.name()),
                resolver: VersionResolver::new(ctx.repository, opts.include_prerelease),
                mods: HashMap::new(),
            },
        }
    }

    /// Install `required` under `parent`, collecting per-mod failures
    fn install_mods(
        &mut self,
        parent: &str,
        required: &[ModVersionConstraint],
        force_update: bool,
    ) -> Result<()> {
        self.ctx.cancel.check()?;

        let mut errors = Vec::new();
        for mod_constraint in required {
            match self.install_mod(parent, mod_constraint, force_update) {
                Ok(()) => {}
                Err(ModError::Cancelled) => return Err(ModError::Cancelled),
                Err(e) => {
                    tracing::warn!(parent, mod_name = %mod_constraint.name, error = %e, "dependency failed");
                    errors.push(e);
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ModError::DependencyInstallFailed {
                action: self.opts.command.action(),
                failed: errors.len(),
                total: required.len(),
                errors,
            })
        }
    }

    fn install_mod(
        &mut self,
        parent: &str,
        required: &ModVersionConstraint,
        force_update: bool,
    ) -> Result<()> {
        let targeted = force_update || self.targets.matches(&required.name);

        // Handled earlier in this run: never fetched or walked twice.
        if let Some(existing) = self.data.new_lock.find_compatible(required).cloned() {
            let update = !required.is_file_path()
                && should_update_mod(
                    &existing,
                    required,
                    targeted,
                    self.opts.strategy,
                    &mut self.data.resolver,
                )?;
            if !update {
                tracing::debug!(parent, dependency = %existing.dependency_path(), "reusing from this run");
                self.data.new_lock.add(parent, existing.for_constraint(required));
                return Ok(());
            }
        }

        if let Some(existing) = self.installed_in_lock(required) {
            let update = should_update_mod(
                &existing,
                required,
                targeted,
                self.opts.strategy,
                &mut self.data.resolver,
            );
            let result = match update {
                Ok(false) => {
                    tracing::debug!(parent, dependency = %existing.dependency_path(), "reusing installed");
                    return self.reuse(parent, required, &existing, force_update);
                }
                Ok(true) => self.install_fresh(parent, required, force_update),
                Err(e) => Err(e),
            };
            return result.or_else(|e| self.keep_installed(parent, required, &existing, force_update, e));
        }

        self.install_fresh(parent, required, force_update)
    }

    /// Fall back to the previous installation when its update failed
    ///
    /// The failure is still returned, so it only survives a `--force` run.
    fn keep_installed(
        &mut self,
        parent: &str,
        required: &ModVersionConstraint,
        existing: &InstalledModVersion,
        force_update: bool,
        error: ModError,
    ) -> Result<()> {
        if matches!(error, ModError::Cancelled) || self.data.new_lock.get(parent, &required.name).is_some() {
            return Err(error);
        }
        tracing::warn!(
            parent,
            dependency = %existing.dependency_path(),
            error = %error,
            "update failed, keeping installed version"
        );
        if let Err(reuse_error) = self.reuse(parent, required, existing, force_update) {
            tracing::debug!(error = %reuse_error, "installed version is incomplete too");
        }
        Err(error)
    }

    /// Compatible installation from the previous lock whose files are present
    fn installed_in_lock(&self, required: &ModVersionConstraint) -> Option<InstalledModVersion> {
        let existing = self.data.lock.find_compatible(required)?;
        self.mod_dir(existing)
            .is_dir()
            .then(|| existing.clone())
    }

    fn mod_dir(&self, installed: &InstalledModVersion) -> PathBuf {
        if installed.resolved.is_local() {
            PathBuf::from(installed.dependency_path())
        } else {
            self.mods_dir.join(installed.dependency_path())
        }
    }

    /// Record an existing installation under `parent` and walk its requirements
    fn reuse(
        &mut self,
        parent: &str,
        required: &ModVersionConstraint,
        existing: &InstalledModVersion,
        force_update: bool,
    ) -> Result<()> {
        let edge = existing.for_constraint(required);
        let dir = self.mod_dir(&edge);
        self.data.new_lock.add(parent, edge.clone());
        self.walk(edge, &dir, force_update)
    }

    fn install_fresh(
        &mut self,
        parent: &str,
        required: &ModVersionConstraint,
        force_update: bool,
    ) -> Result<()> {
        let mut resolved = self.data.resolver.resolve(required)?;
        let dependency_path = resolved.dependency_path();

        let dir = match &required.reference {
            VersionReference::FilePath { path, .. } => path.clone(),
            _ => {
                let target = self.staging.path_for(&dependency_path);
                if !self.staging.contains(&dependency_path) {
                    if target.exists() {
                        std::fs::remove_dir_all(&target)?;
                    }
                    tracing::info!(dependency = %dependency_path, "fetching");
                    let commit = self.data.resolver.fetch(&resolved, &target)?;
                    resolved.commit = Some(commit);
                    if self.ctx.loader.load_modfile(&target)?.is_none() {
                        std::fs::remove_dir_all(&target)?;
                        return Err(ModError::MissingModDefinition {
                            path: dependency_path,
                        });
                    }
                    self.staging.add(dependency_path.clone());
                }
                target
            }
        };

        let installed = InstalledModVersion::new(resolved, required.alias());
        let replaced = self
            .data
            .lock
            .get(parent, &required.name)
            .is_some_and(|previous| !previous.same_content(&installed));

        // Edge first, so a cycle back to this mod finds it.
        self.data.new_lock.add(parent, installed.clone());
        self.walk(installed, &dir, force_update || replaced)
    }

    /// Load the mod in `dir` and install its requirements, once per run
    fn walk(&mut self, installed: InstalledModVersion, dir: &Path, force_update: bool) -> Result<()> {
        let dependency_path = installed.dependency_path();
        if self.data.mods.contains_key(&dependency_path) {
            return Ok(());
        }

        let mut definition =
            self.ctx
                .loader
                .load_modfile(dir)?
                .ok_or_else(|| ModError::MissingModDefinition {
                    path: dir.display().to_string(),
                })?;
        definition.set_dependency_config(dependency_path.clone());

        let loaded = DependencyMod {
            definition,
            installed,
        };
        let parent_key = loaded.definition.install_cache_key().to_string();
        let requires = loaded.definition.required_mods()?;
        tracing::debug!(
            dependency = %parent_key,
            alias = %loaded.installed.alias,
            requires = requires.len(),
            "loaded"
        );
        self.data.mods.insert(dependency_path, loaded);

        if requires.is_empty() {
            return Ok(());
        }
        self.install_mods(&parent_key, &requires, force_update)
    }
}

/// Requires after applying the command's arguments, and what it targets
fn plan_requires(
    opts: &InstallOptions,
    workspace: &Workspace,
    before: &[ModVersionConstraint],
) -> Result<(Vec<ModVersionConstraint>, Targets)> {
    match opts.command {
        Command::Install => {
            let mut after = before.to_vec();
            for arg in &opts.args {
                let constraint = ModVersionConstraint::parse_arg(
                    arg,
                    &workspace.root,
                    &modfile::YamlModfileLoader,
                )?;
                match after.iter_mut().find(|c| c.name == constraint.name) {
                    Some(existing) => *existing = constraint,
                    None => after.push(constraint),
                }
            }
            Ok((after, Targets::Nothing))
        }
        Command::Update => {
            if opts.args.is_empty() {
                return Ok((before.to_vec(), Targets::Everything));
            }
            let mut names = BTreeSet::new();
            for arg in &opts.args {
                let name = ModVersionConstraint::parse_update_arg(arg)?;
                let known = workspace.lock.contains_mod_name(&name)
                    || before.iter().any(|c| c.name == name);
                if !known {
                    tracing::warn!(mod_name = %name, "not installed, nothing to update");
                }
                names.insert(name);
            }
            Ok((before.to_vec(), Targets::Named(names)))
        }
        Command::Uninstall => {
            if opts.args.is_empty() {
                return Err(ModError::InvalidArgument {
                    arg: String::new(),
                    reason: "uninstall needs at least one mod name".to_string(),
                });
            }
            let mut after = before.to_vec();
            for arg in &opts.args {
                let name = ModVersionConstraint::parse_uninstall_arg(arg)?;
                let count = after.len();
                after.retain(|c| c.name != name);
                if after.len() == count {
                    tracing::warn!(mod_name = %name, "not required by the workspace, skipping");
                }
            }
            Ok((after, Targets::Nothing))
        }
    }
}

/// Install, update or uninstall the dependencies of a workspace
///
/// Resolution and staging happen first; the mods directory, lock and
/// mod.yaml are only written once the whole graph was handled. Without
/// `force`, any failure leaves all three untouched.
pub fn install_workspace_dependencies(
    ctx: &InstallContext<'_>,
    opts: &InstallOptions,
) -> Result<InstallReport> {
    let workspace = Workspace::open(&opts.workspace_root, ctx.loader)?;
    let before = workspace.definition.required_mods()?;
    let (after, targets) = plan_requires(opts, &workspace, &before)?;
    let require_changes = RequireChanges::between(&before, &after);

    let swept = transaction::sweep_stale(&workspace.root)?;
    if swept > 0 {
        tracing::info!(swept, "removed leftovers of an interrupted run");
    }
    let staging = Staging::begin(&workspace.root, &workspace.mods_dir())?;

    let mut installer = ModInstaller::new(ctx, opts, &workspace, targets, staging);
    let result = installer.install_mods(workspace.name(), &after, false);
    let ModInstaller { staging, data, .. } = installer;

    let suppressed = match result {
        Ok(()) => None,
        Err(ModError::Cancelled) => return Err(ModError::Cancelled),
        Err(e) if opts.force => {
            tracing::warn!(error = %e, "continuing despite failures (--force)");
            Some(e)
        }
        Err(e) => return Err(e),
    };

    ctx.cancel.check()?;
    if opts.dry_run {
        staging.rollback();
    } else {
        let committed = staging.commit()?;
        tracing::info!(committed, "mods directory updated");
    }

    let diff = LockDiff::between(&data.lock, &data.new_lock);
    let mut pruned = PruneResult::new();
    if !opts.dry_run {
        data.new_lock.save(&workspace.lock_path())?;
        if !require_changes.is_empty() {
            modfile::save_requires(&workspace.root, &after)?;
        }
        if opts.prune {
            pruned = Pruner::new(workspace.mods_dir()).prune(&data.new_lock)?;
        }
    }

    Ok(InstallReport {
        workspace: workspace.name().to_string(),
        command: opts.command,
        diff,
        require_changes,
        pruned,
        dry_run: opts.dry_run,
        suppressed,
    })
}

/// Remove mods from the workspace requires and reinstall what remains
pub fn uninstall_workspace_dependencies(
    ctx: &InstallContext<'_>,
    opts: &InstallOptions,
) -> Result<InstallReport> {
    let opts = opts.clone().with_command(Command::Uninstall);
    install_workspace_dependencies(ctx, &opts)
}

/// Remove mod directories the workspace lock no longer references
pub fn prune_workspace(workspace_root: &Path, loader: &dyn ModfileLoader) -> Result<PruneResult> {
    let workspace = Workspace::open(workspace_root, loader)?;
    Pruner::new(workspace.mods_dir()).prune(&workspace.lock)
}

//! Workspace layout constants and install options
//!
//! ## Workspace Structure
//!
//! ```text
//! <workspace>/
//! ├── mod.yaml           # Workspace mod definition
//! ├── mod.lock           # Resolved dependency tree (JSON)
//! ├── .mods/             # Installed mods, one directory per dependency path
//! └── .mods.tmp.XXXXXX/  # Shadow directory, only present during a run
//! ```

use std::fmt;
use std::path::PathBuf;

/// Mod definition filename
pub const MODFILE_NAME: &str = "mod.yaml";

/// Lock filename
pub const LOCKFILE_NAME: &str = "mod.lock";

/// Installed mods directory
pub const MODS_DIR: &str = ".mods";

/// Prefix of shadow directories created next to the mods directory
pub const SHADOW_DIR_PREFIX: &str = ".mods.tmp.";

/// Environment variable holding a GitHub access token
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the default update strategy
pub const STRATEGY_ENV: &str = "MODDEPS_STRATEGY";

/// How aggressively already-satisfied dependencies are re-checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UpdateStrategy {
    /// Check for newer versions and moved commits of everything
    Full,
    /// Check for newer versions and moved branches
    #[default]
    Latest,
    /// Only follow branch heads
    Development,
    /// Never re-check a satisfied dependency
    Minimal,
}

impl UpdateStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateStrategy::Full => "full",
            UpdateStrategy::Latest => "latest",
            UpdateStrategy::Development => "development",
            UpdateStrategy::Minimal => "minimal",
        }
    }
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The command driving an install run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Install,
    Update,
    Uninstall,
}

impl Command {
    /// Verb used in aggregated failure messages
    pub fn action(self) -> &'static str {
        match self {
            Command::Install => "install",
            Command::Update => "update",
            Command::Uninstall => "uninstall",
        }
    }
}

/// Options for one install/update/uninstall run
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Workspace root (directory containing mod.yaml)
    pub workspace_root: PathBuf,
    /// Mod references given on the command line
    pub args: Vec<String>,
    pub command: Command,
    /// Resolve and stage, but never commit or write state
    pub dry_run: bool,
    /// Commit whatever succeeded even if some dependencies failed
    pub force: bool,
    /// Remove orphaned mod directories after the run
    pub prune: bool,
    /// Consider prerelease tags when resolving versions
    pub include_prerelease: bool,
    pub strategy: UpdateStrategy,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("."),
            args: Vec::new(),
            command: Command::Install,
            dry_run: false,
            force: false,
            prune: true,
            include_prerelease: false,
            strategy: UpdateStrategy::default(),
        }
    }
}

impl InstallOptions {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            ..Self::default()
        }
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.command = command;
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

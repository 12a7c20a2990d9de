//! CLI definitions using clap derive API

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use moddeps::config::{STRATEGY_ENV, UpdateStrategy};

/// moddeps - dependency installer for git-hosted mods
///
/// Resolve the mods a workspace requires, install them into .mods and record
/// the resolved tree in mod.lock.
#[derive(Parser, Debug)]
#[command(
    name = "moddeps",
    author,
    version,
    color = clap::ColorChoice::Auto,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Dependency installer for git-hosted mods",
    long_about = "moddeps resolves the mods required in mod.yaml against git tags, branches \
                  or local directories, installs them into .mods/ atomically and records the \
                  resolved dependency tree in mod.lock.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  moddeps install\n    \
                  moddeps install github.com/acme/net@^1.2\n    \
                  moddeps update --strategy full\n    \
                  moddeps uninstall github.com/acme/net\n    \
                  moddeps prune"
)]
pub struct Cli {
    /// Workspace directory (defaults to the nearest directory with a mod.yaml)
    #[arg(long, short = 'w', global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the workspace's required mods, optionally adding new ones
    Install(InstallArgs),

    /// Re-resolve installed mods according to an update strategy
    Update(UpdateArgs),

    /// Remove mods from the workspace requirements
    Uninstall(UninstallArgs),

    /// Delete mod directories the lock no longer references
    Prune,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Flags shared by install and update
#[derive(Args, Debug, Clone, Default)]
pub struct RunFlags {
    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep whatever succeeded even if some dependencies fail
    #[arg(long)]
    pub force: bool,

    /// Keep mod directories the lock no longer references
    #[arg(long)]
    pub no_prune: bool,

    /// Consider prerelease versions
    #[arg(long)]
    pub pre: bool,
}

/// Arguments for the install command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                   Install everything mod.yaml requires:\n    moddeps install\n\n\
                   Add a mod with a version range:\n    moddeps install github.com/acme/net@^1.2\n\n\
                   Add a mod at a tag:\n    moddeps install github.com/acme/net@nightly\n\n\
                   Follow a branch:\n    moddeps install github.com/acme/net#main\n\n\
                   Add a local mod directory:\n    moddeps install ../helpers")]
pub struct InstallArgs {
    /// Mods to add to mod.yaml (name, name@version, name@tag, name#branch or a path)
    pub mods: Vec<String>,

    #[command(flatten)]
    pub flags: RunFlags,
}

/// Arguments for the update command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Update everything:\n    moddeps update\n\n\
                  Update one mod and its dependencies:\n    moddeps update github.com/acme/net\n\n\
                  Also refetch moved tags:\n    moddeps update --strategy full")]
pub struct UpdateArgs {
    /// Mods to update (all when omitted)
    pub mods: Vec<String>,

    /// Which changes count as updates
    #[arg(long, value_enum, env = STRATEGY_ENV, default_value_t = UpdateStrategy::Latest)]
    pub strategy: UpdateStrategy,

    #[command(flatten)]
    pub flags: RunFlags,
}

/// Arguments for the uninstall command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Uninstall a mod:\n    moddeps uninstall github.com/acme/net\n\n\
                  Preview the removal:\n    moddeps uninstall github.com/acme/net --dry-run")]
pub struct UninstallArgs {
    /// Mod names to remove
    #[arg(required = true)]
    pub mods: Vec<String>,

    /// Show what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Keep mod directories the lock no longer references
    #[arg(long)]
    pub no_prune: bool,
}

/// Arguments for completions command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Generate bash completions:\n    moddeps completions bash > ~/.bash_completion.d/moddeps\n\n\
                  Generate zsh completions:\n    moddeps completions zsh > ~/.zfunc/_moddeps")]
pub struct CompletionsArgs {
    /// Shell type
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

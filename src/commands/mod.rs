//! Command implementations for the moddeps CLI
//!
//! Each command is a thin wrapper: it locates the workspace, turns its
//! arguments into [`InstallOptions`] and hands over to the library.

pub mod completions;
pub mod install;
pub mod prune;
pub mod uninstall;
pub mod update;

use std::path::PathBuf;

use moddeps::error::{ModError, Result};
use moddeps::installer::{InstallContext, InstallReport};
use moddeps::workspace::Workspace;
use moddeps::{CancelToken, GitModRepository, InstallOptions, YamlModfileLoader, ui};

use crate::cli::RunFlags;

/// Process-wide state shared by all commands
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub workspace: Option<PathBuf>,
    pub verbose: bool,
    pub cancel: CancelToken,
}

impl Session {
    /// Workspace root: `--workspace` as given, or the nearest directory
    /// upward from the current one that holds a mod.yaml
    pub fn workspace_root(&self) -> Result<PathBuf> {
        if let Some(path) = &self.workspace {
            return Ok(path.clone());
        }
        let current_dir = std::env::current_dir().map_err(|e| ModError::IoError {
            message: format!("Failed to get current directory: {e}"),
        })?;
        Workspace::find_from(&current_dir).ok_or_else(|| ModError::WorkspaceNotFound {
            path: current_dir.display().to_string(),
        })
    }
}

fn apply_flags(mut opts: InstallOptions, flags: &RunFlags) -> InstallOptions {
    opts.dry_run = flags.dry_run;
    opts.force = flags.force;
    opts.prune = !flags.no_prune;
    opts.include_prerelease = flags.pre;
    opts
}

type RunFn = fn(&InstallContext<'_>, &InstallOptions) -> Result<InstallReport>;

/// Run against the git-hosted repository with a spinner, then print the summary
fn execute(session: &Session, opts: &InstallOptions, message: &str, run: RunFn) -> Result<()> {
    let repository = GitModRepository::from_env();
    let ctx = InstallContext::new(&repository, &YamlModfileLoader).with_cancel(session.cancel.clone());

    let mut progress = ui::progress_reporter(message, session.verbose);
    match run(&ctx, opts) {
        Ok(report) => {
            progress.finish();
            println!("{}", ui::render_summary(&report));
            Ok(())
        }
        Err(e) => {
            progress.abandon();
            Err(e)
        }
    }
}

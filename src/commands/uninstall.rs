//! Uninstall command CLI wrapper

use moddeps::error::Result;
use moddeps::installer::uninstall_workspace_dependencies;
use moddeps::{Command, InstallOptions};

use super::{Session, execute};
use crate::cli::UninstallArgs;

/// Run uninstall command
pub fn run(session: &Session, args: UninstallArgs) -> Result<()> {
    let root = session.workspace_root()?;
    let mut opts = InstallOptions::new(root)
        .with_command(Command::Uninstall)
        .with_args(args.mods);
    opts.dry_run = args.dry_run;
    opts.prune = !args.no_prune;
    execute(session, &opts, "Uninstalling mods", uninstall_workspace_dependencies)
}

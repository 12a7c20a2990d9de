//! Install command CLI wrapper

use moddeps::error::Result;
use moddeps::installer::install_workspace_dependencies;
use moddeps::{Command, InstallOptions};

use super::{Session, apply_flags, execute};
use crate::cli::InstallArgs;

/// Run install command
///
/// Installs everything mod.yaml requires. Mods given as arguments are added
/// to mod.yaml first, replacing an existing entry of the same name.
pub fn run(session: &Session, args: InstallArgs) -> Result<()> {
    let root = session.workspace_root()?;
    let opts = apply_flags(
        InstallOptions::new(root)
            .with_command(Command::Install)
            .with_args(args.mods),
        &args.flags,
    );
    execute(session, &opts, "Installing mods", install_workspace_dependencies)
}

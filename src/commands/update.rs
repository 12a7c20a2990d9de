//! Update command CLI wrapper

use moddeps::error::Result;
use moddeps::installer::install_workspace_dependencies;
use moddeps::{Command, InstallOptions};

use super::{Session, apply_flags, execute};
use crate::cli::UpdateArgs;

/// Run update command
///
/// Without arguments every installed mod is re-checked; otherwise only the
/// named mods and everything below them.
pub fn run(session: &Session, args: UpdateArgs) -> Result<()> {
    let root = session.workspace_root()?;
    let opts = apply_flags(
        InstallOptions::new(root)
            .with_command(Command::Update)
            .with_strategy(args.strategy)
            .with_args(args.mods),
        &args.flags,
    );
    tracing::debug!(strategy = %opts.strategy, "updating");
    execute(session, &opts, "Updating mods", install_workspace_dependencies)
}

//! Prune command CLI wrapper

use console::Style;
use moddeps::YamlModfileLoader;
use moddeps::error::Result;
use moddeps::installer::prune_workspace;

use super::Session;

/// Run prune command
pub fn run(session: &Session) -> Result<()> {
    let root = session.workspace_root()?;
    let pruned = prune_workspace(&root, &YamlModfileLoader)?;

    if pruned.is_empty() {
        println!("Nothing to prune");
        return Ok(());
    }
    for (name, versions) in &pruned {
        for version in versions {
            println!(
                "{} {name} {}",
                Style::new().red().apply_to("Removed"),
                Style::new().cyan().apply_to(version)
            );
        }
    }
    Ok(())
}

//! Summary rendering for finished runs
//!
//! Each change category is printed as a tree rooted at the workspace, with
//! unchanged ancestors dimmed so the path to a nested change stays visible.

use std::collections::BTreeMap;
use std::fmt::Write;

use console::Style;

use crate::installer::{ChangeKind, DependencyChange, InstallReport};
use crate::lockfile::InstalledModVersion;

const CATEGORIES: [ChangeKind; 4] = [
    ChangeKind::Installed,
    ChangeKind::Upgraded,
    ChangeKind::Downgraded,
    ChangeKind::Uninstalled,
];

#[derive(Default)]
struct TreeNode {
    /// Rendered label; ancestors without a change of their own have none
    label: Option<String>,
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    fn insert(&mut self, path: &[String], label: String) {
        match path.split_first() {
            None => self.label = Some(label),
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(rest, label),
        }
    }

    fn render(&self, out: &mut String, prefix: &str) {
        let count = self.children.len();
        for (i, (key, child)) in self.children.iter().enumerate() {
            let last = i + 1 == count;
            let branch = if last { "└── " } else { "├── " };
            let label = match &child.label {
                Some(label) => label.clone(),
                None => Style::new().dim().apply_to(key).to_string(),
            };
            let _ = writeln!(out, "{prefix}{branch}{label}");

            let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
            child.render(out, &nested);
        }
    }
}

fn mod_label(edge: &InstalledModVersion) -> String {
    format!(
        "{} {}",
        Style::new().bold().apply_to(edge.name()),
        Style::new().cyan().apply_to(edge.resolved.display_version())
    )
}

fn change_label(kind: ChangeKind, change: &DependencyChange) -> String {
    let Some(edge) = change.edge() else {
        return String::new();
    };
    let label = mod_label(edge);
    match (kind, &change.previous) {
        (ChangeKind::Upgraded | ChangeKind::Downgraded, Some(previous)) => format!(
            "{label} {}",
            Style::new()
                .dim()
                .apply_to(format!("(from {})", previous.resolved.display_version()))
        ),
        _ => label,
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}

fn heading(kind: ChangeKind, count: usize, dry_run: bool) -> String {
    let verb = if dry_run {
        format!("Would {}", kind.verb())
    } else {
        kind.past_tense().to_string()
    };
    let style = match kind {
        ChangeKind::Installed | ChangeKind::Upgraded => Style::new().green().bold(),
        ChangeKind::Downgraded => Style::new().yellow().bold(),
        ChangeKind::Uninstalled => Style::new().red().bold(),
    };
    format!("{}", style.apply_to(format!("{verb} {}:", plural(count, "mod", "mods"))))
}

/// Tree of one change category, rooted at the workspace
pub fn render_changes(workspace: &str, kind: ChangeKind, changes: &[DependencyChange]) -> String {
    let mut root = TreeNode::default();
    for change in changes {
        let Some(edge) = change.edge() else { continue };
        let mut path = change.chain.clone();
        path.push(edge.dependency_path());
        root.insert(&path, change_label(kind, change));
    }

    let mut out = format!("{}\n", Style::new().bold().apply_to(workspace));
    root.render(&mut out, "");
    out
}

/// Human-readable summary of an install, update or uninstall run
pub fn render_summary(report: &InstallReport) -> String {
    let mut out = String::new();

    let changes = &report.require_changes;
    let file_verb = if report.dry_run { "Would add" } else { "Added" };
    for added in &changes.added {
        let _ = writeln!(out, "{file_verb} {added} to mod.yaml");
    }
    let file_verb = if report.dry_run { "Would change" } else { "Changed" };
    for (before, after) in &changes.changed {
        let _ = writeln!(out, "{file_verb} {before} to {after} in mod.yaml");
    }
    let file_verb = if report.dry_run { "Would remove" } else { "Removed" };
    for removed in &changes.removed {
        let _ = writeln!(out, "{file_verb} {removed} from mod.yaml");
    }
    if !changes.is_empty() {
        out.push('\n');
    }

    if report.diff.is_empty() {
        let _ = writeln!(out, "{}", Style::new().green().apply_to("All mods are up to date"));
    }
    for kind in CATEGORIES {
        let changes = report.diff.changes(kind);
        if changes.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{}", heading(kind, changes.len(), report.dry_run));
        out.push_str(&render_changes(&report.workspace, kind, changes));
        out.push('\n');
    }

    if !report.pruned.is_empty() {
        let removed: usize = report.pruned.values().map(Vec::len).sum();
        let _ = writeln!(
            out,
            "{}",
            Style::new()
                .bold()
                .apply_to(format!("Pruned {}:", plural(removed, "directory", "directories")))
        );
        for (name, versions) in &report.pruned {
            let _ = writeln!(out, "  {name} {}", versions.join(", "));
        }
    }

    if let Some(error) = &report.suppressed {
        let _ = writeln!(
            out,
            "{} {error}",
            Style::new().yellow().bold().apply_to("Ignored (--force):")
        );
    }

    out.trim_end().to_string()
}

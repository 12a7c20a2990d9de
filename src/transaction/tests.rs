//! Tests for shadow-directory staging

use super::*;
use tempfile::TempDir;

fn create_test_workspace() -> (TempDir, PathBuf, PathBuf) {
    let temp = TempDir::new().unwrap();
    let workspace_root = temp.path().to_path_buf();
    let mods_dir = workspace_root.join(".mods");
    fs::create_dir_all(&mods_dir).unwrap();
    (temp, workspace_root, mods_dir)
}

fn stage_mod(staging: &mut Staging, dependency_path: &str, content: &str) {
    let dir = staging.path_for(dependency_path);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("mod.yaml"), content).unwrap();
    staging.add(dependency_path);
}

fn shadow_dirs(root: &Path) -> usize {
    fs::read_dir(root)
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .file_name()
                .to_string_lossy()
                .starts_with(SHADOW_DIR_PREFIX)
        })
        .count()
}

#[test]
fn test_shadow_is_sibling_of_mods_dir() {
    let (_temp, root, mods_dir) = create_test_workspace();
    let staging = Staging::begin(&root, &mods_dir).unwrap();

    assert_eq!(staging.shadow_dir().parent(), Some(root.as_path()));
    assert!(!staging.shadow_dir().starts_with(&mods_dir));
    assert!(staging
        .path_for("github.com/acme/net@v1.0.0")
        .starts_with(staging.shadow_dir()));
}

#[test]
fn test_commit_copies_and_removes_shadow() {
    let (_temp, root, mods_dir) = create_test_workspace();
    let mut staging = Staging::begin(&root, &mods_dir).unwrap();
    stage_mod(&mut staging, "github.com/acme/net@v1.0.0", "name: net\n");
    stage_mod(&mut staging, "github.com/acme/tools#main", "name: tools\n");

    assert_eq!(staging.commit().unwrap(), 2);

    assert_eq!(
        fs::read_to_string(mods_dir.join("github.com/acme/net@v1.0.0/mod.yaml")).unwrap(),
        "name: net\n"
    );
    assert!(mods_dir.join("github.com/acme/tools#main/mod.yaml").exists());
    assert_eq!(shadow_dirs(&root), 0);
}

#[test]
fn test_commit_replaces_existing_mod_dir() {
    let (_temp, root, mods_dir) = create_test_workspace();
    let existing = mods_dir.join("github.com/acme/tools#main");
    fs::create_dir_all(&existing).unwrap();
    fs::write(existing.join("stale.txt"), "old").unwrap();

    let mut staging = Staging::begin(&root, &mods_dir).unwrap();
    stage_mod(&mut staging, "github.com/acme/tools#main", "name: tools\n");
    staging.commit().unwrap();

    assert!(existing.join("mod.yaml").exists());
    assert!(!existing.join("stale.txt").exists());
}

#[test]
fn test_drop_without_commit_leaves_mods_untouched() {
    let (_temp, root, mods_dir) = create_test_workspace();
    {
        let mut staging = Staging::begin(&root, &mods_dir).unwrap();
        stage_mod(&mut staging, "github.com/acme/net@v1.0.0", "name: net\n");
    }

    assert!(!mods_dir.join("github.com").exists());
    assert_eq!(shadow_dirs(&root), 0);
}

#[test]
fn test_rollback_removes_shadow() {
    let (_temp, root, mods_dir) = create_test_workspace();
    let mut staging = Staging::begin(&root, &mods_dir).unwrap();
    stage_mod(&mut staging, "a@v1.0.0", "name: a\n");
    staging.rollback();

    assert_eq!(shadow_dirs(&root), 0);
    assert!(!mods_dir.join("a@v1.0.0").exists());
}

#[test]
fn test_unregistered_dirs_are_not_committed() {
    let (_temp, root, mods_dir) = create_test_workspace();
    let mut staging = Staging::begin(&root, &mods_dir).unwrap();
    // fetched but never added, e.g. a failed clone
    fs::create_dir_all(staging.path_for("broken@v1.0.0")).unwrap();
    stage_mod(&mut staging, "ok@v1.0.0", "name: ok\n");

    staging.commit().unwrap();
    assert!(mods_dir.join("ok@v1.0.0").exists());
    assert!(!mods_dir.join("broken@v1.0.0").exists());
}

#[test]
fn test_commit_skips_git_dir() {
    let (_temp, root, mods_dir) = create_test_workspace();
    let mut staging = Staging::begin(&root, &mods_dir).unwrap();
    stage_mod(&mut staging, "a@v1.0.0", "name: a\n");
    fs::create_dir_all(staging.path_for("a@v1.0.0").join(".git")).unwrap();
    staging.commit().unwrap();

    assert!(!mods_dir.join("a@v1.0.0/.git").exists());
}

#[test]
fn test_sweep_stale_shadow_dirs() {
    let (_temp, root, _mods_dir) = create_test_workspace();
    fs::create_dir_all(root.join(".mods.tmp.abc123/x")).unwrap();
    fs::create_dir_all(root.join(".mods.tmp.def456")).unwrap();
    fs::create_dir_all(root.join("keep")).unwrap();

    assert_eq!(sweep_stale(&root).unwrap(), 2);
    assert_eq!(shadow_dirs(&root), 0);
    assert!(root.join("keep").exists());
    assert!(root.join(".mods").exists());
}

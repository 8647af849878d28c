//! End-to-end bumps against real git repositories

use bump_version::declaration;
use bump_version::error::BumpError;
use bump_version::git::{GitTracker, VersionControl};
use bump_version::workflow::{self, BumpOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a repository holding `files`, all committed.
fn create_test_repo(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let repo = git2::Repository::init(temp_dir.path()).unwrap();

    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    let mut index = repo.index().unwrap();
    for (name, contents) in files {
        let path = temp_dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        index.add_path(Path::new(name)).unwrap();
    }
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = repo.signature().unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "Initial commit", &tree, &[])
        .unwrap();

    temp_dir
}

fn options(version_file: &Path, directive: &str) -> BumpOptions {
    let mut options = BumpOptions::new(version_file, directive);
    options.extra_files.push(version_file.to_path_buf());
    options
}

fn head_message(root: &Path) -> String {
    let repo = git2::Repository::open(root).unwrap();
    let commit = repo.head().unwrap().peel_to_commit().unwrap();
    commit.message().unwrap_or_default().to_string()
}

fn tags(root: &Path) -> Vec<String> {
    let repo = git2::Repository::open(root).unwrap();
    let names = repo.tag_names(None).unwrap();
    names.iter().flatten().map(str::to_string).collect()
}

const VERSION_GO: &str = "package version\n\nvar (\n\tVersion = \"1.2.3\"\n)\n";

#[test]
fn test_patch_bump_commits_and_tags() {
    let temp_dir = create_test_repo(&[("version.go", VERSION_GO)]);
    let version_file = temp_dir.path().join("version.go");

    let meta = workflow::run(&options(&version_file, "patch")).unwrap();

    assert_eq!(meta.old_version, "1.2.3");
    assert_eq!(meta.new_version, "1.2.4");
    assert_eq!(meta.bump_type, "patch");
    assert_eq!(
        fs::read_to_string(&version_file).unwrap(),
        "package version\n\nvar (\n\tVersion = \"1.2.4\"\n)\n"
    );
    assert_eq!(head_message(temp_dir.path()), "1.2.4");
    assert_eq!(tags(temp_dir.path()), vec!["v1.2.4".to_string()]);

    let tracker = GitTracker::open(temp_dir.path()).unwrap();
    assert!(tracker.changed_files().unwrap().is_empty());
}

#[test]
fn test_nested_version_file_keeps_package() {
    let temp_dir = create_test_repo(&[(
        "internal/buildinfo/version.go",
        "package buildinfo\n\nvar (\n\tVersion = \"0.9.0\"\n)\n",
    )]);
    let version_file = temp_dir.path().join("internal").join("buildinfo").join("version.go");

    let meta = workflow::run(&options(&version_file, "minor")).unwrap();

    assert_eq!(meta.new_version, "0.10.0");
    assert!(fs::read_to_string(&version_file)
        .unwrap()
        .starts_with("package buildinfo\n"));
    assert_eq!(tags(temp_dir.path()), vec!["v0.10.0".to_string()]);
}

#[test]
fn test_dirty_tree_aborts_before_writing() {
    let temp_dir = create_test_repo(&[("version.go", VERSION_GO)]);
    let version_file = temp_dir.path().join("version.go");
    fs::write(temp_dir.path().join("scratch.txt"), "wip").unwrap();

    let err = workflow::run(&options(&version_file, "minor")).unwrap_err();

    match err.downcast_ref::<BumpError>() {
        Some(BumpError::DirtyWorkingTree(files)) => {
            assert_eq!(files.len(), 1);
            assert!(files[0].ends_with("scratch.txt"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(fs::read_to_string(&version_file).unwrap(), VERSION_GO);
    assert_eq!(head_message(temp_dir.path()), "Initial commit");
    assert!(tags(temp_dir.path()).is_empty());
}

#[test]
fn test_dirty_extra_file_is_committed() {
    let temp_dir = create_test_repo(&[("version.go", VERSION_GO), ("CHANGELOG.md", "# Changelog\n")]);
    let version_file = temp_dir.path().join("version.go");
    let changelog = temp_dir.path().join("CHANGELOG.md");
    fs::write(&changelog, "# Changelog\n\n## 1.3.0\n").unwrap();

    let mut options = options(&version_file, "minor");
    options.extra_files.push(changelog);
    workflow::run(&options).unwrap();

    let tracker = GitTracker::open(temp_dir.path()).unwrap();
    assert!(tracker.changed_files().unwrap().is_empty());
    assert_eq!(head_message(temp_dir.path()), "1.3.0");
}

#[test]
fn test_major_bump_moves_module() {
    let temp_dir = create_test_repo(&[
        ("go.mod", "module example.com/foo\n\ngo 1.21\n"),
        ("version.go", "package foo\n\nvar (\n\tVersion = \"1.4.0\"\n)\n"),
        ("pkg/a/a.go", "package a\n\nfunc A() {}\n"),
        (
            "pkg/b/b.go",
            "package b\n\nimport (\n\t\"fmt\" // printing (tests only)\n\n\t\"example.com/foo/pkg/a\"\n)\n\nfunc B() { fmt.Println(\"x\"); a.A() }\n",
        ),
    ]);
    let root = temp_dir.path();
    let version_file = root.join("version.go");

    let meta = workflow::run(&options(&version_file, "major")).unwrap();

    assert_eq!(meta.new_version, "2.0.0");
    assert_eq!(
        meta.updated_files,
        vec![
            version_file.clone(),
            root.join("go.mod"),
            root.join("pkg").join("b").join("b.go"),
        ]
    );
    assert_eq!(
        fs::read_to_string(root.join("go.mod")).unwrap(),
        "module example.com/foo/v2\n\ngo 1.21\n"
    );
    assert!(fs::read_to_string(root.join("pkg").join("b").join("b.go"))
        .unwrap()
        .contains("\t\"example.com/foo/v2/pkg/a\"\n"));
    assert_eq!(tags(root), vec!["v2.0.0".to_string()]);

    let tracker = GitTracker::open(root).unwrap();
    assert!(tracker.changed_files().unwrap().is_empty());
}

#[test]
fn test_major_bump_without_go_mod() {
    let temp_dir = create_test_repo(&[("version.go", VERSION_GO)]);
    let version_file = temp_dir.path().join("version.go");

    let meta = workflow::run(&options(&version_file, "major")).unwrap();
    assert_eq!(meta.new_version, "2.0.0");
    assert_eq!(meta.updated_files, vec![version_file]);
}

#[test]
fn test_missing_version_file_is_seeded_from_tag() {
    let temp_dir = create_test_repo(&[("README.md", "# Demo\n")]);
    let tracker = GitTracker::open(temp_dir.path()).unwrap();
    tracker.tag("v0.3.0").unwrap();
    let version_file = temp_dir.path().join("version.go");

    let meta = workflow::run(&options(&version_file, "minor")).unwrap();

    assert_eq!(meta.old_version, "0.3.0");
    assert_eq!(meta.new_version, "0.4.0");
    assert_eq!(declaration::read_version(&version_file).unwrap().as_deref(), Some("0.4.0"));
    assert!(tracker.changed_files().unwrap().is_empty());
}

#[test]
fn test_from_git_takes_latest_tag() {
    let temp_dir = create_test_repo(&[("version.go", VERSION_GO)]);
    let tracker = GitTracker::open(temp_dir.path()).unwrap();
    tracker.tag("v1.5.0").unwrap();
    let version_file = temp_dir.path().join("version.go");

    let meta = workflow::run(&options(&version_file, "from-git")).unwrap();

    assert_eq!(meta.new_version, "1.5.0");
    assert_eq!(meta.bump_type, "from-git");
    assert_eq!(declaration::read_version(&version_file).unwrap().as_deref(), Some("1.5.0"));
    assert_eq!(head_message(temp_dir.path()), "1.5.0");
    assert_eq!(tags(temp_dir.path()), vec!["v1.5.0".to_string()]);
}

#[test]
fn test_same_version_is_rejected() {
    let temp_dir = create_test_repo(&[("version.go", VERSION_GO)]);
    let version_file = temp_dir.path().join("version.go");

    let err = workflow::run(&options(&version_file, "v1.2.3")).unwrap_err();
    assert_eq!(
        err.downcast_ref::<BumpError>(),
        Some(&BumpError::NoOpVersion("1.2.3".to_string()))
    );
    assert_eq!(head_message(temp_dir.path()), "Initial commit");
}

#[test]
fn test_bump_and_pattern_files_are_committed() {
    let temp_dir = create_test_repo(&[
        ("version.go", VERSION_GO),
        ("package.json", "{\n  \"name\": \"web\",\n  \"version\": \"1.2.3\"\n}\n"),
        ("Cargo.toml", "[package]\nname = \"cli\"\nversion = \"1.2.3\"\n\n[dependencies]\nserde = { version = \"1.0.0\" }\n"),
        ("docs/install.md", "Install with `go install example.com/foo@v1.2.3`\n"),
    ]);
    let root = temp_dir.path();
    let version_file = root.join("version.go");

    let mut options = options(&version_file, "patch");
    options.bump_files = vec![root.join("package.json"), root.join("docs").join("install.md")];
    options.pattern_files = vec![root.join("Cargo.toml")];
    let meta = workflow::run(&options).unwrap();

    assert_eq!(
        meta.updated_files,
        vec![version_file, root.join("Cargo.toml"), root.join("package.json")]
    );
    assert_eq!(
        fs::read_to_string(root.join("package.json")).unwrap(),
        "{\n  \"name\": \"web\",\n  \"version\": \"1.2.4\"\n}\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("Cargo.toml")).unwrap(),
        "[package]\nname = \"cli\"\nversion = \"1.2.4\"\n\n[dependencies]\nserde = { version = \"1.0.0\" }\n"
    );
    // Tagged versions are left to the pattern scanner.
    assert_eq!(
        fs::read_to_string(root.join("docs").join("install.md")).unwrap(),
        "Install with `go install example.com/foo@v1.2.3`\n"
    );

    let tracker = GitTracker::open(root).unwrap();
    assert!(tracker.changed_files().unwrap().is_empty());
}

#[test]
fn test_dry_run_changes_nothing() {
    let temp_dir = create_test_repo(&[
        ("go.mod", "module example.com/foo\n"),
        ("version.go", VERSION_GO),
        ("cmd/main.go", "package main\n\nimport \"example.com/foo/internal\"\n"),
        ("VERSION", "1.2.3\n"),
    ]);
    let root = temp_dir.path();
    let version_file = root.join("version.go");

    let mut options = options(&version_file, "major");
    options.bump_files = vec![root.join("VERSION"), root.join("missing.txt")];
    let meta = workflow::dry_run(&options).unwrap();

    assert_eq!(meta.new_version, "2.0.0");
    assert_eq!(
        meta.updated_files,
        vec![
            version_file.clone(),
            root.join("go.mod"),
            root.join("cmd").join("main.go"),
            root.join("VERSION"),
        ]
    );
    assert_eq!(fs::read_to_string(&version_file).unwrap(), VERSION_GO);
    assert_eq!(fs::read_to_string(root.join("go.mod")).unwrap(), "module example.com/foo\n");
    assert_eq!(head_message(root), "Initial commit");
    assert!(tags(root).is_empty());
}

#[test]
fn test_dry_run_outside_repository() {
    let temp_dir = TempDir::new().unwrap();
    let version_file: PathBuf = temp_dir.path().join("version.go");
    fs::write(&version_file, VERSION_GO).unwrap();

    let meta = workflow::dry_run(&options(&version_file, "prerelease")).unwrap();
    assert_eq!(meta.new_version, "1.2.4-0");
    assert_eq!(meta.bump_type, "prerelease");
}

#[cfg(unix)]
#[test]
fn test_post_bump_output_is_committed() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = create_test_repo(&[("version.go", VERSION_GO), ("RELEASE", "none\n")]);
    let root = temp_dir.path();
    let version_file = root.join("version.go");
    let release = root.join("RELEASE");

    let scripts = TempDir::new().unwrap();
    let script = scripts.path().join("post-bump.sh");
    fs::write(
        &script,
        format!(
            "#!/bin/sh\necho \"$BUMP_VERSION_OLD_VERSION to $BUMP_VERSION_NEW_VERSION\" > '{}'\n",
            release.display()
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let mut options = options(&version_file, "minor");
    options.extra_files.push(release.clone());
    options.post_bump = Some(script);
    workflow::run(&options).unwrap();

    assert_eq!(fs::read_to_string(&release).unwrap(), "1.2.3 to 1.3.0\n");
    let tracker = GitTracker::open(root).unwrap();
    assert!(tracker.changed_files().unwrap().is_empty());
}

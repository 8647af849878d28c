//! The bump itself: read, compute, validate, write, then stage, commit and tag.
//!
//! Validation happens before the first write, so a rejected bump leaves the
//! working tree untouched. Once writing has started a later failure (a broken
//! post-bump script, a failed commit) leaves the written files in place.

use crate::declaration::{self, parent_dir};
use crate::error::BumpError;
use crate::generic;
use crate::git::{GitTracker, VersionControl, resolve_path};
use crate::hooks;
use crate::imports;
use crate::manifest;
use crate::scanner::main_version::find_main_version_in_file;
use crate::scanner::rewriter::bump_version_in_file;
use crate::version::{self, BumpDirective, DEV_VERSION, TAG_PREFIX, strip_tag};
use anyhow::{Result, anyhow};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct BumpOptions {
    /// Go file declaring `Version = "..."`.
    pub version_file: PathBuf,
    /// Bump keyword, `from-git`, or an explicit version.
    pub directive: String,
    /// Files staged with the bump; they may already have uncommitted changes.
    pub extra_files: Vec<PathBuf>,
    /// Files whose first untagged semver is replaced.
    pub bump_files: Vec<PathBuf>,
    /// Files whose main version is replaced, keeping its format.
    pub pattern_files: Vec<PathBuf>,
    pub post_bump: Option<PathBuf>,
}

impl BumpOptions {
    pub fn new(version_file: impl Into<PathBuf>, directive: impl Into<String>) -> Self {
        BumpOptions {
            version_file: version_file.into(),
            directive: directive.into(),
            ..Default::default()
        }
    }
}

/// Summary of a bump (or of what a dry run would do).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionMeta {
    pub old_version: String,
    pub new_version: String,
    pub bump_type: String,
    pub updated_files: Vec<PathBuf>,
}

/// A major bump that moves the module path.
#[derive(Debug, Clone)]
struct ModuleChange {
    dir: PathBuf,
    old_path: String,
}

impl ModuleChange {
    fn manifest(&self) -> PathBuf {
        manifest::manifest_path(&self.dir)
    }
}

/// Bumps the version using the git repository that contains the version file.
pub fn run(options: &BumpOptions) -> Result<VersionMeta> {
    let git = GitTracker::open(parent_dir(&options.version_file))?;
    run_with(&git, options)
}

pub fn run_with(vcs: &dyn VersionControl, options: &BumpOptions) -> Result<VersionMeta> {
    let directive = BumpDirective::parse(&options.directive)?;
    let version_file = &options.version_file;

    let old_version = match declaration::read_version(version_file)? {
        Some(current) => current,
        None => {
            let seeded = seed_version(Some(vcs));
            info!("No version file at '{}', starting from {}", version_file.display(), seeded);
            declaration::write_version(version_file, &seeded)?;
            seeded
        }
    };

    let new_version = resolve_new_version(&old_version, &directive, Some(vcs))?;
    ensure_changed(&old_version, &new_version)?;

    let module = detect_module_change(version_file, &directive)?;

    let mut allowed: Vec<PathBuf> = options.extra_files.clone();
    allowed.push(version_file.clone());
    if let Some(module) = &module {
        allowed.push(module.manifest());
    }
    ensure_clean(vcs, &allowed)?;

    info!("Bumping {} -> {}", old_version, new_version);
    declaration::write_version(version_file, &new_version)?;
    let mut updated_files = vec![version_file.clone()];

    if let Some(module) = &module {
        let new_path = manifest::update_manifest(&module.dir, &new_version)?;
        updated_files.push(module.manifest());
        if new_path != module.old_path {
            updated_files.extend(imports::update_self_imports(&module.dir, &module.old_path, &new_path)?);
        }
    }

    for file in &options.pattern_files {
        match bump_version_in_file(file, &new_version) {
            Ok(true) => updated_files.push(file.clone()),
            Ok(false) => warn!("{}", BumpError::NoVersionFound(file.clone())),
            Err(err) => warn!("Failed to bump version in {}: {:#}", file.display(), err),
        }
    }

    for file in &options.bump_files {
        match generic::find_and_replace_semver(file, &new_version) {
            Ok(()) => updated_files.push(file.clone()),
            Err(err) => warn!("Failed to bump version in {}: {:#}", file.display(), err),
        }
    }

    if let Some(script) = &options.post_bump {
        hooks::run_post_bump(script, &old_version, &new_version)?;
    }

    let mut to_commit = options.extra_files.clone();
    to_commit.extend(updated_files.iter().cloned());
    let to_commit = dedup_paths(to_commit);

    vcs.stage(&to_commit)?;
    vcs.commit(&new_version)?;
    if directive == BumpDirective::FromGit {
        debug!("Version taken from an existing tag; not tagging again");
    } else {
        vcs.tag(&format!("{TAG_PREFIX}{new_version}"))?;
    }

    Ok(VersionMeta {
        old_version,
        new_version,
        bump_type: directive.label().to_string(),
        updated_files,
    })
}

/// Computes the bump and the files it would touch without writing anything.
pub fn dry_run(options: &BumpOptions) -> Result<VersionMeta> {
    let git = GitTracker::open(parent_dir(&options.version_file));
    if let Err(err) = &git {
        debug!("Dry run without git: {:#}", err);
    }
    dry_run_with(git.as_ref().ok().map(|g| g as &dyn VersionControl), options)
}

pub fn dry_run_with(vcs: Option<&dyn VersionControl>, options: &BumpOptions) -> Result<VersionMeta> {
    let directive = BumpDirective::parse(&options.directive)?;
    let version_file = &options.version_file;

    let old_version = match declaration::read_version(version_file)? {
        Some(current) => current,
        None => seed_version(vcs),
    };
    let new_version = resolve_new_version(&old_version, &directive, vcs)?;
    ensure_changed(&old_version, &new_version)?;

    let mut updated_files = vec![version_file.clone()];

    if let Some(module) = detect_module_change(version_file, &directive)? {
        updated_files.push(module.manifest());
        let new_path = manifest::module_path_for(&module.old_path, &new_version)?;
        if new_path != module.old_path {
            updated_files.extend(imports::scan_self_imports(&module.dir, &module.old_path, &new_path)?);
        }
    }

    for file in &options.pattern_files {
        match find_main_version_in_file(file) {
            Ok(Some(_)) => updated_files.push(file.clone()),
            Ok(None) => warn!("{}", BumpError::NoVersionFound(file.clone())),
            Err(err) => warn!("Cannot scan {}: {:#}", file.display(), err),
        }
    }

    for file in &options.bump_files {
        match generic::has_semver(file) {
            Ok(true) => updated_files.push(file.clone()),
            Ok(false) => warn!("{}", BumpError::NoVersionFound(file.clone())),
            Err(err) => warn!("Cannot scan {}: {:#}", file.display(), err),
        }
    }

    Ok(VersionMeta {
        old_version,
        new_version,
        bump_type: directive.label().to_string(),
        updated_files,
    })
}

/// Version to start from when no version file exists yet.
fn seed_version(vcs: Option<&dyn VersionControl>) -> String {
    match vcs.map(|v| v.latest_tag()) {
        Some(Ok(tag)) => strip_tag(&tag).to_string(),
        Some(Err(err)) => {
            debug!("No tag to seed from: {:#}", err);
            DEV_VERSION.to_string()
        }
        None => DEV_VERSION.to_string(),
    }
}

/// The new version, without tag prefix.
pub fn resolve_new_version(
    old_version: &str,
    directive: &BumpDirective,
    vcs: Option<&dyn VersionControl>,
) -> Result<String> {
    match directive {
        BumpDirective::Bump(kind) => {
            let current = version::parse(&version::normalize(old_version))?;
            Ok(strip_tag(&current.bump(*kind)?.to_string()).to_string())
        }
        BumpDirective::FromGit => {
            let vcs = vcs.ok_or_else(|| anyhow!("from-git needs a git repository"))?;
            Ok(strip_tag(&vcs.latest_tag()?).to_string())
        }
        BumpDirective::Explicit(target) => Ok(target.clone()),
    }
}

fn ensure_changed(old_version: &str, new_version: &str) -> Result<()> {
    if strip_tag(old_version) == new_version {
        return Err(BumpError::NoOpVersion(new_version.to_string()).into());
    }
    Ok(())
}

/// Only a `major` keyword moves the module path, and only if a `go.mod` is found.
fn detect_module_change(version_file: &Path, directive: &BumpDirective) -> Result<Option<ModuleChange>> {
    if *directive != BumpDirective::Bump(version::BumpKind::Major) {
        return Ok(None);
    }
    let start = parent_dir(version_file);
    let Some(dir) = manifest::locate_manifest_dir(start) else {
        debug!("{}; skipping module update", BumpError::ManifestNotFound(start.to_path_buf()));
        return Ok(None);
    };
    let old_path = manifest::read_module_path(&dir)?;
    Ok(Some(ModuleChange { dir, old_path }))
}

/// Fails if any changed file is outside `allowed`.
fn ensure_clean(vcs: &dyn VersionControl, allowed: &[PathBuf]) -> Result<()> {
    let allowed: HashSet<PathBuf> = allowed.iter().map(resolve_path).collect();
    let disallowed: Vec<String> = vcs
        .changed_files()?
        .into_iter()
        .filter(|file| !allowed.contains(&resolve_path(file)))
        .map(|file| file.display().to_string())
        .collect();

    if !disallowed.is_empty() {
        return Err(BumpError::DirtyWorkingTree(disallowed).into());
    }
    Ok(())
}

fn dedup_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|p| seen.insert(resolve_path(p))).collect()
}

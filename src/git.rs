use anyhow::{Context, Result};
use git2::{DescribeFormatOptions, DescribeOptions, Repository, Signature, StatusOptions};
use log::{debug, info};
use std::path::{Path, PathBuf};

/// The version-control operations a bump needs.
pub trait VersionControl {
    /// Most recent tag reachable from HEAD, as named (prefix included).
    fn latest_tag(&self) -> Result<String>;
    /// Absolute paths of every modified, staged or untracked file.
    fn changed_files(&self) -> Result<Vec<PathBuf>>;
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;
    fn commit(&self, message: &str) -> Result<()>;
    /// Tags the current HEAD commit.
    fn tag(&self, name: &str) -> Result<()>;
}

pub struct GitTracker {
    pub repository: Repository,
}

/// Canonical form of `path` when it exists, else its absolute form.
pub fn resolve_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl GitTracker {
    /// Opens the repository containing the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repository = Repository::discover(path)
            .with_context(|| format!("Failed to find git repository at {:?}", path))?;

        debug!("Opened repository at {:?}", repository.path());

        Ok(GitTracker { repository })
    }

    fn workdir(&self) -> Result<PathBuf> {
        let workdir = self
            .repository
            .workdir()
            .ok_or_else(|| anyhow::anyhow!("Repository has no working directory"))?;
        Ok(resolve_path(workdir))
    }

    fn relative_to_workdir(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self.workdir()?;
        let resolved = resolve_path(path);
        resolved
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .with_context(|| format!("{:?} is outside the repository at {:?}", path, workdir))
    }

    /// Gets the repository signature from local git config
    fn get_signature(&self) -> Result<Signature<'_>> {
        self.repository.signature()
            .context("Failed to get git signature. Please configure user.name and user.email in git config")
    }

    /// Creates a commit from the current index with the given message
    pub fn create_commit(&self, message: &str) -> Result<git2::Oid> {
        info!("Creating commit: {}", message);

        let mut index = self.repository.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repository.find_tree(tree_id)?;

        let sig = self.get_signature()?;

        let parent_commit = match self.repository.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => {
                debug!("No parent commit found - this will be the initial commit");
                None
            }
        };

        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

        let commit_id = self.repository.commit(
            Some("HEAD"),
            &sig,
            &sig,
            message,
            &tree,
            &parents,
        )?;

        info!("Created commit: {}", commit_id);
        Ok(commit_id)
    }

    /// Creates an annotated tag for the given commit
    pub fn create_tag(&self, tag_name: &str, commit_id: git2::Oid) -> Result<()> {
        info!("Creating tag: {}", tag_name);

        let sig = self.get_signature()?;
        let commit_obj = self.repository
            .find_object(commit_id, Some(git2::ObjectType::Commit))?;

        self.repository.tag(
            tag_name,
            &commit_obj,
            &sig,
            &format!("Release {}", tag_name),
            false,
        )
        .with_context(|| format!("Failed to create tag {}", tag_name))?;

        Ok(())
    }
}

impl VersionControl for GitTracker {
    fn latest_tag(&self) -> Result<String> {
        let mut options = DescribeOptions::new();
        options.describe_tags();
        let describe = self.repository
            .describe(&options)
            .context("Failed to describe the latest tag")?;

        let mut format = DescribeFormatOptions::new();
        format.abbreviated_size(0);
        let tag = describe.format(Some(&format))?;

        debug!("Latest tag: {}", tag);
        Ok(tag.trim().to_string())
    }

    fn changed_files(&self) -> Result<Vec<PathBuf>> {
        let workdir = self.workdir()?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false);

        let statuses = self.repository.statuses(Some(&mut options))?;
        let files = statuses
            .iter()
            .filter(|entry| !entry.status().is_ignored())
            .filter_map(|entry| entry.path().map(|p| workdir.join(p)))
            .collect();
        Ok(files)
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        let mut index = self.repository.index()?;
        for path in paths {
            let relative = self.relative_to_workdir(path)?;
            let staged = if path.exists() {
                index.add_path(&relative)
            } else {
                index.remove_path(&relative)
            };
            staged.with_context(|| format!("Failed to stage {:?}", relative))?;
        }
        index.write()?;

        debug!("Staged {} file(s)", paths.len());
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.create_commit(message).map(|_| ())
    }

    fn tag(&self, name: &str) -> Result<()> {
        let head = self.repository.head()?.peel_to_commit()?;
        self.create_tag(name, head.id())
    }
}

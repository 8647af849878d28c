use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BumpError {
    #[error("unexpected version format: {0}")]
    Format(String),
    #[error("unknown bump argument: {0}")]
    UnknownDirective(String),
    #[error("explicit version {0:?} is not valid semver")]
    InvalidExplicitVersion(String),
    #[error("new version ({0}) is the same as the current version")]
    NoOpVersion(String),
    #[error("working directory is dirty; uncommitted files not included in commit: {0:?}")]
    DirtyWorkingTree(Vec<String>),
    #[error("no go.mod found above {}", .0.display())]
    ManifestNotFound(PathBuf),
    #[error("no version found in {}", .0.display())]
    NoVersionFound(PathBuf),
    #[error("post-bump script {} failed: {reason}", .script.display())]
    PostBumpFailed { script: PathBuf, reason: String },
}

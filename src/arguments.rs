use crate::workflow::BumpOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(author, version, about, bin_name = "bv")]
pub struct Arguments {
    /// Go file that declares `Version = "..."`
    #[arg(long, default_value = "./version.go")]
    pub version_file: PathBuf,
    /// Extra file to stage with the bump; it may have uncommitted changes (repeatable)
    #[arg(long = "file", short = 'f')]
    pub files: Vec<PathBuf>,
    /// File whose first semantic version is replaced (repeatable)
    #[arg(long = "bump-file", short = 'b')]
    pub bump_files: Vec<PathBuf>,
    /// File whose main version is replaced, keeping its format (repeatable)
    #[arg(long = "pattern-file", short = 'p')]
    pub pattern_files: Vec<PathBuf>,
    /// Script run after the files are written and before the commit
    #[arg(long, value_name = "SCRIPT")]
    pub post_bump: Option<PathBuf>,
    /// Show what would change without touching any file
    #[arg(long)]
    pub dry: bool,
    #[arg(long, short)]
    pub verbose: bool,
    /// major, minor, patch, premajor, preminor, prepatch, prerelease, from-git, or a version
    pub directive: String,
}

impl Arguments {
    /// The version file is always committed, so it joins the extra files.
    pub fn into_options(self) -> BumpOptions {
        let mut extra_files = self.files;
        extra_files.push(self.version_file.clone());
        BumpOptions {
            version_file: self.version_file,
            directive: self.directive,
            extra_files,
            bump_files: self.bump_files,
            pattern_files: self.pattern_files,
            post_bump: self.post_bump,
        }
    }
}

//! Semantic version arithmetic on tagged (`v`-prefixed) version strings.

use crate::error::BumpError;
use std::fmt;
use std::str::FromStr;

/// Sentinel used before a project has ever been released.
pub const DEV_VERSION: &str = "dev";
pub const TAG_PREFIX: &str = "v";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl SemanticVersion {
    /// Splits a tagged version into its numeric triple and prerelease.
    ///
    /// The prerelease is everything after the first hyphen; build metadata is
    /// not modelled here and makes the patch component unparsable.
    pub fn parse(tagged: &str) -> Result<Self, BumpError> {
        let untagged = tagged.strip_prefix(TAG_PREFIX).unwrap_or(tagged);
        let (numbers, prerelease) = match untagged.split_once('-') {
            Some((numbers, prerelease)) => (numbers, Some(prerelease)),
            None => (untagged, None),
        };

        let parts: Vec<&str> = numbers.split('.').collect();
        if parts.len() != 3 {
            return Err(BumpError::Format(tagged.to_string()));
        }
        let component = |part: &str| {
            part.parse::<u64>()
                .map_err(|_| BumpError::Format(tagged.to_string()))
        };

        Ok(SemanticVersion {
            major: component(parts[0])?,
            minor: component(parts[1])?,
            patch: component(parts[2])?,
            prerelease: prerelease.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    /// Fails with [`BumpError::Format`] when a component would overflow.
    pub fn bump(&self, kind: BumpKind) -> Result<SemanticVersion, BumpError> {
        let overflow = || BumpError::Format(self.to_string());
        let mut next = self.clone();
        match kind {
            BumpKind::Major | BumpKind::Premajor => {
                next.major = self.major.checked_add(1).ok_or_else(overflow)?;
                next.minor = 0;
                next.patch = 0;
            }
            BumpKind::Minor | BumpKind::Preminor => {
                next.minor = self.minor.checked_add(1).ok_or_else(overflow)?;
                next.patch = 0;
            }
            BumpKind::Patch | BumpKind::Prepatch => {
                next.patch = self.patch.checked_add(1).ok_or_else(overflow)?;
            }
            BumpKind::Prerelease => {
                next.prerelease = Some(match &self.prerelease {
                    Some(prerelease) => increment_prerelease(prerelease).ok_or_else(overflow)?,
                    None => {
                        next.patch = self.patch.checked_add(1).ok_or_else(overflow)?;
                        "0".to_string()
                    }
                });
                return Ok(next);
            }
        }
        next.prerelease = match kind {
            BumpKind::Premajor | BumpKind::Preminor | BumpKind::Prepatch => Some("0".to_string()),
            _ => None,
        };
        Ok(next)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(
            self.major,
            self.minor,
            self.patch,
            self.prerelease.as_deref().unwrap_or(""),
        ))
    }
}

/// Bumps the trailing numeric identifier of a prerelease (`rc.1` -> `rc.2`),
/// or appends `.0` when the last identifier is not a number.
/// `None` when the numeric identifier is already `u64::MAX`.
fn increment_prerelease(prerelease: &str) -> Option<String> {
    let (head, last) = match prerelease.rsplit_once('.') {
        Some((head, last)) => (Some(head), last),
        None => (None, prerelease),
    };
    let Ok(n) = last.parse::<u64>() else {
        return Some(format!("{prerelease}.0"));
    };
    let next = n.checked_add(1)?;
    Some(match head {
        Some(head) => format!("{head}.{next}"),
        None => next.to_string(),
    })
}

/// Maps `dev` to `v0.0.0` and makes sure the version carries exactly one tag prefix.
pub fn normalize(raw: &str) -> String {
    if raw == DEV_VERSION {
        return format!("{TAG_PREFIX}0.0.0");
    }
    if raw.starts_with(TAG_PREFIX) {
        raw.to_string()
    } else {
        format!("{TAG_PREFIX}{raw}")
    }
}

pub fn parse(tagged: &str) -> Result<SemanticVersion, BumpError> {
    SemanticVersion::parse(tagged)
}

pub fn format(major: u64, minor: u64, patch: u64, prerelease: &str) -> String {
    let base = format!("{TAG_PREFIX}{major}.{minor}.{patch}");
    if prerelease.is_empty() {
        base
    } else {
        format!("{base}-{prerelease}")
    }
}

/// Applies one of the seven bump keywords to a tagged version string.
pub fn bump(current: &str, directive: &str) -> Result<String, BumpError> {
    let kind = directive.parse::<BumpKind>()?;
    Ok(parse(current)?.bump(kind)?.to_string())
}

pub fn strip_tag(version: &str) -> &str {
    version.strip_prefix(TAG_PREFIX).unwrap_or(version)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl BumpKind {
    pub const ALL: [BumpKind; 7] = [
        BumpKind::Major,
        BumpKind::Minor,
        BumpKind::Patch,
        BumpKind::Premajor,
        BumpKind::Preminor,
        BumpKind::Prepatch,
        BumpKind::Prerelease,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
            BumpKind::Premajor => "premajor",
            BumpKind::Preminor => "preminor",
            BumpKind::Prepatch => "prepatch",
            BumpKind::Prerelease => "prerelease",
        }
    }
}

impl FromStr for BumpKind {
    type Err = BumpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BumpKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| BumpError::UnknownDirective(s.to_string()))
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the next version is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpDirective {
    Bump(BumpKind),
    FromGit,
    /// Target version without the tag prefix, already validated.
    Explicit(String),
}

impl BumpDirective {
    pub const FROM_GIT: &'static str = "from-git";

    /// Anything that is not a keyword is an explicit version and must be valid
    /// semver (tag prefix allowed) or the `dev` sentinel.
    pub fn parse(arg: &str) -> Result<Self, BumpError> {
        if let Ok(kind) = arg.parse::<BumpKind>() {
            return Ok(BumpDirective::Bump(kind));
        }
        if arg == Self::FROM_GIT {
            return Ok(BumpDirective::FromGit);
        }
        if arg == DEV_VERSION {
            return Ok(BumpDirective::Explicit(arg.to_string()));
        }
        let untagged = strip_tag(arg);
        semver::Version::parse(untagged)
            .map_err(|_| BumpError::InvalidExplicitVersion(arg.to_string()))?;
        Ok(BumpDirective::Explicit(untagged.to_string()))
    }

    /// The label reported as the bump type.
    pub fn label(&self) -> &'static str {
        match self {
            BumpDirective::Bump(kind) => kind.as_str(),
            BumpDirective::FromGit => Self::FROM_GIT,
            BumpDirective::Explicit(_) => "explicit",
        }
    }
}

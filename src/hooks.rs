use crate::error::BumpError;
use anyhow::Result;
use log::{debug, info};
use std::path::Path;
use std::process::Command;

pub const OLD_VERSION_ENV: &str = "BUMP_VERSION_OLD_VERSION";
pub const NEW_VERSION_ENV: &str = "BUMP_VERSION_NEW_VERSION";

/// Runs the post-bump script with the old and new versions in its environment.
///
/// The script runs after every file is written and before anything is
/// staged. A non-zero exit aborts the bump.
pub fn run_post_bump(script: &Path, old_version: &str, new_version: &str) -> Result<()> {
    let failed = |reason: String| BumpError::PostBumpFailed {
        script: script.to_path_buf(),
        reason,
    };

    if !script.exists() {
        return Err(failed("script not found".to_string()).into());
    }
    if !script.is_file() {
        return Err(failed("path is not a file".to_string()).into());
    }

    info!("Running post-bump script {}", script.display());
    let output = Command::new(script)
        .env(OLD_VERSION_ENV, old_version)
        .env(NEW_VERSION_ENV, new_version)
        .output()
        .map_err(|e| failed(e.to_string()))?;

    debug!("post-bump stdout: {}", String::from_utf8_lossy(&output.stdout));
    if !output.status.success() {
        return Err(failed(format!(
            "exit code {}\nStdout: {}\nStderr: {}",
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        ))
        .into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_script_fails() {
        let err = run_post_bump(Path::new("/nonexistent/post-bump.sh"), "1.0.0", "1.1.0").unwrap_err();
        assert!(err.to_string().contains("script not found"));
    }

    #[test]
    fn test_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = run_post_bump(temp_dir.path(), "1.0.0", "1.1.0").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BumpError>(),
            Some(BumpError::PostBumpFailed { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_sees_versions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("out.txt");
        let script = temp_dir.path().join("post.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"${OLD_VERSION_ENV}->${NEW_VERSION_ENV}\" > '{}'\n",
                out.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        run_post_bump(&script, "1.0.0", "1.1.0").unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "1.0.0->1.1.0\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_script() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("fail.sh");
        std::fs::write(&script, "#!/bin/sh\necho nope >&2\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let err = run_post_bump(&script, "1.0.0", "1.1.0").unwrap_err();
        assert!(err.to_string().contains("exit code 3"));
    }
}

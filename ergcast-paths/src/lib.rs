//! Cross-platform path utilities for ErgCast.
//!
//! Single place where the daemon decides where its configuration file and
//! exported workout logs live.
//!
//! # Platform Behavior
//!
//! | Platform | Data Directory | Config Directory |
//! |----------|----------------|------------------|
//! | Linux    | `~/.local/share/ergcast` | `~/.config/ergcast` |
//! | macOS    | `~/Library/Application Support/ergcast` | Same as data dir |
//! | Windows  | `%APPDATA%/ergcast` | Same as data dir |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

/// Errors specific to path operations.
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not determine data directory")]
    NoDataDirectory,

    #[error("Could not determine config directory")]
    NoConfigDirectory,
}

/// Application identifier used in path construction.
const APP_NAME: &str = "ergcast";

/// Configuration file name inside the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Sub-directory of the data dir holding exported workout CSV files.
const WORKOUTS_DIR_NAME: &str = "workouts";

/// Create `dir` (and parents) if missing, owner-only on Unix.
fn ensure_private_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o700);
        fs::set_permissions(dir, perms)
            .with_context(|| format!("Failed to set permissions on {}", dir.display()))?;
    }

    Ok(())
}

/// Get the application data directory, creating it if needed.
///
/// # Errors
/// Returns an error if the directory cannot be determined or created.
pub fn get_data_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().ok_or(PathError::NoDataDirectory)?;
    let data_dir = base_dir.join(APP_NAME);
    ensure_private_dir(&data_dir)?;
    Ok(data_dir)
}

/// Get the configuration directory, creating it if needed.
///
/// # Platform Behavior
/// - **Linux**: `~/.config/ergcast`
/// - **macOS/Windows**: config lives with data
pub fn get_config_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let config_base = dirs::config_dir().ok_or(PathError::NoConfigDirectory)?;
        let config_dir = config_base.join(APP_NAME);
        ensure_private_dir(&config_dir)?;
        Ok(config_dir)
    }

    #[cfg(not(target_os = "linux"))]
    {
        get_data_dir()
    }
}

/// Path of the daemon configuration file (the file itself may not exist yet).
pub fn get_config_path() -> Result<PathBuf> {
    Ok(config_path_in(&get_config_dir()?))
}

/// Directory that exported workout logs are written to, created if needed.
pub fn get_workouts_dir() -> Result<PathBuf> {
    let dir = workouts_dir_in(&get_data_dir()?);
    ensure_private_dir(&dir)?;
    Ok(dir)
}

/// Config file location relative to a config directory.
pub fn config_path_in(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Workout log location relative to a data directory.
pub fn workouts_dir_in(data_dir: &Path) -> PathBuf {
    data_dir.join(WORKOUTS_DIR_NAME)
}

/// Make sure an explicitly configured directory exists before writing into it.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    ensure_private_dir(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_in() {
        let path = config_path_in(Path::new("/etc/ergcast"));
        assert_eq!(path, PathBuf::from("/etc/ergcast/config.toml"));
    }

    #[test]
    fn test_workouts_dir_in() {
        let path = workouts_dir_in(Path::new("/var/lib/ergcast"));
        assert!(path.ends_with("workouts"));
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        // Second call is a no-op
        ensure_dir(&nested).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_dir_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("private");
        ensure_dir(&dir).unwrap();

        let mode = fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }
}

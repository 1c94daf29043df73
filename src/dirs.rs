use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

/// Ensures that a directory exists at the specified path, creating it if necessary.
///
/// This function checks if a directory exists at the given path. If the directory
/// doesn't exist, it creates the directory and any necessary parent directories.
///
/// # Arguments
///
/// * `path` - The path where the directory should exist
///
/// # Returns
///
/// * `Ok(())` - Directory exists or was created successfully
/// * `Err(_)` - Failed to create directory (e.g., insufficient permissions)
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Like [`ensure_dir_exists`], but the leaf directory is readable by its owner only.
/// Existing directories have their mode tightened as well.
pub fn ensure_private_dir(path: &Path) -> Result<()> {
    ensure_dir_exists(path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}

pub fn home_dir() -> Result<PathBuf> {
    let dir = std::env::var_os("HOME") // Unix/Linux/macOS
        .or_else(|| std::env::var_os("USERPROFILE")) // Windows
        .map(PathBuf::from);
    match dir {
        Some(dir) => Ok(dir),
        None => {
            bail!("could not determine home directory, please specify config path manually")
        }
    }
}

pub fn config_dir() -> Result<PathBuf> {
    if is_root() {
        return Ok(PathBuf::from("/etc/gatekeep"));
    }

    let home = home_dir()?;
    Ok(home.join(".config").join("gatekeep"))
}

pub fn data_dir() -> Result<PathBuf> {
    if is_root() {
        return Ok(PathBuf::from("/var/lib/gatekeep"));
    }

    let home = home_dir()?;

    if cfg!(windows) {
        return Ok(home.join("AppData").join("gatekeep"));
    }

    Ok(home.join(".local").join("share").join("gatekeep"))
}

#[cfg(unix)]
fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

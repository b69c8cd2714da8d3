//! Locating and identifying external binaries.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Search the PATH environment for an executable with the given name.
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.is_file()
        && std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run `<binary> -version` and return the leading program name from its
/// output ("blastp: 2.13.0+" identifies as "blastp"). Used to accept
/// arbitrarily named binaries passed via `-p`.
pub fn identify_binary(path: &Path) -> Result<String> {
    let output = Command::new(path)
        .arg("-version")
        .output()
        .with_context(|| format!("failed to run {:?} -version", path))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first = stdout
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .trim_end_matches(':');
    Ok(first.to_string())
}

/// First existing candidate: an explicit override, then each PATH name.
pub fn resolve(override_path: Option<&str>, candidates: &[&str]) -> Option<PathBuf> {
    if let Some(path) = override_path {
        let path = PathBuf::from(path);
        if is_executable(&path) {
            return Some(path);
        }
        // An override that is a bare name still goes through PATH
        if let Some(found) = path.to_str().and_then(find_in_path) {
            return Some(found);
        }
        return None;
    }
    candidates.iter().find_map(|name| find_in_path(name))
}

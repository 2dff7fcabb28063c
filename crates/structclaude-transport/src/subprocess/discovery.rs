//! Executable discovery
//!
//! An explicit path (anything containing a path separator) is used as-is.
//! A bare name is searched in `PATH`, then in the places the CLI installer
//! and the common Node package managers put it, in this order.

use crate::error::{Result, TransportError};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Install directories checked after `PATH`; `~` is the home directory
pub const CANDIDATE_DIRS: &[&str] = &[
    "~/.claude/local",
    "~/.local/bin",
    "/usr/local/bin",
    "/opt/homebrew/bin",
    "~/.npm-global/bin",
    "~/node_modules/.bin",
];

/// Resolve `cli_path` to an executable file
///
/// `env` is the environment the child will run with; its `PATH` and `HOME`
/// take precedence over the parent's.
///
/// # Errors
///
/// Returns [`TransportError::ExecutableNotFound`] carrying every path that
/// was checked.
pub fn locate_executable(cli_path: &str, env: &HashMap<String, String>) -> Result<PathBuf> {
    let home = env
        .get("HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(PathBuf::from));

    if is_explicit_path(cli_path) {
        let path = expand_home(cli_path, home.as_deref()).unwrap_or_else(|| PathBuf::from(cli_path));
        return if is_executable(&path) {
            Ok(path)
        } else {
            Err(TransportError::ExecutableNotFound {
                searched: vec![path],
            })
        };
    }

    let path_var: Option<OsString> = env
        .get("PATH")
        .map(OsString::from)
        .or_else(|| std::env::var_os("PATH"));

    let mut searched: Vec<PathBuf> = Vec::new();
    let path_dirs = path_var
        .as_deref()
        .map(|p| std::env::split_paths(p).collect::<Vec<_>>())
        .unwrap_or_default();
    let candidate_dirs = CANDIDATE_DIRS
        .iter()
        .filter_map(|dir| expand_home(dir, home.as_deref()));

    for dir in path_dirs.into_iter().chain(candidate_dirs) {
        if dir.as_os_str().is_empty() {
            continue;
        }
        let candidate = dir.join(cli_path);
        if searched.contains(&candidate) {
            continue;
        }
        if is_executable(&candidate) {
            debug!(path = %candidate.display(), "resolved CLI executable");
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(TransportError::ExecutableNotFound { searched })
}

fn is_explicit_path(cli_path: &str) -> bool {
    cli_path.contains('/') || cli_path.contains(std::path::MAIN_SEPARATOR)
}

/// Expand a leading `~`; `None` when it needs a home directory we lack
fn expand_home(path: &str, home: Option<&Path>) -> Option<PathBuf> {
    match path.strip_prefix('~') {
        Some(rest) => {
            let rest = rest.trim_start_matches('/');
            home.map(|h| h.join(rest))
        }
        None => Some(PathBuf::from(path)),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}

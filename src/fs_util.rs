use std::path::{Path, PathBuf};

/// Resolve the user's home directory, or error if unset.
pub fn home_dir() -> anyhow::Result<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| anyhow::anyhow!("HOME environment variable is not set"))
}

/// Directory holding config and the default fact store.
///
/// Follows `FACTBOT_CONFIG` when set, so a relocated config keeps its data next to it.
pub fn state_dir() -> PathBuf {
    if let Ok(path) = std::env::var("FACTBOT_CONFIG") {
        if let Some(parent) = PathBuf::from(path).parent() {
            return parent.to_path_buf();
        }
    }
    home_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".factbot")
}

/// Expand a leading `~/` against the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(rest),
        None => PathBuf::from(path),
    }
}

#[cfg(unix)]
pub fn set_secure_file_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
pub fn set_secure_file_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

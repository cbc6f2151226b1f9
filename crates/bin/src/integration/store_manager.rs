//! Store location and opening.

use kabu_data::{DataError, Store};
use std::path::{Path, PathBuf};

/// Default data directory.
///
/// Uses platform-specific data directories:
/// - Linux: `~/.local/share/kabu/`
/// - macOS: `~/Library/Application Support/kabu/`
/// - Windows: `%APPDATA%\kabu\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("kabu")
}

/// Default database path.
pub(crate) fn default_database_path() -> PathBuf {
    default_data_dir().join("kabu.db")
}

/// Open the store at `path`, creating the directory if needed.
pub(crate) fn open_store(path: &Path) -> Result<Store, DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Store::new(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path() {
        let path = default_database_path();
        assert!(path.ends_with("kabu/kabu.db"));
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = std::env::temp_dir().join(format!("kabu_store_{}", std::process::id()));
        let path = dir.join("nested").join("kabu.db");

        let store = open_store(&path).unwrap();
        assert_eq!(store.get_stats().unwrap().listed_issuers, 0);
        assert!(path.exists());

        drop(store);
        std::fs::remove_dir_all(&dir).ok();
    }
}

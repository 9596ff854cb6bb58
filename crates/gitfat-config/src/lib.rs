// GitFat - Large File Support for Git
// Copyright (C) 2025 GitFat Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! `.gitfat` sync configuration
//!
//! Loads and validates the `.gitfat` file at the repository work-tree root.
//! The file names exactly one remote backend; see [`schema`] for the
//! section layout.

pub mod error;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use schema::{CopyRemote, GitFatConfig, HttpRemote, RemoteSpec, RsyncRemote, S3Remote};

use std::path::Path;
use tracing::debug;

/// File name of the sync configuration, relative to the work-tree root
pub const CONFIG_FILE: &str = ".gitfat";

/// Load and validate the `.gitfat` file under `worktree_root`.
pub fn load(worktree_root: &Path) -> ConfigResult<GitFatConfig> {
    let path = worktree_root.join(CONFIG_FILE);
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path));
    }

    let content = std::fs::read_to_string(&path)?;
    let config: GitFatConfig = toml::from_str(&content)?;
    config.validate()?;
    debug!(path = %path.display(), "loaded sync configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[copy]\nremote = \"/srv/fat\"\n",
        )
        .unwrap();

        let config = load(dir.path()).unwrap();
        assert_eq!(config.remote().unwrap().kind(), "copy");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[rsync\nremote =").unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}

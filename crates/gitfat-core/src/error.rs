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

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FatError {
    #[error("Not a git repository (or any parent): {}", .0.display())]
    NotAGitRepository(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] gitfat_config::ConfigError),

    #[error("Git error: {0}")]
    Git(#[from] gitfat_git::GitError),

    #[error("Object store error: {0}")]
    Store(#[from] gitfat_store::StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backend error: {0}")]
    Backend(#[from] anyhow::Error),

    #[error("{failed} of {attempted} objects failed to sync")]
    SyncIncomplete { failed: usize, attempted: usize },
}

pub type FatResult<T> = Result<T, FatError>;

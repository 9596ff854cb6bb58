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

//! Copy backend: the remote is another local directory
//!
//! The simplest backend, useful for network mounts and for tests. Downloads
//! go through a temp file and an atomic rename so a partially copied object
//! is never visible at the destination path.

use crate::error::StoreError;
use crate::SyncBackend;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Local-directory sync backend
#[derive(Clone)]
pub struct CopyBackend {
    remote: PathBuf,
}

impl CopyBackend {
    /// Create a copy backend for the given remote directory.
    ///
    /// The directory does not have to exist yet (it is created on first
    /// upload), but an existing non-directory is rejected at selection time.
    pub fn new<P: AsRef<Path>>(remote: P) -> anyhow::Result<Self> {
        let remote = remote.as_ref().to_path_buf();
        if remote.exists() && !remote.is_dir() {
            anyhow::bail!(
                "copy remote exists but is not a directory: {}",
                remote.display()
            );
        }
        Ok(CopyBackend { remote })
    }

    fn remote_path(&self, key: &str) -> PathBuf {
        self.remote.join(key)
    }
}

impl fmt::Debug for CopyBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyBackend")
            .field("remote", &self.remote)
            .finish()
    }
}

#[async_trait]
impl SyncBackend for CopyBackend {
    async fn upload(&self, local: &Path, key: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.remote).await?;
        let dest = self.remote_path(key);
        if fs::try_exists(&dest).await? {
            debug!(key = %key, "remote object already exists, skipping upload");
            return Ok(());
        }
        fs::copy(local, &dest).await?;
        debug!(key = %key, "uploaded object");
        Ok(())
    }

    async fn download(&self, key: &str, local: &Path) -> anyhow::Result<()> {
        let src = self.remote_path(key);
        let staged = local.with_extension("part");
        match fs::copy(&src, &staged).await {
            Ok(_) => {
                fs::rename(&staged, local).await?;
                debug!(key = %key, "downloaded object");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(key).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self) -> anyhow::Result<HashSet<String>> {
        let mut keys = HashSet::new();
        let mut entries = match fs::read_dir(&self.remote).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.insert(name.to_string());
                }
            }
        }
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        match fs::remove_file(self.remote_path(key)).await {
            Ok(()) => Ok(()),
            // Idempotent: deleting a missing object is success
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

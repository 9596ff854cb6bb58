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

//! In-memory mock backend for testing
//!
//! Thread-safe `Arc<RwLock<HashMap>>` store that implements every
//! [`SyncBackend`](crate::SyncBackend) operation, so reconciliation logic
//! can be exercised without a network or a second directory. `insert_raw`
//! deliberately accepts any bytes under any key: tests use it to plant a
//! corrupt object and check that download verification rejects it.

use crate::error::StoreError;
use crate::SyncBackend;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// In-memory sync backend for tests
#[derive(Clone, Default)]
pub struct MockBackend {
    store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MockBackend {
    /// Create an empty mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert raw bytes under a key, bypassing the upload path.
    pub async fn insert_raw(&self, key: &str, data: &[u8]) {
        self.store
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
    }

    /// Make every transfer of this key fail with a transport error.
    pub async fn fail_key(&self, key: &str) {
        self.failing.write().await.insert(key.to_string());
    }

    async fn check_failing(&self, key: &str) -> anyhow::Result<()> {
        if self.failing.read().await.contains(key) {
            anyhow::bail!("injected transport failure for {}", key);
        }
        Ok(())
    }

    /// Bytes currently stored under a key, if any.
    pub async fn get_raw(&self, key: &str) -> Option<Vec<u8>> {
        self.store.read().await.get(key).cloned()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

impl fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockBackend").finish()
    }
}

#[async_trait]
impl SyncBackend for MockBackend {
    async fn upload(&self, local: &Path, key: &str) -> anyhow::Result<()> {
        self.check_failing(key).await?;
        let data = fs::read(local).await?;
        self.store.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn download(&self, key: &str, local: &Path) -> anyhow::Result<()> {
        self.check_failing(key).await?;
        let data = self
            .get_raw(key)
            .await
            .ok_or_else(|| StoreError::not_found(key))?;
        fs::write(local, data).await?;
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<HashSet<String>> {
        Ok(self.store.read().await.keys().cloned().collect())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.store.write().await.remove(key);
        Ok(())
    }
}

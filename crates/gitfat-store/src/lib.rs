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

//! Object storage layer for git-fat
//!
//! This crate provides the local content-addressable object cache, the
//! streaming hasher that feeds it, and the `SyncBackend` trait with one
//! implementation per supported remote kind:
//!
//! - *copy* - the remote is another local directory
//! - *rsync* - shells out to rsync with NUL-separated file lists
//! - *http* - anonymous pull-only remote
//! - *s3* - object storage with an optional key prefix
//!
//! # Core concepts
//!
//! - **Digests**: objects are keyed by the lowercase SHA-1 hex of their own
//!   bytes, both locally and remotely.
//! - **Keys**: a backend key is a bare digest; backends that namespace keys
//!   (the s3 prefix) apply and strip the prefix internally so the set
//!   algebra upstream stays prefix-agnostic.
//!
//! # Examples
//!
//! Using the mock backend for testing:
//!
//! ```no_run
//! use gitfat_store::{SyncBackend, mock::MockBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = MockBackend::new();
//!     backend.insert_raw("6df0c57803617bba277e90c6fa01071fb6bfebb5", b"fat content a\n").await;
//!
//!     let keys = backend.list().await?;
//!     assert_eq!(keys.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod copy;
pub mod error;
pub mod hasher;
pub mod http;
pub mod mock;
pub mod rsync;
pub mod s3;

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::Path;

pub use cache::{ObjectCache, PutOutcome};
pub use copy::CopyBackend;
pub use error::{StoreError, StoreResult};
pub use http::HttpBackend;
pub use rsync::RsyncBackend;
pub use s3::{S3Backend, S3Options};

/// A remote store of fat objects.
///
/// Implementations must be `Send + Sync + Debug` so a selected backend can
/// be carried as a trait object through async code. Operations return
/// `anyhow::Result` for flexible error context; a missing remote object is
/// signalled by a [`StoreError::NotFound`] in the error chain so callers can
/// tell it apart from a transport failure.
#[async_trait]
pub trait SyncBackend: Send + Sync + Debug {
    /// Upload a local file under the given key.
    async fn upload(&self, local: &Path, key: &str) -> anyhow::Result<()>;

    /// Download the object with the given key to a local path.
    ///
    /// The caller verifies the downloaded bytes against the key; backends
    /// only have to surface transport failures distinctly from not-found.
    async fn download(&self, key: &str, local: &Path) -> anyhow::Result<()>;

    /// List all keys in the remote namespace, with any configured key
    /// prefix stripped.
    async fn list(&self) -> anyhow::Result<HashSet<String>>;

    /// Delete the object with the given key.
    async fn delete(&self, key: &str) -> anyhow::Result<()>;

    /// Upload every key, reading `<objdir>/<key>`. Attempts all keys even
    /// when some fail and returns the keys that failed.
    ///
    /// The default loops over [`upload`](Self::upload); backends with a
    /// cheaper bulk path (rsync) override it.
    async fn upload_many(&self, objdir: &Path, keys: &[String]) -> anyhow::Result<Vec<String>> {
        let mut failed = Vec::new();
        for key in keys {
            if let Err(e) = self.upload(&objdir.join(key), key).await {
                tracing::warn!(key = %key, error = %e, "upload failed");
                failed.push(key.clone());
            }
        }
        Ok(failed)
    }

    /// Download every key into `<dest>/<key>`. Attempts all keys even when
    /// some fail and returns the keys that failed.
    async fn download_many(&self, dest: &Path, keys: &[String]) -> anyhow::Result<Vec<String>> {
        let mut failed = Vec::new();
        for key in keys {
            if let Err(e) = self.download(key, &dest.join(key)).await {
                tracing::warn!(key = %key, error = %e, "download failed");
                failed.push(key.clone());
            }
        }
        Ok(failed)
    }
}

/// Whether an error chain bottoms out in a remote/cache not-found.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<StoreError>(), Some(e) if e.is_not_found()))
}

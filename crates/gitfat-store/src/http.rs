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

//! HTTP backend: anonymous, pull-only
//!
//! Objects are fetched with plain GETs from `<base>/<digest>`. Upload, list
//! and delete are unsupported: an HTTP remote serves objects published by
//! some other channel. Response bodies stream to disk in chunks so objects
//! never have to fit in memory; the caller verifies the digest afterwards.

use crate::error::StoreError;
use crate::SyncBackend;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Pull-only HTTP sync backend
#[derive(Clone)]
pub struct HttpBackend {
    base: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create an HTTP backend rooted at the given base URL.
    pub fn new(base: impl Into<String>) -> anyhow::Result<Self> {
        let base = base.into();
        if !base.starts_with("http://") && !base.starts_with("https://") {
            anyhow::bail!("http remote must be an http(s) URL: {}", base);
        }
        Ok(HttpBackend {
            base: base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base, key)
    }
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend").field("base", &self.base).finish()
    }
}

#[async_trait]
impl SyncBackend for HttpBackend {
    async fn upload(&self, _local: &Path, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("http remotes are pull-only, cannot upload {}", key)
    }

    async fn download(&self, key: &str, local: &Path) -> anyhow::Result<()> {
        let url = self.object_url(key);
        debug!(url = %url, "fetching object");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::not_found(key).into());
        }
        let mut response = response
            .error_for_status()
            .with_context(|| format!("fetching {}", url))?;

        let mut file = File::create(local).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<HashSet<String>> {
        anyhow::bail!("http remotes do not support listing")
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("http remotes are pull-only, cannot delete {}", key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_url() {
        assert!(HttpBackend::new("ftp://example.com/fat").is_err());
        assert!(HttpBackend::new("/srv/fat").is_err());
    }

    #[test]
    fn test_object_url_strips_trailing_slash() {
        let backend = HttpBackend::new("https://example.com/fat/").unwrap();
        assert_eq!(
            backend.object_url("6df0c57803617bba277e90c6fa01071fb6bfebb5"),
            "https://example.com/fat/6df0c57803617bba277e90c6fa01071fb6bfebb5"
        );
    }

    #[tokio::test]
    async fn test_upload_is_unsupported() {
        let backend = HttpBackend::new("https://example.com/fat").unwrap();
        assert!(backend
            .upload(Path::new("/tmp/x"), "abc")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_list_is_unsupported() {
        let backend = HttpBackend::new("https://example.com/fat").unwrap();
        assert!(backend.list().await.is_err());
    }
}

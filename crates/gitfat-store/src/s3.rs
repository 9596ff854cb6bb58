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

//! S3 storage backend
//!
//! Uses the AWS SDK credential chain (environment, IAM role, profiles) and
//! supports S3-compatible services through a custom endpoint. An optional
//! key prefix namespaces objects inside a shared bucket; the prefix is
//! applied on the way out and stripped on the way in, so callers always see
//! bare digests.

use crate::error::StoreError;
use crate::SyncBackend;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Configuration for the S3 backend
#[derive(Clone, Debug, Default)]
pub struct S3Options {
    /// Bucket name
    pub bucket: String,
    /// Key prefix inside the bucket, no trailing slash
    pub prefix: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO etc.)
    pub endpoint: Option<String>,
    /// Canned ACL applied to uploaded objects
    pub acl: Option<String>,
}

/// S3 sync backend
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    options: S3Options,
    acl: Option<ObjectCannedAcl>,
}

impl S3Backend {
    /// Create an S3 backend, loading credentials and region from the
    /// standard AWS chain.
    pub async fn new(options: S3Options) -> anyhow::Result<Self> {
        if options.bucket.is_empty() {
            anyhow::bail!("s3 bucket must not be empty");
        }

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let client = if let Some(endpoint) = &options.endpoint {
            debug!(endpoint = %endpoint, "using custom s3 endpoint");
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint.clone())
                .force_path_style(true)
                .build();
            Client::from_conf(s3_config)
        } else {
            Client::new(&sdk_config)
        };

        let acl = options.acl.as_deref().map(ObjectCannedAcl::from);

        Ok(S3Backend {
            client,
            options,
            acl,
        })
    }

    /// Full object key for a digest, with the configured prefix applied.
    fn object_key(&self, key: &str) -> String {
        match &self.options.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }

}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.options.bucket)
            .field("prefix", &self.options.prefix)
            .field("endpoint", &self.options.endpoint)
            .finish()
    }
}

#[async_trait]
impl SyncBackend for S3Backend {
    async fn upload(&self, local: &Path, key: &str) -> anyhow::Result<()> {
        let object_key = self.object_key(key);
        debug!(key = %object_key, "uploading object to s3");

        let body = ByteStream::from_path(local)
            .await
            .with_context(|| format!("reading {}", local.display()))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.options.bucket)
            .key(&object_key)
            .body(body);
        if let Some(acl) = &self.acl {
            request = request.acl(acl.clone());
        }
        request
            .send()
            .await
            .with_context(|| format!("uploading {} to s3", key))?;
        Ok(())
    }

    async fn download(&self, key: &str, local: &Path) -> anyhow::Result<()> {
        let object_key = self.object_key(key);
        debug!(key = %object_key, "downloading object from s3");

        let response = match self
            .client
            .get_object()
            .bucket(&self.options.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.as_service_error().map(|s| s.is_no_such_key()) == Some(true) => {
                return Err(StoreError::not_found(key).into());
            }
            Err(e) => return Err(anyhow!(e).context(format!("downloading {} from s3", key))),
        };

        let mut body = response.body;
        let mut file = File::create(local).await?;
        while let Some(chunk) = body
            .try_next()
            .await
            .context("reading s3 response body")?
        {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<HashSet<String>> {
        let list_prefix = self
            .options
            .prefix
            .as_ref()
            .map(|p| format!("{}/", p))
            .unwrap_or_default();

        let mut keys = HashSet::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.options.bucket);
            if !list_prefix.is_empty() {
                request = request.prefix(&list_prefix);
            }
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .context("listing s3 objects")?;

            for obj in response.contents() {
                if let Some(key) = obj.key() {
                    if let Some(bare) = key.strip_prefix(&list_prefix) {
                        if !bare.is_empty() {
                            keys.insert(bare.to_string());
                        }
                    }
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        debug!(count = keys.len(), "listed s3 objects");
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let object_key = self.object_key(key);
        // delete_object is idempotent on the service side
        self.client
            .delete_object()
            .bucket(&self.options.bucket)
            .key(&object_key)
            .send()
            .await
            .with_context(|| format!("deleting {} from s3", key))?;
        Ok(())
    }
}

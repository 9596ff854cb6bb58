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

//! Backend selection
//!
//! Turns the single validated `.gitfat` section into a boxed
//! [`SyncBackend`]. Each backend's construction runs its own validation, so
//! a bad remote fails here, at selection time, not midway through a sync.

use crate::error::FatResult;
use gitfat_config::RemoteSpec;
use gitfat_store::{CopyBackend, HttpBackend, RsyncBackend, S3Backend, S3Options, SyncBackend};
use tracing::debug;

/// Construct the backend the configuration names.
pub async fn select_backend(spec: &RemoteSpec) -> FatResult<Box<dyn SyncBackend>> {
    debug!(kind = spec.kind(), "selecting sync backend");
    let backend: Box<dyn SyncBackend> = match spec {
        RemoteSpec::Rsync(rsync) => Box::new(RsyncBackend::new(
            rsync.remote.clone(),
            rsync.sshuser.clone(),
            rsync.sshport.clone(),
        )?),
        RemoteSpec::Http(http) => Box::new(HttpBackend::new(http.remote.clone())?),
        RemoteSpec::S3(s3) => Box::new(
            S3Backend::new(S3Options {
                bucket: s3.bucket.clone(),
                prefix: s3.prefix.clone(),
                endpoint: s3.endpoint.clone(),
                acl: s3.acl.clone(),
            })
            .await?,
        ),
        RemoteSpec::Copy(copy) => Box::new(CopyBackend::new(&copy.remote)?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitfat_config::{CopyRemote, HttpRemote, RsyncRemote};

    #[tokio::test]
    async fn test_select_copy_backend() {
        let dir = tempfile::TempDir::new().unwrap();
        let spec = RemoteSpec::Copy(CopyRemote {
            remote: dir.path().to_string_lossy().into_owned(),
        });
        let backend = select_backend(&spec).await.unwrap();
        assert!(format!("{:?}", backend).contains("CopyBackend"));
    }

    #[tokio::test]
    async fn test_select_rsync_backend() {
        let spec = RemoteSpec::Rsync(RsyncRemote {
            remote: "host:/srv/fat".to_string(),
            sshuser: None,
            sshport: None,
        });
        let backend = select_backend(&spec).await.unwrap();
        assert!(format!("{:?}", backend).contains("RsyncBackend"));
    }

    #[tokio::test]
    async fn test_invalid_http_remote_fails_at_selection() {
        let spec = RemoteSpec::Http(HttpRemote {
            remote: "not-a-url".to_string(),
        });
        assert!(select_backend(&spec).await.is_err());
    }
}

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

//! Rsync backend
//!
//! Shells out to an external `rsync`, feeding it NUL-separated file lists
//! on stdin (`--from0 --files-from=-`) so batch transfers cost one process.
//! `--ignore-existing` keeps pushes idempotent: an object already on the
//! remote is never rewritten.

use crate::error::StoreError;
use crate::SyncBackend;
use anyhow::Context;
use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Rsync sync backend
#[derive(Clone)]
pub struct RsyncBackend {
    remote: String,
    sshuser: Option<String>,
    sshport: Option<String>,
}

impl RsyncBackend {
    /// Create an rsync backend for the given remote location
    /// (`host:/path` or a plain local path), with optional ssh user/port.
    pub fn new(
        remote: impl Into<String>,
        sshuser: Option<String>,
        sshport: Option<String>,
    ) -> anyhow::Result<Self> {
        let remote = remote.into();
        if remote.is_empty() {
            anyhow::bail!("rsync remote must not be empty");
        }
        Ok(RsyncBackend {
            remote,
            sshuser,
            sshport,
        })
    }

    /// Base command shared by all transfer directions.
    fn command(&self) -> Command {
        let mut cmd = Command::new("rsync");
        cmd.arg("--ignore-existing");
        if let Some(rsh) = self.rsh_arg() {
            cmd.arg(rsh);
        }
        cmd
    }

    fn rsh_arg(&self) -> Option<String> {
        let mut rsh = String::new();
        if let Some(user) = &self.sshuser {
            rsh.push_str(" -l ");
            rsh.push_str(user);
        }
        if let Some(port) = &self.sshport {
            rsh.push_str(" -p ");
            rsh.push_str(port);
        }
        if rsh.is_empty() {
            None
        } else {
            Some(format!("--rsh=ssh{}", rsh))
        }
    }

    /// Run one batched transfer with the given source/destination roots,
    /// piping `keys` NUL-separated to stdin.
    async fn transfer_batch(&self, src: &str, dest: &str, keys: &[String]) -> anyhow::Result<()> {
        let mut cmd = self.command();
        cmd.arg("--from0")
            .arg("--files-from=-")
            .arg(format!("{}/", src))
            .arg(format!("{}/", dest))
            .stdin(Stdio::piped());

        debug!(src = %src, dest = %dest, count = keys.len(), "running rsync batch");
        let mut child = cmd.spawn().context("failed to spawn rsync")?;
        let mut stdin = child
            .stdin
            .take()
            .context("failed to open rsync stdin")?;
        stdin.write_all(keys.join("\0").as_bytes()).await?;
        drop(stdin);

        let status = child.wait().await?;
        if !status.success() {
            anyhow::bail!("rsync exited with {}", status);
        }
        Ok(())
    }
}

impl fmt::Debug for RsyncBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsyncBackend")
            .field("remote", &self.remote)
            .field("sshuser", &self.sshuser)
            .field("sshport", &self.sshport)
            .finish()
    }
}

#[async_trait]
impl SyncBackend for RsyncBackend {
    async fn upload(&self, local: &Path, key: &str) -> anyhow::Result<()> {
        let status = self
            .command()
            .arg(local)
            .arg(format!("{}/{}", self.remote, key))
            .status()
            .await
            .context("failed to spawn rsync")?;
        if !status.success() {
            anyhow::bail!("rsync upload of {} exited with {}", key, status);
        }
        Ok(())
    }

    async fn download(&self, key: &str, local: &Path) -> anyhow::Result<()> {
        let status = self
            .command()
            .arg(format!("{}/{}", self.remote, key))
            .arg(local)
            .status()
            .await
            .context("failed to spawn rsync")?;
        if !status.success() {
            // rsync exits 23 when the source file does not exist
            return Err(anyhow::Error::from(StoreError::not_found(key))
                .context(format!("rsync exited with {}", status)));
        }
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<HashSet<String>> {
        anyhow::bail!("rsync remotes do not support listing")
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        anyhow::bail!("rsync remotes do not support deletion (key {})", key)
    }

    /// One rsync process for the whole batch, cache → remote. A batch
    /// failure reports every key as failed rather than erroring out, so the
    /// caller's per-object accounting stays uniform across backends.
    async fn upload_many(&self, objdir: &Path, keys: &[String]) -> anyhow::Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let src = objdir.to_string_lossy();
        if let Err(e) = self.transfer_batch(&src, &self.remote, keys).await {
            warn!(error = %e, "rsync batch push failed");
            return Ok(keys.to_vec());
        }
        Ok(Vec::new())
    }

    /// One rsync process for the whole batch, remote → dest. Keys missing
    /// from `dest` afterwards are reported as failed.
    async fn download_many(&self, dest: &Path, keys: &[String]) -> anyhow::Result<Vec<String>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let dest_str = dest.to_string_lossy();
        if let Err(e) = self.transfer_batch(&self.remote, &dest_str, keys).await {
            warn!(error = %e, "rsync batch pull reported failures");
        }
        let failed = keys
            .iter()
            .filter(|key| !dest.join(key).is_file())
            .cloned()
            .collect();
        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_remote() {
        assert!(RsyncBackend::new("", None, None).is_err());
    }

    #[test]
    fn test_rsh_arg_formatting() {
        let backend = RsyncBackend::new(
            "host:/srv/fat",
            Some("deploy".to_string()),
            Some("2222".to_string()),
        )
        .unwrap();
        assert_eq!(
            backend.rsh_arg().unwrap(),
            "--rsh=ssh -l deploy -p 2222"
        );

        let plain = RsyncBackend::new("host:/srv/fat", None, None).unwrap();
        assert!(plain.rsh_arg().is_none());
    }

    #[test]
    fn test_nul_separated_file_list() {
        let keys = vec!["aaaa".to_string(), "bbbb".to_string(), "cccc".to_string()];
        assert_eq!(keys.join("\0"), "aaaa\0bbbb\0cccc");
    }

    #[tokio::test]
    async fn test_upload_many_reports_all_keys_on_batch_failure() {
        // Source directory does not exist, so the batch cannot succeed
        // whether or not an rsync binary is present
        let backend = RsyncBackend::new("/nonexistent/fat-remote", None, None).unwrap();
        let keys = vec!["aaaa".to_string(), "bbbb".to_string()];
        let failed = backend
            .upload_many(Path::new("/nonexistent/fat-objects"), &keys)
            .await
            .unwrap();
        assert_eq!(failed, keys);
    }

    #[tokio::test]
    async fn test_list_is_unsupported() {
        let backend = RsyncBackend::new("host:/srv/fat", None, None).unwrap();
        assert!(backend.list().await.is_err());
    }
}

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

//! Reconciliation between referenced, cached and remote objects
//!
//! Everything here is set algebra over digest strings:
//!
//! - push transfers `referenced ∩ cached` (an object can only go out if we
//!   actually have it)
//! - pull transfers `wanted − cached`
//! - status reports `referenced − cached` (orphans) and
//!   `cached − referenced` (stale)
//!
//! Transfers attempt every object; per-object failures are collected, never
//! short-circuited. Pulled objects are staged in a temp directory inside the
//! cache root and digest-verified before insertion, so a corrupt or
//! tampered download can never enter the cache under a digest it does not
//! hash to.

use crate::error::FatResult;
use gitfat_store::hasher::hash_file;
use gitfat_store::{ObjectCache, StoreError, SyncBackend};
use std::collections::HashSet;
use tracing::{info, warn};

/// Outcome of a push or pull
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Digests that needed transfer
    pub attempted: usize,
    /// Digests transferred (and, for pull, verified) successfully
    pub transferred: usize,
    /// Digests that failed, each with a reason
    pub failed: Vec<(String, String)>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orphan/stale breakdown from `git fat status`
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    /// Referenced but not cached: a pull would fetch these
    pub orphans: Vec<String>,
    /// Cached but not referenced: garbage-collection candidates
    pub stale: Vec<String>,
}

/// Upload every referenced object the cache holds.
pub async fn push(
    cache: &ObjectCache,
    backend: &dyn SyncBackend,
    referenced: &HashSet<String>,
) -> FatResult<SyncReport> {
    let cached = cache.list()?;
    let mut to_push: Vec<String> = referenced.intersection(&cached).cloned().collect();
    to_push.sort();

    info!(count = to_push.len(), "pushing objects");
    let failed = backend.upload_many(cache.root(), &to_push).await?;
    let report = SyncReport {
        attempted: to_push.len(),
        transferred: to_push.len() - failed.len(),
        failed: failed
            .into_iter()
            .map(|d| (d, "upload failed".to_string()))
            .collect(),
    };
    Ok(report)
}

/// Download every wanted object the cache is missing.
///
/// Objects are staged under the cache root, verified against the digest they
/// were requested as, and only then renamed into the cache. The staging
/// directory is removed when this returns.
pub async fn pull_objects(
    cache: &ObjectCache,
    backend: &dyn SyncBackend,
    wanted: &HashSet<String>,
) -> FatResult<SyncReport> {
    let cached = cache.list()?;
    let mut to_pull: Vec<String> = wanted.difference(&cached).cloned().collect();
    to_pull.sort();

    info!(count = to_pull.len(), "pulling objects");
    let stage = tempfile::tempdir_in(cache.root())?;
    let transport_failed = backend.download_many(stage.path(), &to_pull).await?;

    let mut report = SyncReport {
        attempted: to_pull.len(),
        ..Default::default()
    };
    let transport_failed: HashSet<String> = transport_failed.into_iter().collect();

    for digest in &to_pull {
        if transport_failed.contains(digest) {
            report
                .failed
                .push((digest.clone(), "download failed".to_string()));
            continue;
        }
        let staged = stage.path().join(digest);
        let (actual, _) = match hash_file(&staged) {
            Ok(pair) => pair,
            // Backend reported success but left no file behind
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report
                    .failed
                    .push((digest.clone(), "download failed".to_string()));
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if actual != *digest {
            let err = StoreError::DigestMismatch {
                expected: digest.clone(),
                actual,
            };
            warn!(%err, "discarding download");
            std::fs::remove_file(&staged)?;
            report.failed.push((digest.clone(), err.to_string()));
            continue;
        }
        cache.insert_file(&staged, digest)?;
        report.transferred += 1;
    }
    Ok(report)
}

/// Compare referenced against cached without touching anything.
pub fn status(cache: &ObjectCache, referenced: &HashSet<String>) -> FatResult<StatusReport> {
    let cached = cache.list()?;
    let mut orphans: Vec<String> = referenced.difference(&cached).cloned().collect();
    let mut stale: Vec<String> = cached.difference(referenced).cloned().collect();
    orphans.sort();
    stale.sort();
    Ok(StatusReport { orphans, stale })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gitfat_store::mock::MockBackend;
    use std::io::Write;
    use tempfile::TempDir;

    const DIGEST_A: &str = "6df0c57803617bba277e90c6fa01071fb6bfebb5"; // "fat content a\n"
    const DIGEST_B: &str = "22596363b3de40b06f981fb85d82312e8c0ed511"; // "hello world\n"

    fn cache_with(objects: &[(&str, &[u8])]) -> (TempDir, ObjectCache) {
        let dir = TempDir::new().unwrap();
        let cache = ObjectCache::open(dir.path().join("objects")).unwrap();
        for (digest, content) in objects {
            let mut temp = cache.stage_temp().unwrap();
            temp.write_all(content).unwrap();
            cache.put(temp, digest).unwrap();
        }
        (dir, cache)
    }

    fn set(digests: &[&str]) -> HashSet<String> {
        digests.iter().map(|d| d.to_string()).collect()
    }

    #[tokio::test]
    async fn test_push_only_sends_referenced_and_cached() {
        let (_dir, cache) = cache_with(&[
            (DIGEST_A, b"fat content a\n"),
            (DIGEST_B, b"hello world\n"),
        ]);
        let backend = MockBackend::new();

        // B is cached but not referenced; a third digest is referenced but
        // not cached
        let referenced = set(&[DIGEST_A, "0000000000000000000000000000000000000000"]);
        let report = push(&cache, &backend, &referenced).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.transferred, 1);
        assert!(report.is_complete());
        assert!(backend.get_raw(DIGEST_A).await.is_some());
        assert!(backend.get_raw(DIGEST_B).await.is_none());
    }

    #[tokio::test]
    async fn test_pull_fetches_only_missing() {
        let (_dir, cache) = cache_with(&[(DIGEST_A, b"fat content a\n")]);
        let backend = MockBackend::new();
        backend.insert_raw(DIGEST_A, b"fat content a\n").await;
        backend.insert_raw(DIGEST_B, b"hello world\n").await;

        let wanted = set(&[DIGEST_A, DIGEST_B]);
        let report = pull_objects(&cache, &backend, &wanted).await.unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.transferred, 1);
        assert!(cache.has(DIGEST_B));
    }

    #[tokio::test]
    async fn test_pull_rejects_digest_mismatch() {
        let (_dir, cache) = cache_with(&[]);
        let backend = MockBackend::new();
        // Wrong content planted under A's digest
        backend.insert_raw(DIGEST_A, b"tampered bytes\n").await;

        let report = pull_objects(&cache, &backend, &set(&[DIGEST_A]))
            .await
            .unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.transferred, 0);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("digest mismatch"));
        assert!(report.failed[0].1.contains(DIGEST_A));
        assert!(!cache.has(DIGEST_A));
        // No staging residue
        assert!(cache.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pull_partial_failure_attempts_all() {
        let (_dir, cache) = cache_with(&[]);
        let backend = MockBackend::new();
        backend.insert_raw(DIGEST_A, b"fat content a\n").await;
        backend.insert_raw(DIGEST_B, b"hello world\n").await;
        backend.fail_key(DIGEST_A).await;

        let report = pull_objects(&cache, &backend, &set(&[DIGEST_A, DIGEST_B]))
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.transferred, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, DIGEST_A);
        assert!(cache.has(DIGEST_B));
    }

    #[tokio::test]
    async fn test_status_reports_orphans_and_stale() {
        let (_dir, cache) = cache_with(&[
            (DIGEST_A, b"fat content a\n"),
            (DIGEST_B, b"hello world\n"),
        ]);
        let missing = "0000000000000000000000000000000000000000";
        let referenced = set(&[DIGEST_A, missing]);

        let report = status(&cache, &referenced).unwrap();
        assert_eq!(report.orphans, vec![missing.to_string()]);
        assert_eq!(report.stale, vec![DIGEST_B.to_string()]);
    }

    #[tokio::test]
    async fn test_push_nothing_to_do() {
        let (_dir, cache) = cache_with(&[]);
        let backend = MockBackend::new();
        let report = push(&cache, &backend, &HashSet::new()).await.unwrap();
        assert_eq!(report.attempted, 0);
        assert!(report.is_complete());
    }
}

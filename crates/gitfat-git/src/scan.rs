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

//! History and working-tree scanning
//!
//! Finds every stub a repository references. History scans run in two
//! explicit passes: pass one walks commit trees collecting blob ids whose
//! object-header size matches a stub magic length and decoding those
//! candidates once; pass two re-walks the same trees to resolve a path for
//! each collected id. Visited trees are deduped by id, so deep histories
//! with mostly-unchanged trees stay cheap, and only the candidate map is
//! ever held in memory. Blob content is read only for size-matched
//! candidates.

use crate::error::{GitError, GitResult};
use crate::stub::{magic_lengths, magiclen, Stub};
use git2::{ObjectType, Oid, Repository, TreeWalkMode, TreeWalkResult};
use gitfat_store::ObjectCache;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Which commits a history scan covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanRange {
    /// The `HEAD` snapshot only
    Head,
    /// Every commit reachable from any ref
    FullHistory,
}

/// A stub found in history, with the path it was committed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatObject {
    pub digest: String,
    pub path: PathBuf,
    pub size: Option<u64>,
    pub blob_id: Oid,
}

/// A blob over a size threshold, from `git fat find`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeBlob {
    pub blob_id: Oid,
    pub size: u64,
    pub path: PathBuf,
}

/// Scans history and the working tree for stubs
pub struct HistoryScanner<'r> {
    repo: &'r Repository,
}

impl<'r> HistoryScanner<'r> {
    pub fn new(repo: &'r Repository) -> Self {
        HistoryScanner { repo }
    }

    /// Every stub referenced in the given range, one entry per digest.
    pub fn scan(&self, range: ScanRange) -> GitResult<Vec<FatObject>> {
        let trees = self.root_trees(range)?;
        let odb = self.repo.odb()?;

        // Pass one: candidate blobs by size, decoded once
        let mut visited = HashSet::new();
        let mut candidates: HashMap<Oid, Stub> = HashMap::new();
        for tree_id in &trees {
            let tree = self.repo.find_tree(*tree_id)?;
            if !visited.insert(tree.id()) {
                continue;
            }
            tree.walk(TreeWalkMode::PreOrder, |_, entry| {
                match entry.kind() {
                    Some(ObjectType::Tree) => {
                        if !visited.insert(entry.id()) {
                            return TreeWalkResult::Skip;
                        }
                    }
                    Some(ObjectType::Blob) => {
                        if !candidates.contains_key(&entry.id()) {
                            if let Ok((size, _)) = odb.read_header(entry.id()) {
                                if magic_lengths().contains(&size) {
                                    if let Ok(blob) = self.repo.find_blob(entry.id()) {
                                        if let Some(stub) = Stub::decode(blob.content()) {
                                            candidates.insert(entry.id(), stub);
                                        }
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
                TreeWalkResult::Ok
            })?;
        }
        debug!(candidates = candidates.len(), "history scan pass one done");

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        // Pass two: resolve one path per candidate id
        let mut paths: HashMap<Oid, PathBuf> = HashMap::new();
        let mut visited = HashSet::new();
        for tree_id in &trees {
            if paths.len() == candidates.len() {
                break;
            }
            let tree = self.repo.find_tree(*tree_id)?;
            if !visited.insert(tree.id()) {
                continue;
            }
            tree.walk(TreeWalkMode::PreOrder, |root, entry| {
                match entry.kind() {
                    Some(ObjectType::Tree) => {
                        if !visited.insert(entry.id()) {
                            return TreeWalkResult::Skip;
                        }
                    }
                    Some(ObjectType::Blob) => {
                        if candidates.contains_key(&entry.id()) && !paths.contains_key(&entry.id())
                        {
                            let name = entry.name().unwrap_or("");
                            paths.insert(entry.id(), PathBuf::from(format!("{root}{name}")));
                        }
                    }
                    _ => {}
                }
                TreeWalkResult::Ok
            })?;
        }

        let mut objects: Vec<FatObject> = candidates
            .into_iter()
            .map(|(blob_id, stub)| FatObject {
                digest: stub.digest,
                path: paths.get(&blob_id).cloned().unwrap_or_default(),
                size: stub.size,
                blob_id,
            })
            .collect();
        objects.sort_by(|a, b| a.path.cmp(&b.path));
        info!(count = objects.len(), range = ?range, "history scan complete");
        Ok(objects)
    }

    /// The digests referenced in the given range.
    pub fn referenced(&self, range: ScanRange) -> GitResult<HashSet<String>> {
        Ok(self.scan(range)?.into_iter().map(|o| o.digest).collect())
    }

    /// Stub placeholders in the working tree, matched against glob patterns
    /// (all index entries when `patterns` is empty).
    ///
    /// A placeholder is a regular file whose `lstat` size equals the current
    /// magic length and whose content decodes as a stub.
    pub fn find_orphans_in_working_tree(
        &self,
        patterns: &[String],
    ) -> GitResult<Vec<(String, PathBuf)>> {
        let workdir = self.repo.workdir().ok_or(GitError::BareRepository)?;
        let globs = patterns
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| GitError::invalid_pattern(p, e.to_string()))
            })
            .collect::<GitResult<Vec<_>>>()?;

        let index = self.repo.index()?;
        let mut orphans = Vec::new();
        for entry in index.iter() {
            let rel = match std::str::from_utf8(&entry.path) {
                Ok(path) => PathBuf::from(path),
                Err(_) => continue,
            };
            if !globs.is_empty() && !globs.iter().any(|g| g.matches_path(&rel)) {
                continue;
            }

            let full = workdir.join(&rel);
            // lstat so a symlink to a stub-sized file is not mistaken for one
            let meta = match std::fs::symlink_metadata(&full) {
                Ok(meta) => meta,
                Err(_) => continue,
            };
            if !meta.is_file() || meta.len() != magiclen() as u64 {
                continue;
            }
            let content = std::fs::read(&full)?;
            if let Some(stub) = Stub::decode(&content) {
                orphans.push((stub.digest, rel));
            }
        }
        debug!(count = orphans.len(), "working tree orphan scan complete");
        Ok(orphans)
    }

    /// Replace working-tree placeholders with their cached content.
    ///
    /// Each placeholder whose object is cached is re-verified to still be a
    /// stub, removed, and restored with `git checkout-index --index --force`.
    /// Removing the file first defeats git's stat cache: checkout-index then
    /// has to re-run the smudge filter. Returns how many were restored.
    pub fn resmudge(
        &self,
        cache: &ObjectCache,
        orphans: &[(String, PathBuf)],
    ) -> GitResult<usize> {
        let workdir = self.repo.workdir().ok_or(GitError::BareRepository)?;

        let mut restorable = Vec::new();
        for (digest, rel) in orphans {
            if !cache.has(digest) {
                continue;
            }
            let full = workdir.join(rel);
            // Re-verify right before removal: the file may have changed
            // since the orphan scan
            match std::fs::read(&full) {
                Ok(content) if Stub::decode(&content).is_some() => {
                    std::fs::remove_file(&full)?;
                    restorable.push(rel.clone());
                }
                Ok(_) => {
                    warn!(path = %rel.display(), "placeholder changed on disk, skipping");
                }
                Err(e) => {
                    warn!(path = %rel.display(), error = %e, "cannot read placeholder, skipping");
                }
            }
        }

        if restorable.is_empty() {
            return Ok(0);
        }
        checkout_index(workdir, &restorable)?;
        info!(count = restorable.len(), "restored placeholders");
        Ok(restorable.len())
    }

    /// Blobs at or over `threshold` bytes, with one path each.
    pub fn find_large(&self, range: ScanRange, threshold: u64) -> GitResult<Vec<LargeBlob>> {
        let trees = self.root_trees(range)?;
        let odb = self.repo.odb()?;

        let mut visited = HashSet::new();
        let mut found: HashMap<Oid, LargeBlob> = HashMap::new();
        for tree_id in &trees {
            let tree = self.repo.find_tree(*tree_id)?;
            if !visited.insert(tree.id()) {
                continue;
            }
            tree.walk(TreeWalkMode::PreOrder, |root, entry| {
                match entry.kind() {
                    Some(ObjectType::Tree) => {
                        if !visited.insert(entry.id()) {
                            return TreeWalkResult::Skip;
                        }
                    }
                    Some(ObjectType::Blob) => {
                        if !found.contains_key(&entry.id()) {
                            if let Ok((size, _)) = odb.read_header(entry.id()) {
                                if size as u64 >= threshold {
                                    let name = entry.name().unwrap_or("");
                                    found.insert(
                                        entry.id(),
                                        LargeBlob {
                                            blob_id: entry.id(),
                                            size: size as u64,
                                            path: PathBuf::from(format!("{root}{name}")),
                                        },
                                    );
                                }
                            }
                        }
                    }
                    _ => {}
                }
                TreeWalkResult::Ok
            })?;
        }

        let mut blobs: Vec<LargeBlob> = found.into_values().collect();
        blobs.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        Ok(blobs)
    }

    /// Root trees of the commits the range covers, in traversal order.
    fn root_trees(&self, range: ScanRange) -> GitResult<Vec<Oid>> {
        match range {
            ScanRange::Head => match self.repo.head() {
                Ok(head) => Ok(vec![head.peel_to_tree()?.id()]),
                // Unborn branch: nothing committed yet
                Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(Vec::new()),
                Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(Vec::new()),
                Err(e) => Err(e.into()),
            },
            ScanRange::FullHistory => {
                let mut revwalk = self.repo.revwalk()?;
                revwalk.push_glob("*")?;
                let mut trees = Vec::new();
                for oid in revwalk {
                    let commit = self.repo.find_commit(oid?)?;
                    trees.push(commit.tree_id());
                }
                Ok(trees)
            }
        }
    }
}

/// One `git checkout-index --index --force` for the whole batch.
///
/// libgit2 checks files out without running external filter drivers, so the
/// real git binary does the restore and the smudge filter with it.
fn checkout_index(workdir: &Path, paths: &[PathBuf]) -> GitResult<()> {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir)
        .arg("checkout-index")
        .arg("--index")
        .arg("--force")
        .arg("--");
    for path in paths {
        cmd.arg(path);
    }

    let output = cmd.output()?;
    if !output.status.success() {
        return Err(GitError::CheckoutIndex(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DIGEST_A: &str = "6df0c57803617bba277e90c6fa01071fb6bfebb5";
    const DIGEST_B: &str = "2f319e3bc958b43dfe5a6b715701c67257dde64b";

    /// A repository with one commit containing a stub, an ordinary file,
    /// and a stub-length decoy that is not a stub.
    fn fixture_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "test").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        (dir, repo)
    }

    fn commit_files(repo: &Repository, files: &[(&str, &[u8])], message: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        let mut index = repo.index().unwrap();
        for (path, content) in files {
            let full = workdir.join(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&full, content).unwrap();
            index.add_path(Path::new(path)).unwrap();
        }
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = repo.signature().unwrap();
        let parent = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<_> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .unwrap()
    }

    #[test]
    fn test_scan_head_finds_stub() {
        let (_dir, repo) = fixture_repo();
        let stub = Stub::new(DIGEST_A, 14).encode();
        let mut decoy = vec![b'x'; magiclen()];
        decoy[0] = b'y';
        commit_files(
            &repo,
            &[
                ("media/a.bin", stub.as_slice()),
                ("readme.txt", b"ordinary\n"),
                ("decoy.bin", &decoy),
            ],
            "add files",
        );

        let scanner = HistoryScanner::new(&repo);
        let objects = scanner.scan(ScanRange::Head).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].digest, DIGEST_A);
        assert_eq!(objects[0].path, PathBuf::from("media/a.bin"));
        assert_eq!(objects[0].size, Some(14));
    }

    #[test]
    fn test_scan_full_history_finds_removed_stub() {
        let (_dir, repo) = fixture_repo();
        let stub_a = Stub::new(DIGEST_A, 14).encode();
        let stub_b = Stub::new(DIGEST_B, 9).encode();
        commit_files(&repo, &[("a.bin", stub_a.as_slice())], "add a");
        // Second commit replaces a.bin entirely
        let workdir = repo.workdir().unwrap().to_path_buf();
        std::fs::remove_file(workdir.join("a.bin")).unwrap();
        {
            let mut index = repo.index().unwrap();
            index.remove_path(Path::new("a.bin")).unwrap();
            index.write().unwrap();
        }
        commit_files(&repo, &[("b.bin", stub_b.as_slice())], "replace a with b");

        let scanner = HistoryScanner::new(&repo);
        let head: HashSet<String> = scanner.referenced(ScanRange::Head).unwrap();
        assert_eq!(head, HashSet::from([DIGEST_B.to_string()]));

        let full = scanner.referenced(ScanRange::FullHistory).unwrap();
        assert_eq!(
            full,
            HashSet::from([DIGEST_A.to_string(), DIGEST_B.to_string()])
        );
    }

    #[test]
    fn test_scan_empty_repo() {
        let (_dir, repo) = fixture_repo();
        let scanner = HistoryScanner::new(&repo);
        assert!(scanner.scan(ScanRange::Head).unwrap().is_empty());
        assert!(scanner.scan(ScanRange::FullHistory).unwrap().is_empty());
    }

    #[test]
    fn test_find_orphans_respects_patterns() {
        let (_dir, repo) = fixture_repo();
        let stub_a = Stub::new(DIGEST_A, 14).encode();
        let stub_b = Stub::new(DIGEST_B, 9).encode();
        commit_files(
            &repo,
            &[
                ("media/a.bin", stub_a.as_slice()),
                ("docs/b.bin", stub_b.as_slice()),
                ("readme.txt", b"ordinary\n"),
            ],
            "add files",
        );

        let scanner = HistoryScanner::new(&repo);
        let all = scanner.find_orphans_in_working_tree(&[]).unwrap();
        assert_eq!(all.len(), 2);

        let media = scanner
            .find_orphans_in_working_tree(&["media/*".to_string()])
            .unwrap();
        assert_eq!(media.len(), 1);
        assert_eq!(media[0].0, DIGEST_A);
        assert_eq!(media[0].1, PathBuf::from("media/a.bin"));
    }

    #[test]
    fn test_find_orphans_rejects_bad_pattern() {
        let (_dir, repo) = fixture_repo();
        let scanner = HistoryScanner::new(&repo);
        let err = scanner
            .find_orphans_in_working_tree(&["[".to_string()])
            .unwrap_err();
        assert!(matches!(err, GitError::InvalidPattern { .. }));
    }

    #[test]
    fn test_find_large() {
        let (_dir, repo) = fixture_repo();
        let big = vec![0u8; 5000];
        commit_files(
            &repo,
            &[("big.bin", big.as_slice()), ("small.txt", b"tiny\n")],
            "add files",
        );

        let scanner = HistoryScanner::new(&repo);
        let blobs = scanner.find_large(ScanRange::Head, 4096).unwrap();
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].size, 5000);
        assert_eq!(blobs[0].path, PathBuf::from("big.bin"));
    }

    #[test]
    fn test_resmudge_skips_uncached_and_changed() {
        let (_dir, repo) = fixture_repo();
        let cache_dir = TempDir::new().unwrap();
        let cache = ObjectCache::open(cache_dir.path().join("objects")).unwrap();

        let stub_a = Stub::new(DIGEST_A, 14).encode();
        commit_files(&repo, &[("a.bin", stub_a.as_slice())], "add a");

        let scanner = HistoryScanner::new(&repo);
        let orphans = scanner.find_orphans_in_working_tree(&[]).unwrap();
        assert_eq!(orphans.len(), 1);

        // Object not cached: nothing restored, placeholder untouched
        let restored = scanner.resmudge(&cache, &orphans).unwrap();
        assert_eq!(restored, 0);
        assert!(repo.workdir().unwrap().join("a.bin").exists());
    }
}

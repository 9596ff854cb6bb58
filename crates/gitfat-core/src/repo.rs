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

//! Repository orchestration
//!
//! [`FatRepo`] ties the pieces together: the discovered git repository, the
//! object cache under `<gitdir>/fat/objects`, the `.gitfat` configuration
//! (loaded lazily; only operations that reach a remote need it), and the
//! scanner/filter/reconciliation layers.

use crate::backend::select_backend;
use crate::error::{FatError, FatResult};
use crate::reconcile::{self, StatusReport, SyncReport};
use gitfat_config::GitFatConfig;
use gitfat_git::{FatObject, FilterEngine, HistoryScanner, LargeBlob, ScanRange};
use gitfat_store::ObjectCache;
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Relative path of the object cache inside the git directory
const OBJECTS_DIR: &str = "fat/objects";

/// A git repository with fat-file support
pub struct FatRepo {
    repo: git2::Repository,
    cache: ObjectCache,
}

impl std::fmt::Debug for FatRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatRepo")
            .field("gitdir", &self.repo.path())
            .field("cache", &self.cache)
            .finish()
    }
}

impl FatRepo {
    /// Discover the repository containing `path` and open its object cache.
    pub fn discover<P: AsRef<Path>>(path: P) -> FatResult<Self> {
        let path = path.as_ref();
        let repo = git2::Repository::discover(path)
            .map_err(|_| FatError::NotAGitRepository(path.to_path_buf()))?;
        let cache = ObjectCache::open(repo.path().join(OBJECTS_DIR))?;
        debug!(gitdir = %repo.path().display(), "opened repository");
        Ok(FatRepo { repo, cache })
    }

    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    pub fn repo(&self) -> &git2::Repository {
        &self.repo
    }

    fn range(full_history: bool) -> ScanRange {
        if full_history {
            ScanRange::FullHistory
        } else {
            ScanRange::Head
        }
    }

    /// The parsed `.gitfat` file at the work-tree root.
    ///
    /// Loaded on demand: `init`, `status`, `list` and the filters all work
    /// without a remote configured.
    pub fn config(&self) -> FatResult<GitFatConfig> {
        let worktree = self.repo.workdir().ok_or(gitfat_git::GitError::BareRepository)?;
        Ok(gitfat_config::load(worktree)?)
    }

    /// Register the fat filter in the repository configuration and create
    /// the object directory. Idempotent.
    pub fn init(&self) -> FatResult<()> {
        let mut config = self.repo.config().map_err(gitfat_git::GitError::from)?;
        config
            .set_str("filter.fat.clean", "git-fat filter-clean %f")
            .map_err(gitfat_git::GitError::from)?;
        config
            .set_str("filter.fat.smudge", "git-fat filter-smudge %f")
            .map_err(gitfat_git::GitError::from)?;
        info!("initialized fat filter configuration");
        Ok(())
    }

    /// Upload every referenced object the cache holds.
    pub async fn push(&self, full_history: bool) -> FatResult<SyncReport> {
        let scanner = HistoryScanner::new(&self.repo);
        let referenced = scanner.referenced(Self::range(full_history))?;
        let backend = select_backend(&self.config()?.remote()?).await?;
        reconcile::push(&self.cache, backend.as_ref(), &referenced).await
    }

    /// Download missing objects, then restore working-tree placeholders.
    ///
    /// With explicit `patterns`, only placeholders at matching paths are
    /// considered and no history walk runs. Without patterns, everything
    /// referenced in the range is wanted.
    pub async fn pull(&self, patterns: &[String], full_history: bool) -> FatResult<SyncReport> {
        let scanner = HistoryScanner::new(&self.repo);

        let orphans = scanner.find_orphans_in_working_tree(patterns)?;
        let wanted: HashSet<String> = if patterns.is_empty() {
            scanner.referenced(Self::range(full_history))?
        } else {
            orphans.iter().map(|(digest, _)| digest.clone()).collect()
        };

        let backend = select_backend(&self.config()?.remote()?).await?;
        let report = reconcile::pull_objects(&self.cache, backend.as_ref(), &wanted).await?;

        let restored = scanner.resmudge(&self.cache, &orphans)?;
        debug!(restored = restored, "pull restore pass done");
        Ok(report)
    }

    /// Restore every working-tree placeholder whose object is cached.
    pub fn checkout(&self) -> FatResult<usize> {
        let scanner = HistoryScanner::new(&self.repo);
        let orphans = scanner.find_orphans_in_working_tree(&[])?;
        Ok(scanner.resmudge(&self.cache, &orphans)?)
    }

    /// Orphan/stale digests relative to the given range.
    pub fn status(&self, full_history: bool) -> FatResult<StatusReport> {
        let scanner = HistoryScanner::new(&self.repo);
        let referenced = scanner.referenced(Self::range(full_history))?;
        reconcile::status(&self.cache, &referenced)
    }

    /// Every managed file in the range, with digest and path.
    pub fn list(&self, full_history: bool) -> FatResult<Vec<FatObject>> {
        let scanner = HistoryScanner::new(&self.repo);
        Ok(scanner.scan(Self::range(full_history))?)
    }

    /// Blobs at or over `threshold` bytes across full history.
    pub fn find(&self, threshold: u64) -> FatResult<Vec<LargeBlob>> {
        let scanner = HistoryScanner::new(&self.repo);
        Ok(scanner.find_large(ScanRange::FullHistory, threshold)?)
    }

    /// Clean filter entry point (stdin → stdout).
    ///
    /// With a path hint, the conversion guard runs first: a path committed
    /// as ordinary content passes through untouched instead of being
    /// converted to a stub.
    pub fn filter_clean<R: Read, W: Write>(
        &self,
        path_hint: Option<&Path>,
        input: &mut R,
        output: &mut W,
    ) -> FatResult<()> {
        if let Some(path) = path_hint {
            if !FilterEngine::can_clean(&self.repo, path) {
                debug!(path = %path.display(), "conversion guard: passing through");
                std::io::copy(input, output).map_err(gitfat_git::GitError::from)?;
                return Ok(());
            }
        }
        let engine = FilterEngine::new(self.cache.clone());
        Ok(engine.clean(input, output)?)
    }

    /// Smudge filter entry point (stdin → stdout).
    pub fn filter_smudge<R: Read, W: Write>(
        &self,
        input: &mut R,
        output: &mut W,
    ) -> FatResult<()> {
        let engine = FilterEngine::new(self.cache.clone());
        Ok(engine.smudge(input, output)?)
    }

    /// Rewrite index entries for the paths listed in `filelist` (one per
    /// line) to stubs, caching their content.
    ///
    /// Meant to run under `git filter-branch --index-filter` to convert
    /// files committed fat in earlier history; honors `GIT_INDEX_FILE`.
    /// Returns the number of entries converted.
    pub fn index_filter(&self, filelist: &Path, add_attributes: bool) -> FatResult<usize> {
        let content = std::fs::read_to_string(filelist)?;
        let files: HashSet<String> = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let engine = FilterEngine::new(self.cache.clone());
        Ok(engine.index_filter(&self.repo, &files, add_attributes)?)
    }

    /// Work-tree paths of placeholders, for reporting.
    pub fn orphan_paths(&self) -> FatResult<Vec<(String, PathBuf)>> {
        let scanner = HistoryScanner::new(&self.repo);
        Ok(scanner.find_orphans_in_working_tree(&[])?)
    }
}

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

//! The clean filter must never silently convert a file that was committed
//! as ordinary content; only new paths and paths already committed as stubs
//! may be cleaned.

use git2::Repository;
use gitfat_git::{FilterEngine, Stub};
use std::path::Path;
use tempfile::TempDir;

const DIGEST: &str = "6df0c57803617bba277e90c6fa01071fb6bfebb5";

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

fn commit_file(repo: &Repository, path: &str, content: &[u8]) {
    let workdir = repo.workdir().unwrap();
    let full = workdir.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&full, content).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(path)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = repo.signature().unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parents)
        .unwrap();
}

#[test]
fn new_path_may_be_cleaned() {
    let (_dir, repo) = fixture_repo();
    commit_file(&repo, "readme.txt", b"ordinary\n");
    assert!(FilterEngine::can_clean(&repo, Path::new("media/new.bin")));
}

#[test]
fn empty_repo_allows_cleaning() {
    let (_dir, repo) = fixture_repo();
    assert!(FilterEngine::can_clean(&repo, Path::new("anything.bin")));
}

#[test]
fn committed_ordinary_content_blocks_cleaning() {
    let (_dir, repo) = fixture_repo();
    commit_file(&repo, "readme.txt", b"ordinary\n");
    assert!(!FilterEngine::can_clean(&repo, Path::new("readme.txt")));
}

#[test]
fn committed_stub_allows_recleaning() {
    let (_dir, repo) = fixture_repo();
    let stub = Stub::new(DIGEST, 14).encode();
    commit_file(&repo, "media/a.bin", &stub);
    assert!(FilterEngine::can_clean(&repo, Path::new("media/a.bin")));
}

#[test]
fn stub_length_ordinary_content_blocks_cleaning() {
    let (_dir, repo) = fixture_repo();
    let decoy = vec![b'x'; gitfat_git::magiclen()];
    commit_file(&repo, "decoy.bin", &decoy);
    assert!(!FilterEngine::can_clean(&repo, Path::new("decoy.bin")));
}

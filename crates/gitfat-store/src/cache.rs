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

//! Content-addressable object cache
//!
//! Objects live flat in one directory, each file named by the full hex
//! digest of its own content. Insertion goes through a temp file staged in
//! the same directory followed by an atomic rename, so a partially written
//! object is never visible under its final name and no file lock is needed:
//! git may run one filter process per file, concurrently, during a checkout.
//!
//! Objects are made read-only (`0444 & !umask`) before the rename so a
//! world-writable object is never visible under its final name.

use crate::error::{StoreError, StoreResult};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Outcome of a cache insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The object was inserted
    Inserted,
    /// An object with this digest was already cached; the source was discarded
    AlreadyCached,
}

/// A directory of content-addressed objects keyed by digest
#[derive(Debug, Clone)]
pub struct ObjectCache {
    root: PathBuf,
}

impl ObjectCache {
    /// Open (creating if necessary) the cache rooted at `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.exists() {
            fs::create_dir_all(&root)?;
        } else if !root.is_dir() {
            return Err(StoreError::backend(format!(
                "cache path exists but is not a directory: {}",
                root.display()
            )));
        }
        Ok(ObjectCache { root })
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path an object with the given digest lives at (whether or not it exists).
    pub fn object_path(&self, digest: &str) -> PathBuf {
        self.root.join(digest)
    }

    /// Whether an object with this digest is cached.
    pub fn has(&self, digest: &str) -> bool {
        self.object_path(digest).is_file()
    }

    /// All cached digests, from a literal directory listing.
    ///
    /// Staged temp files and anything else that is not a hex name are
    /// filtered out.
    pub fn list(&self) -> StoreResult<HashSet<String>> {
        let mut digests = HashSet::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.is_empty() && name.chars().all(|c| c.is_ascii_hexdigit()) {
                    digests.insert(name.to_string());
                }
            }
        }
        Ok(digests)
    }

    /// Open a cached object for reading.
    pub fn open_object(&self, digest: &str) -> StoreResult<File> {
        let path = self.object_path(digest);
        match File::open(&path) {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::not_found(digest))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Stage a temp file inside the cache root, so the final rename never
    /// crosses a filesystem boundary.
    pub fn stage_temp(&self) -> StoreResult<NamedTempFile> {
        Ok(NamedTempFile::new_in(&self.root)?)
    }

    /// Insert a staged temp file under `digest`.
    ///
    /// If the digest is already cached the temp file is discarded: content
    /// addressing guarantees the bytes are identical. Two concurrent inserts
    /// for one digest both succeed; the rename is atomic and replacing an
    /// identical-content file is harmless.
    pub fn put(&self, temp: NamedTempFile, digest: &str) -> StoreResult<PutOutcome> {
        let dest = self.object_path(digest);
        if dest.exists() {
            debug!(digest = %digest, "object already cached, discarding source");
            temp.close()?;
            return Ok(PutOutcome::AlreadyCached);
        }
        make_read_only(temp.path())?;
        temp.persist(&dest).map_err(|e| StoreError::Io(e.error))?;
        debug!(digest = %digest, "cached object");
        Ok(PutOutcome::Inserted)
    }

    /// Insert an already-written file (staged somewhere under the cache
    /// root) under `digest`, consuming it.
    pub fn insert_file(&self, src: &Path, digest: &str) -> StoreResult<PutOutcome> {
        let dest = self.object_path(digest);
        if dest.exists() {
            fs::remove_file(src)?;
            return Ok(PutOutcome::AlreadyCached);
        }
        make_read_only(src)?;
        fs::rename(src, &dest)?;
        debug!(digest = %digest, "cached object");
        Ok(PutOutcome::Inserted)
    }
}

/// Set `0444 & !umask` on unix; plain read-only elsewhere.
#[cfg(unix)]
fn make_read_only(path: &Path) -> StoreResult<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = 0o444 & !(current_umask() as u32);
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_read_only(path: &Path) -> StoreResult<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(path, perms)?;
    Ok(())
}

/// Read the process umask without changing it; umask(2) has no pure read call.
#[cfg(unix)]
#[allow(unsafe_code)]
fn current_umask() -> libc::mode_t {
    unsafe {
        let old = libc::umask(0);
        libc::umask(old);
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const DIGEST_A: &str = "6df0c57803617bba277e90c6fa01071fb6bfebb5";
    const DIGEST_B: &str = "22596363b3de40b06f981fb85d82312e8c0ed511";

    fn cache() -> (TempDir, ObjectCache) {
        let dir = TempDir::new().unwrap();
        let cache = ObjectCache::open(dir.path().join("objects")).unwrap();
        (dir, cache)
    }

    fn stage(cache: &ObjectCache, content: &[u8]) -> NamedTempFile {
        let mut temp = cache.stage_temp().unwrap();
        temp.write_all(content).unwrap();
        temp
    }

    #[test]
    fn test_open_creates_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("fat").join("objects");
        assert!(!root.exists());
        ObjectCache::open(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_open_rejects_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(ObjectCache::open(&file).is_err());
    }

    #[test]
    fn test_put_and_open() {
        let (_dir, cache) = cache();
        let temp = stage(&cache, b"fat content a\n");
        assert_eq!(cache.put(temp, DIGEST_A).unwrap(), PutOutcome::Inserted);
        assert!(cache.has(DIGEST_A));

        let mut file = cache.open_object(DIGEST_A).unwrap();
        let mut content = Vec::new();
        std::io::Read::read_to_end(&mut file, &mut content).unwrap();
        assert_eq!(content, b"fat content a\n");
    }

    #[test]
    fn test_open_missing_is_not_found() {
        let (_dir, cache) = cache();
        let err = cache.open_object(DIGEST_A).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_double_put_is_idempotent() {
        let (_dir, cache) = cache();
        let first = stage(&cache, b"fat content a\n");
        let second = stage(&cache, b"fat content a\n");
        assert_eq!(cache.put(first, DIGEST_A).unwrap(), PutOutcome::Inserted);
        assert_eq!(
            cache.put(second, DIGEST_A).unwrap(),
            PutOutcome::AlreadyCached
        );
        assert_eq!(cache.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_skips_non_hex_names() {
        let (_dir, cache) = cache();
        let temp = stage(&cache, b"hello world\n");
        cache.put(temp, DIGEST_B).unwrap();
        fs::write(cache.root().join("not-a-digest.txt"), b"junk").unwrap();

        let listed = cache.list().unwrap();
        assert_eq!(listed, HashSet::from([DIGEST_B.to_string()]));
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let (_dir, cache) = cache();
        let temp = stage(&cache, b"fat content a\n");
        cache.put(temp, DIGEST_A).unwrap();

        let entries: Vec<_> = fs::read_dir(cache.root()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_object_is_read_only() {
        use std::os::unix::fs::PermissionsExt;
        let (_dir, cache) = cache();
        let temp = stage(&cache, b"fat content a\n");
        cache.put(temp, DIGEST_A).unwrap();

        let mode = fs::metadata(cache.object_path(DIGEST_A))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o222, 0, "object must not be writable");
    }

    #[test]
    fn test_insert_file() {
        let (_dir, cache) = cache();
        let staged = cache.root().join("incoming.part");
        fs::write(&staged, b"hello world\n").unwrap();
        assert_eq!(
            cache.insert_file(&staged, DIGEST_B).unwrap(),
            PutOutcome::Inserted
        );
        assert!(!staged.exists());
        assert!(cache.has(DIGEST_B));
    }

    #[test]
    fn test_concurrent_puts_same_digest() {
        let (_dir, cache) = cache();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(std::thread::spawn(move || {
                let mut temp = cache.stage_temp().unwrap();
                temp.write_all(b"fat content a\n").unwrap();
                cache.put(temp, DIGEST_A).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.list().unwrap().len(), 1);
        assert!(cache.has(DIGEST_A));
    }
}

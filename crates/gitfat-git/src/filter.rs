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

//! Clean and smudge filters
//!
//! `clean` turns fat content into a stub on the way into the object
//! database; `smudge` turns a stub back into content on the way out. Both
//! are driven by git, one process per file, speaking stdin/stdout.
//!
//! Two properties matter more than anything else here:
//!
//! - clean is idempotent: content that is already a stub passes through
//!   unchanged, so re-filtering never double-wraps.
//! - smudge degrades gracefully: when the object is not cached the stub
//!   bytes are emitted unchanged. The working tree then holds a placeholder
//!   that a later `git fat pull` restores; it is never corrupted.

use crate::error::GitResult;
use crate::stub::{magic_lengths, magiclen, Stub};
use gitfat_store::hasher::{copy_and_hash, BLOCK_SIZE};
use gitfat_store::ObjectCache;
use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const ATTRIBUTES_FILE: &str = ".gitattributes";

/// Stream transforms between fat content and stubs
#[derive(Debug, Clone)]
pub struct FilterEngine {
    cache: ObjectCache,
}

impl FilterEngine {
    pub fn new(cache: ObjectCache) -> Self {
        FilterEngine { cache }
    }

    /// Clean filter: fat content in, one stub out.
    ///
    /// The payload is streamed through the hasher into a cache temp file and
    /// inserted under its digest; only then is the stub emitted. Zero-length
    /// input cleans to the stub of the empty payload.
    pub fn clean<R: Read, W: Write>(&self, input: &mut R, output: &mut W) -> GitResult<()> {
        let first = read_block(input)?;

        // Already a stub: pass through untouched
        if Stub::decode(&first).is_some() {
            debug!("input is already a stub, passing through");
            output.write_all(&first)?;
            io::copy(input, output)?;
            output.flush()?;
            return Ok(());
        }

        let mut temp = self.cache.stage_temp()?;
        let mut reader = first.as_slice().chain(input);
        let (digest, size) = copy_and_hash(&mut reader, Some(&mut temp))?;
        self.cache.put(temp, &digest)?;
        debug!(digest = %digest, size = size, "cleaned fat content");

        output.write_all(&Stub::new(digest, size).encode())?;
        output.flush()?;
        Ok(())
    }

    /// Smudge filter: stub in, fat content out.
    ///
    /// Non-stub input and stubs whose object is missing are copied through
    /// unchanged. No partial output: the cached object is opened before the
    /// first byte is written.
    pub fn smudge<R: Read, W: Write>(&self, input: &mut R, output: &mut W) -> GitResult<()> {
        let first = read_block(input)?;

        if let Some(stub) = Stub::decode(&first) {
            match self.cache.open_object(&stub.digest) {
                Ok(mut object) => {
                    debug!(digest = %stub.digest, "smudging stub");
                    io::copy(&mut object, output)?;
                    output.flush()?;
                    return Ok(());
                }
                Err(e) => {
                    warn!(digest = %stub.digest, error = %e,
                        "object not in cache, leaving stub in working tree");
                }
            }
        }

        output.write_all(&first)?;
        io::copy(input, output)?;
        output.flush()?;
        Ok(())
    }

    /// Conversion guard: may `path` be cleaned into a stub?
    ///
    /// True when the path has no committed content at `HEAD` or when that
    /// content is itself a stub. False when ordinary content is committed
    /// there: cleaning it would rewrite a file the user never marked as fat.
    /// The blob is only read when its size matches a magic length.
    pub fn can_clean(repo: &git2::Repository, path: &Path) -> bool {
        let entry = match head_blob(repo, path) {
            Some(blob) => blob,
            None => return true,
        };
        if !magic_lengths().contains(&entry.size()) {
            return false;
        }
        Stub::decode(entry.content()).is_some()
    }

    /// Rewrite the index entries for `files` to stubs, caching their
    /// content. This is the engine behind `git fat index-filter`, run once
    /// per commit by `git filter-branch --index-filter` to convert files
    /// committed fat in earlier history.
    ///
    /// Symlink entries are skipped, a blob cleaned once is reused when the
    /// same content appears again, and entries that are already stubs are
    /// left alone. With `add_attributes`, the `.gitattributes` entry in the
    /// index gains a `filter=fat -text` line per newly converted path.
    ///
    /// Honors `GIT_INDEX_FILE`, which filter-branch points at a temporary
    /// index. Returns the number of entries converted.
    pub fn index_filter(
        &self,
        repo: &git2::Repository,
        files: &HashSet<String>,
        add_attributes: bool,
    ) -> GitResult<usize> {
        let mut index = match std::env::var_os("GIT_INDEX_FILE") {
            Some(path) => git2::Index::open(Path::new(&path))?,
            None => repo.index()?,
        };

        let mut cleaned: HashMap<git2::Oid, git2::Oid> = HashMap::new();
        let mut converted = Vec::new();
        let entries: Vec<git2::IndexEntry> = index.iter().collect();
        for mut entry in entries {
            let path = match std::str::from_utf8(&entry.path) {
                Ok(path) => path.to_string(),
                Err(_) => continue,
            };
            if !files.contains(&path) || entry.mode == 0o120_000 {
                continue;
            }

            let new_id = match cleaned.get(&entry.id) {
                Some(id) => *id,
                None => {
                    let blob = repo.find_blob(entry.id)?;
                    let mut stub_bytes = Vec::new();
                    self.clean(&mut blob.content(), &mut stub_bytes)?;
                    let id = repo.blob(&stub_bytes)?;
                    cleaned.insert(entry.id, id);
                    id
                }
            };
            // clean() is idempotent, so an entry that was already a stub
            // maps to itself
            if new_id == entry.id {
                continue;
            }
            debug!(path = %path, "converting index entry to stub");
            entry.id = new_id;
            entry.file_size = magiclen() as u32;
            index.add(&entry)?;
            converted.push(path);
        }

        if add_attributes && !converted.is_empty() {
            converted.sort();
            update_attributes_entry(repo, &mut index, &converted)?;
        }
        index.write()?;
        Ok(converted.len())
    }
}

/// Append `filter=fat -text` lines to the `.gitattributes` index entry,
/// creating the entry if the index has none.
fn update_attributes_entry(
    repo: &git2::Repository,
    index: &mut git2::Index,
    paths: &[String],
) -> GitResult<()> {
    let existing = index.get_path(Path::new(ATTRIBUTES_FILE), 0);
    let mut content = match &existing {
        Some(entry) => repo.find_blob(entry.id)?.content().to_vec(),
        None => Vec::new(),
    };
    if !content.is_empty() && !content.ends_with(b"\n") {
        content.push(b'\n');
    }
    for path in paths {
        content.extend_from_slice(format!("{} filter=fat -text\n", path).as_bytes());
    }

    let id = repo.blob(&content)?;
    let mut entry = existing.unwrap_or_else(|| git2::IndexEntry {
        ctime: git2::IndexTime::new(0, 0),
        mtime: git2::IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode: 0o100_644,
        uid: 0,
        gid: 0,
        file_size: 0,
        id,
        flags: 0,
        flags_extended: 0,
        path: ATTRIBUTES_FILE.as_bytes().to_vec(),
    });
    entry.id = id;
    entry.file_size = content.len() as u32;
    index.add(&entry)?;
    Ok(())
}

fn head_blob<'r>(repo: &'r git2::Repository, path: &Path) -> Option<git2::Blob<'r>> {
    let head = repo.head().ok()?.peel_to_tree().ok()?;
    let entry = head.get_path(path).ok()?;
    entry.to_object(repo).ok()?.into_blob().ok()
}

/// Fill one block from a reader, short only at EOF.
fn read_block<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut buf = vec![0u8; BLOCK_SIZE];
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

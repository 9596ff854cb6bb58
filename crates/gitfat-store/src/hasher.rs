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

//! Streaming SHA-1 hashing
//!
//! Consumes an input stream in fixed-size blocks, computing a running digest
//! and byte count while optionally forwarding the blocks to a sink. Payloads
//! are never buffered whole: tracked files can be arbitrarily large.

use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

/// Block size used for all streaming reads
pub const BLOCK_SIZE: usize = 4096;

/// Read `reader` to exhaustion in [`BLOCK_SIZE`] blocks, updating a running
/// SHA-1 and forwarding each block to `sink` if one is supplied.
///
/// Returns the lowercase hex digest and the total byte count.
pub fn copy_and_hash<R: Read, W: Write>(
    reader: &mut R,
    mut sink: Option<&mut W>,
) -> io::Result<(String, u64)> {
    let mut hasher = Sha1::new();
    let mut buf = [0u8; BLOCK_SIZE];
    let mut count = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        count += n as u64;
        if let Some(out) = sink.as_mut() {
            out.write_all(&buf[..n])?;
        }
    }

    if let Some(out) = sink.as_mut() {
        out.flush()?;
    }

    Ok((hex::encode(hasher.finalize()), count))
}

/// Hash a reader without forwarding it anywhere.
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<(String, u64)> {
    copy_and_hash(reader, None::<&mut io::Sink>)
}

/// Hash a file on disk, used to verify a downloaded object against the
/// digest it was requested under.
pub fn hash_file<P: AsRef<Path>>(path: P) -> io::Result<(String, u64)> {
    let mut file = File::open(path.as_ref())?;
    hash_reader(&mut file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        let payload = b"fat content a\n";
        let (digest, count) = hash_reader(&mut &payload[..]).unwrap();
        assert_eq!(digest, "6df0c57803617bba277e90c6fa01071fb6bfebb5");
        assert_eq!(count, 14);
    }

    #[test]
    fn test_empty_stream() {
        let (digest, count) = hash_reader(&mut io::empty()).unwrap();
        assert_eq!(digest, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_forwarding_preserves_bytes() {
        let payload = vec![0xABu8; 3 * BLOCK_SIZE + 17];
        let mut out = Vec::new();
        let (digest, count) = copy_and_hash(&mut payload.as_slice(), Some(&mut out)).unwrap();
        assert_eq!(out, payload);
        assert_eq!(count, payload.len() as u64);

        // Digest is independent of forwarding
        let (again, _) = hash_reader(&mut payload.as_slice()).unwrap();
        assert_eq!(digest, again);
    }

    #[test]
    fn test_determinism() {
        let payload = b"hello world\n";
        let (a, _) = hash_reader(&mut &payload[..]).unwrap();
        let (b, _) = hash_reader(&mut &payload[..]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "22596363b3de40b06f981fb85d82312e8c0ed511");
    }
}

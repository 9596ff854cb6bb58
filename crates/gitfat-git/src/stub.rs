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

//! Stub encoding and recognition
//!
//! A stub is the small placeholder committed in place of a fat file's
//! content:
//!
//! ```text
//! #$# git-fat <40-hex-digest> <size right-justified in 20 chars>\n
//! ```
//!
//! Recognition is fixed-length: a block is a stub iff its length equals one
//! of the two magic lengths AND it starts with the cookie. A cookie-prefixed
//! block of any other length is NOT a stub; decode fails closed rather than
//! guessing. The legacy format (cookie + digest + newline, no size) is
//! decoded for old histories but never written.

use std::sync::OnceLock;

/// The stub cookie, trailing space included
pub const COOKIE: &[u8] = b"#$# git-fat ";

const DIGEST_LEN: usize = 40;
const SIZE_FIELD_WIDTH: usize = 20;

/// A decoded stub: the digest of the real content and, for the current
/// format, its byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stub {
    pub digest: String,
    pub size: Option<u64>,
}

impl Stub {
    pub fn new(digest: impl Into<String>, size: u64) -> Self {
        Stub {
            digest: digest.into(),
            size: Some(size),
        }
    }

    /// Encode in the current format. Deterministic: equal digest and size
    /// always produce identical bytes of length [`magiclen`].
    pub fn encode(&self) -> Vec<u8> {
        encode_parts(&self.digest, self.size.unwrap_or(0))
    }

    /// Recognize and decode a block.
    ///
    /// Returns `None` for anything that is not byte-for-byte a stub: wrong
    /// length, wrong cookie, non-hex digest, or an unparsable size field.
    pub fn decode(block: &[u8]) -> Option<Stub> {
        if !block.starts_with(COOKIE) {
            return None;
        }

        if block.len() == magiclen() {
            let digest = parse_digest(&block[COOKIE.len()..COOKIE.len() + DIGEST_LEN])?;
            let rest = &block[COOKIE.len() + DIGEST_LEN..];
            if rest.first() != Some(&b' ') || rest.last() != Some(&b'\n') {
                return None;
            }
            let size_field = std::str::from_utf8(&rest[1..rest.len() - 1]).ok()?;
            let size: u64 = size_field.trim_start().parse().ok()?;
            Some(Stub {
                digest,
                size: Some(size),
            })
        } else if block.len() == legacy_magiclen() {
            let digest = parse_digest(&block[COOKIE.len()..COOKIE.len() + DIGEST_LEN])?;
            if block.last() != Some(&b'\n') {
                return None;
            }
            Some(Stub { digest, size: None })
        } else {
            None
        }
    }
}

fn encode_parts(digest: &str, size: u64) -> Vec<u8> {
    format!(
        "{}{} {:>width$}\n",
        String::from_utf8_lossy(COOKIE),
        digest,
        size,
        width = SIZE_FIELD_WIDTH
    )
    .into_bytes()
}

fn parse_digest(bytes: &[u8]) -> Option<String> {
    let digest = std::str::from_utf8(bytes).ok()?;
    if digest.len() == DIGEST_LEN
        && digest
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    {
        Some(digest.to_string())
    } else {
        None
    }
}

/// Exact byte length of a current-format stub.
///
/// Measured from an encoded dummy, never hard-coded, so a digest-width
/// change cannot leave a stale constant behind.
pub fn magiclen() -> usize {
    static LEN: OnceLock<usize> = OnceLock::new();
    *LEN.get_or_init(|| encode_parts(&"0".repeat(DIGEST_LEN), 5).len())
}

/// Exact byte length of a legacy-format stub (no size field).
pub fn legacy_magiclen() -> usize {
    static LEN: OnceLock<usize> = OnceLock::new();
    *LEN.get_or_init(|| COOKIE.len() + DIGEST_LEN + 1)
}

/// Lengths a candidate blob may have; anything else cannot be a stub.
pub fn magic_lengths() -> [usize; 2] {
    [magiclen(), legacy_magiclen()]
}

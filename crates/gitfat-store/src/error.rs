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

//! Store error types and utilities

use std::io;
use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during cache or backend operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Object not found in the cache or on the remote
    #[error("object not found: {0}")]
    NotFound(String),

    /// A downloaded object's recomputed digest disagrees with its key
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Sync backend not available or misconfigured
    #[error("sync backend error: {0}")]
    Backend(String),

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    /// Create a NotFound error with the given key
    pub fn not_found<S: Into<String>>(key: S) -> Self {
        StoreError::NotFound(key.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StoreError::Backend(msg.into())
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = StoreError::not_found("6df0c578");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "object not found: 6df0c578");
    }

    #[test]
    fn test_digest_mismatch_display() {
        let err = StoreError::DigestMismatch {
            expected: "aaaa".into(),
            actual: "bbbb".into(),
        };
        assert_eq!(err.to_string(), "digest mismatch: expected aaaa, got bbbb");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::other("read failed");
        let store_err = StoreError::from(io_err);
        assert!(matches!(store_err, StoreError::Io(_)));
    }
}

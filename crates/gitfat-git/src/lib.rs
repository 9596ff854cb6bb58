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

//! Git-facing layer for git-fat
//!
//! - [`stub`] - the placeholder format committed instead of fat content
//! - [`filter`] - the clean/smudge stream transforms git drives
//! - [`scan`] - history and working-tree scanning, placeholder restore

pub mod error;
pub mod filter;
pub mod scan;
pub mod stub;

pub use error::{GitError, GitResult};
pub use filter::FilterEngine;
pub use scan::{FatObject, HistoryScanner, LargeBlob, ScanRange};
pub use stub::{legacy_magiclen, magic_lengths, magiclen, Stub, COOKIE};

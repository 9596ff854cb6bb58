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

//! Core orchestration for git-fat
//!
//! - [`repo`] - the [`FatRepo`] entry point every operation goes through
//! - [`reconcile`] - the set algebra behind push, pull and status
//! - [`backend`] - `.gitfat` section → concrete sync backend

pub mod backend;
pub mod error;
pub mod reconcile;
pub mod repo;

pub use backend::select_backend;
pub use error::{FatError, FatResult};
pub use reconcile::{StatusReport, SyncReport};
pub use repo::FatRepo;

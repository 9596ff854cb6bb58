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

use anyhow::Result;
use clap::Parser;
use gitfat_core::FatRepo;
use std::path::PathBuf;

/// Rewrite listed index entries to stubs, for use as
/// `git filter-branch --index-filter 'git fat index-filter FILELIST'`
#[derive(Parser, Debug)]
pub struct IndexFilterCmd {
    /// File listing repository paths to convert, one per line
    #[arg(value_name = "FILELIST")]
    pub filelist: PathBuf,

    /// Do not add filter entries to .gitattributes
    #[arg(short = 'x', long = "no-attributes")]
    pub no_attributes: bool,
}

impl IndexFilterCmd {
    pub fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;
        // Runs once per rewritten commit, so stdout stays quiet
        repo.index_filter(&self.filelist, !self.no_attributes)?;
        Ok(())
    }
}

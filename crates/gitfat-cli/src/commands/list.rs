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

/// List every managed file as `digest path`
#[derive(Parser, Debug)]
pub struct ListCmd {
    /// Consider every commit reachable from any ref, not just HEAD
    #[arg(short = 'a', long = "all")]
    pub all: bool,
}

impl ListCmd {
    pub fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;
        for object in repo.list(self.all)? {
            println!("{} {}", object.digest, object.path.display());
        }
        Ok(())
    }
}

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

/// Find blobs over a size threshold anywhere in history
#[derive(Parser, Debug)]
pub struct FindCmd {
    /// Minimum blob size in bytes
    #[arg(value_name = "SIZE")]
    pub size: u64,
}

impl FindCmd {
    pub fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;
        for blob in repo.find(self.size)? {
            println!("{} {} {}", blob.blob_id, blob.size, blob.path.display());
        }
        Ok(())
    }
}

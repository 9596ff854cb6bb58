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

use crate::output;
use anyhow::Result;
use clap::Parser;
use gitfat_core::FatRepo;

/// Compare referenced objects against the local cache
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Consider every commit reachable from any ref, not just HEAD
    #[arg(short = 'a', long = "all")]
    pub all: bool,
}

impl StatusCmd {
    pub fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;
        let report = repo.status(self.all)?;

        if report.orphans.is_empty() && report.stale.is_empty() {
            output::success("Cache is in sync");
            return Ok(());
        }
        if !report.orphans.is_empty() {
            println!("Orphan objects (referenced, not cached):");
            for digest in &report.orphans {
                println!("    {digest}");
            }
        }
        if !report.stale.is_empty() {
            println!("Stale objects (cached, not referenced):");
            for digest in &report.stale {
                println!("    {digest}");
            }
        }
        Ok(())
    }
}

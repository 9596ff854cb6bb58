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
use gitfat_core::{FatError, FatRepo};

/// Upload cached objects referenced by this repository
#[derive(Parser, Debug)]
pub struct PushCmd {
    /// Consider every commit reachable from any ref, not just HEAD
    #[arg(short = 'a', long = "all")]
    pub all: bool,
}

impl PushCmd {
    pub async fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;

        let pb = output::spinner("Pushing objects...");
        let report = repo.push(self.all).await?;
        pb.finish_and_clear();

        if report.attempted == 0 {
            output::success("Nothing to push");
            return Ok(());
        }
        output::success(&format!(
            "Pushed {} of {} objects",
            report.transferred, report.attempted
        ));
        for (digest, reason) in &report.failed {
            output::warning(&format!("{digest}: {reason}"));
        }
        if !report.is_complete() {
            return Err(FatError::SyncIncomplete {
                failed: report.failed.len(),
                attempted: report.attempted,
            }
            .into());
        }
        Ok(())
    }
}

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

/// Download missing objects and restore working-tree placeholders
#[derive(Parser, Debug)]
pub struct PullCmd {
    /// Consider every commit reachable from any ref, not just HEAD
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Only pull placeholders matching these glob patterns
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,
}

impl PullCmd {
    pub async fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;

        let pb = output::spinner("Pulling objects...");
        let report = repo.pull(&self.paths, self.all).await?;
        pb.finish_and_clear();

        if report.attempted == 0 {
            output::success("Nothing to pull");
            return Ok(());
        }
        output::success(&format!(
            "Pulled {} of {} objects",
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

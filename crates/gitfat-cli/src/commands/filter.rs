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

//! Filter driver entry points
//!
//! Git runs these with the file content on stdin and expects the filtered
//! content on stdout, nothing else. All diagnostics go to stderr.

use anyhow::Result;
use clap::Parser;
use gitfat_core::FatRepo;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

/// Clean filter: fat content on stdin, stub on stdout
#[derive(Parser, Debug)]
pub struct FilterCleanCmd {
    /// Path of the file being filtered (git's %f), used for the
    /// conversion guard
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl FilterCleanCmd {
    pub fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut input = BufReader::new(stdin.lock());
        let mut output = BufWriter::new(stdout.lock());
        repo.filter_clean(self.file.as_deref(), &mut input, &mut output)?;
        output.flush()?;
        Ok(())
    }
}

/// Smudge filter: stub on stdin, fat content on stdout
#[derive(Parser, Debug)]
pub struct FilterSmudgeCmd {
    /// Path of the file being filtered (git's %f), informational only
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl FilterSmudgeCmd {
    pub fn execute(&self) -> Result<()> {
        let repo = FatRepo::discover(".")?;
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut input = BufReader::new(stdin.lock());
        let mut output = BufWriter::new(stdout.lock());
        repo.filter_smudge(&mut input, &mut output)?;
        output.flush()?;
        Ok(())
    }
}

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

mod commands;
mod output;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use commands::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "git-fat")]
#[command(version, about = "Large file support for git")]
#[command(
    long_about = "git-fat keeps large file content out of your git history.
Committed files hold a small stub; the real content lives in a local object
cache synchronized with a shared remote over rsync, http, s3 or a plain
directory."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the fat filter in this repository
    Init(InitCmd),

    /// Upload cached objects referenced by this repository
    Push(PushCmd),

    /// Download missing objects and restore placeholders
    Pull(PullCmd),

    /// Restore placeholders whose objects are cached
    Checkout(CheckoutCmd),

    /// Compare referenced objects against the local cache
    Status(StatusCmd),

    /// List every managed file as `digest path`
    List(ListCmd),

    /// Find blobs over a size threshold anywhere in history
    Find(FindCmd),

    /// Rewrite listed index entries to stubs (for git filter-branch)
    #[command(name = "index-filter")]
    IndexFilter(IndexFilterCmd),

    /// Clean filter (driven by git, stdin/stdout)
    #[command(name = "filter-clean")]
    FilterClean(FilterCleanCmd),

    /// Smudge filter (driven by git, stdin/stdout)
    #[command(name = "filter-smudge")]
    FilterSmudge(FilterSmudgeCmd),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so filter stdout stays a pure byte stream
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Init(cmd) => cmd.execute(),
        Commands::Push(cmd) => cmd.execute().await,
        Commands::Pull(cmd) => cmd.execute().await,
        Commands::Checkout(cmd) => cmd.execute(),
        Commands::Status(cmd) => cmd.execute(),
        Commands::List(cmd) => cmd.execute(),
        Commands::Find(cmd) => cmd.execute(),
        Commands::IndexFilter(cmd) => cmd.execute(),
        Commands::FilterClean(cmd) => cmd.execute(),
        Commands::FilterSmudge(cmd) => cmd.execute(),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "git-fat", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
    Ok(())
}

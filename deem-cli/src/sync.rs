//! `deem <archive>` — reconcile the archive against the desired stream.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use deem_sync::{pipeline, ArTool, ArchiveState, SyncOptions};

/// Arguments for a sync run.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Archive to synchronize (created when missing).
    pub archive: PathBuf,

    /// Suppress stats, new archive, and test-mode notices.
    #[arg(short, long)]
    pub quiet: bool,

    /// Test for changes but do not touch the archive.
    #[arg(short, long)]
    pub test: bool,

    /// Read `key value` pairs from this file rather than from stdin.
    #[arg(short, long, value_name = "FILENAME")]
    pub input: Option<PathBuf>,

    /// Print the counts as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Archive program to invoke.
    #[arg(long, env = "DEEM_AR", default_value = "ar", value_name = "PROGRAM")]
    pub ar: String,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let archive = ArTool::locate(&self.ar, &self.archive)
            .with_context(|| format!("cannot use archive program '{}'", self.ar))?;
        let options = SyncOptions::for_archive(&self.archive, self.test);

        let plan = match &self.input {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("error opening input file {}", path.display()))?;
                pipeline::plan(&archive, BufReader::new(file), &options)
            }
            None => pipeline::plan(&archive, io::stdin().lock(), &options),
        }
        .with_context(|| format!("sync failed for '{}'", self.archive.display()))?;

        if !self.quiet {
            if plan.archive_state == ArchiveState::Missing {
                eprintln!("Creating a new archive");
            }
            eprintln!("{}", plan.counts);
            if self.test {
                eprintln!("Test mode - nothing done.");
            }
        }
        if self.json {
            println!("{}", serde_json::to_string(&plan.counts)?);
        }

        if let Some(report) = plan.commit(&archive) {
            log::debug!(
                "commit ran {:?} with {} failure(s)",
                report.attempted,
                report.failures.len()
            );
        }
        Ok(())
    }
}

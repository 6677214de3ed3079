//! deem — converge a key/value `ar` archive to a list of `key value` lines.
//!
//! # Usage
//!
//! ```text
//! deem [--quiet] [--test] [--input <file>] <archive>
//! printf 'a 1\nb 2\n' | deem store.a
//! ```

mod sync;

use anyhow::Result;
use clap::Parser;

use sync::SyncArgs;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "deem",
    version,
    about = "Key-value ar archive: sync an archive to a stream of `key value` pairs",
    long_about = None,
    after_help = "Exit status 0 if okay or minor problems, 1 otherwise.",
)]
struct Cli {
    #[command(flatten)]
    sync: SyncArgs,

    /// Log every classification and archive tool invocation.
    #[arg(short, long)]
    verbose: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // --help/--version print to stdout and succeed; usage errors fail.
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_logging(cli.verbose);
    cli.sync.run()
}

/// Warnings always reach stderr; `RUST_LOG` overrides the level.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

//! Build automation tasks for simpleperf
//!
//! Run with: cargo xtask <command>

use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "simpleperf build automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all tests
    Test,

    /// Run clippy lints
    Lint,

    /// Check formatting
    Fmt,

    /// Run all CI checks
    Ci,

    /// Run the transfer benchmarks
    Bench,

    /// Generate documentation
    Doc,
}

const TEST_ARGS: &[&str] = &["test", "--workspace"];
const CLIPPY_ARGS: &[&str] = &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"];
const FMT_ARGS: &[&str] = &["fmt", "--all", "--check"];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test => run_command("cargo", TEST_ARGS)?,
        Commands::Lint => run_command("cargo", CLIPPY_ARGS)?,
        Commands::Fmt => run_command("cargo", FMT_ARGS)?,
        Commands::Ci => {
            println!("Running CI checks...");
            run_command("cargo", FMT_ARGS)?;
            run_command("cargo", CLIPPY_ARGS)?;
            run_command("cargo", TEST_ARGS)?;
            println!("All CI checks passed!");
        }
        Commands::Bench => {
            run_command(
                "cargo",
                &["bench", "-p", "simpleperf-integration-tests", "--bench", "transfer"],
            )?;
        }
        Commands::Doc => {
            run_command("cargo", &["doc", "--workspace", "--no-deps", "--open"])?;
        }
    }

    Ok(())
}

fn run_command(program: &str, args: &[&str]) -> anyhow::Result<()> {
    let status = Command::new(program).args(args).status()?;

    if !status.success() {
        anyhow::bail!("{} {:?} failed", program, args);
    }

    Ok(())
}

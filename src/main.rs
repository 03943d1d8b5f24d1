use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use leap::commands::{
    CheckCommand, FilterCommand, GrabCommand, MatchCommand, PrepCommand, RewriteCommand,
    SelectCommand, SplitCommand,
};
use leap::logging::init_logger;

/// LEAP: extend transcript 5'/3' ends in a reference annotation using
/// capOrTail peak clusters corroborated by transcript evidence
#[derive(Parser)]
#[command(name = "leap")]
#[command(about = "Evidence-driven transcript end extension")]
#[command(version)]
struct Cli {
    /// Verbose output (shows debug info)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Log file path (receives all messages)
    #[arg(long = "logfile", value_name = "FILE", global = true)]
    logfile: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter protein-coding gene blocks
    Filter(FilterCommand),
    /// Split inputs by chromosome
    Split(SplitCommand),
    /// Grab per-gene terminal exons
    Grab(GrabCommand),
    /// Match terminal exons against evidence blocks
    #[command(name = "match")]
    Match(MatchCommand),
    /// Find corroborated capOrTail peaks
    Check(CheckCommand),
    /// Select the best extension per transcript
    Select(SelectCommand),
    /// Prepare the next round's terminal exons
    Prep(PrepCommand),
    /// Rewrite the annotation to the extended boundaries
    Rewrite(RewriteCommand),
}

fn main() {
    // usage errors exit 1; help and version exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logger(cli.verbose, cli.logfile.as_deref())?;
    info!("Starting leap v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Filter(cmd) => cmd.run(),
        Commands::Split(cmd) => cmd.run(),
        Commands::Grab(cmd) => cmd.run(),
        Commands::Match(cmd) => cmd.run(),
        Commands::Check(cmd) => cmd.run(),
        Commands::Select(cmd) => cmd.run(),
        Commands::Prep(cmd) => cmd.run(),
        Commands::Rewrite(cmd) => cmd.run(),
    }
}

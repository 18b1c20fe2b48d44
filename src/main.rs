mod cli;

use clap::{Parser, Subcommand};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity of the program:
    /// -v for info, -vv for debug, and -vvv for trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place all sensors of the detector and write the sensor table
    Layout(cli::layout::Args),
    /// Write the geometry parameter table
    Params(cli::params::Args),
    /// Aggregate recorded hits and deposit steps into per-event tables
    Replay(cli::replay::Args),
}

fn main() {
    let args = Cli::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match &args.command {
        Commands::Layout(args) => cli::layout::run(args),
        Commands::Params(args) => cli::params::run(args),
        Commands::Replay(args) => cli::replay::run(args),
    }
}

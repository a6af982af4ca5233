mod commands;
mod common;
mod logging;
mod pool;

use clap::Parser;
use commands::Commands;

pub use common::DatabaseArgs;
pub use logging::LogArgs;

/// `pwcrack`
#[derive(clap::Parser, Debug)]
pub struct Args {
    /// Subcommand to run.
    #[clap(subcommand)]
    pub command: Commands,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    args.command.run()
}

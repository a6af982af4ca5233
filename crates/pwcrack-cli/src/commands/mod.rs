use crate::commands::{guess::GuessArgs, train::TrainArgs};

pub mod guess;
pub mod train;

/// Subcommands for `pwcrack`.
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Train a PCFG + OMEN grammar from a corpus of leaked passwords.
    Train(TrainArgs),

    /// Enumerate candidate plaintexts against a file of target hashes.
    Guess(GuessArgs),
}

impl Commands {
    /// Run the subcommand.
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Commands::Train(cmd) => cmd.run(),
            Commands::Guess(cmd) => cmd.run(),
        }
    }
}

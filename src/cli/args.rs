//! Command-line argument parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "image-label-inspect")]
#[command(about = "Inspect container image metadata in a registry")]
#[command(version)]
pub struct Args {
    /// Verbose output
    #[arg(
        long = "verbose",
        short = 'v',
        global = true,
        help = "Print debug diagnostics to stderr"
    )]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect an image and print its version label
    Inspect {
        /// Image reference, e.g. docker.io/scylladb/scylla:5.2.0
        ///
        /// Collected as a list so that a wrong argument count is reported by
        /// the command itself rather than by the parser.
        #[arg(value_name = "imageReference", num_args = 0..)]
        image_references: Vec<String>,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

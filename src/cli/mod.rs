//! Command line interface module
//!
//! Argument parsing and the runner that executes the `inspect` command.

pub mod args;
pub mod runner;

pub use args::{Args, Command};
pub use runner::{InspectRequest, Runner, VERSION_LABEL};

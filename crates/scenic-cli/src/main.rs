//! # scenic CLI
//!
//! Command-line interface for Scenic reverse image search.
//!
//! This binary provides human-friendly access to `scenic-core` functionality.
//! Run `scenic --help` for usage information.

mod cli;
pub mod ui;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}

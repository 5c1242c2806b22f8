//! Shared test utilities for scenic-cli integration tests.

use assert_cmd::Command;

/// Get a Command for the scenic binary.
///
/// # Panics
///
/// Panics if the scenic binary cannot be found. This should not happen
/// in a properly configured test environment.
#[allow(deprecated)]
pub fn scenic_cmd() -> Command {
    Command::cargo_bin("scenic").expect("scenic binary should exist")
}

//! Command implementations behind the `axiom-std` binary.
//!
//! Each command returns a value that the binary prints as a single JSON line
//! on stdout; logs go to stderr.

pub mod commands;
pub mod error;

pub use error::{CliError, Result};

//! wsctl CLI - command-line frontend
//!
//! This library backs the `wsctl` binary: configuration resolution
//! (flags over environment over config file), plain-text rendering, and
//! one function per subcommand on top of the controller crate.

pub mod commands;
pub mod config;
pub mod output;

pub use config::Config;

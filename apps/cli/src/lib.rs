//! Vidbrief application layer: command-line arguments, the HTTP API and
//! terminal output.

pub mod args;
pub mod format;
pub mod server;

//! runw: launch preconfigured bubblewrap containers.
//!
//! The binary is a thin shell over this library:
//! - `cli/` - argument parsing, command overrides and dispatch
//! - `logging` - tracing subscriber setup

pub mod cli;
pub mod logging;

pub use cli::{Cli, run};

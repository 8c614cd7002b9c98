//! Argument parsing and dispatch.
//!
//! - `args` - command-line surface
//! - `handlers` - listing, command overrides and the launch pipeline

pub mod args;
pub mod handlers;

pub use args::Cli;
pub use handlers::{apply_overrides, launch_env, list_profiles, login_shell, run};

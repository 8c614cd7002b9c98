//! runw configuration: fragments, loading and preset resolution.
//!
//! A profile (from `runw.toml`) names the presets it builds on (from
//! `presets.toml`) through its `use` list. [`resolve`] merges the profile with
//! its presets and the base fragment into a [`ResolvedConfig`], which the
//! sandbox crate compiles into bubblewrap directives.

pub mod base;
pub mod dirs;
pub mod error;
pub mod fragment;
pub mod loader;
pub mod resolve;

#[cfg(test)]
mod tests;

pub use base::{BASE_PRESET, builtin_base};
pub use dirs::RunwDirs;
pub use error::{ConfigError, Result};
pub use fragment::{AccessMode, BindSpec, Fragment, Namespace, Symlink};
pub use loader::{find_profile, load_presets, load_profiles, parse_table};
pub use resolve::{Catalog, ResolvedConfig, resolve};

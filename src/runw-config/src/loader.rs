//! Loading of preset and profile tables.
//!
//! Both files are TOML tables keyed by name whose values are fragments. A
//! missing file is an empty table.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::fragment::Fragment;
use crate::resolve::Catalog;

/// Load the preset catalog from `path`.
pub fn load_presets(path: &Path) -> Result<Catalog> {
    load_table(path)
}

/// Load launchable profiles from `path`. Profile names are lowercased.
pub fn load_profiles(path: &Path) -> Result<Catalog> {
    Ok(load_table(path)?
        .into_iter()
        .map(|(name, fragment)| (name.to_lowercase(), fragment))
        .collect())
}

/// Parse a table of fragments from TOML source.
pub fn parse_table(content: &str) -> std::result::Result<Catalog, toml::de::Error> {
    toml::from_str(content)
}

/// Look up a profile by name, ignoring case.
pub fn find_profile<'a>(profiles: &'a Catalog, name: &str) -> Result<&'a Fragment> {
    profiles
        .get(&name.to_lowercase())
        .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
}

fn load_table(path: &Path) -> Result<Catalog> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, using empty table");
            return Ok(Catalog::new());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let table = parse_table(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), entries = table.len(), "loaded config file");
    Ok(table)
}

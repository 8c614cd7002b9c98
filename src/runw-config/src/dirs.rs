//! Directory discovery for runw.
//!
//! Follows the XDG base directory conventions:
//! - config: `$RUNW_CONFIG_DIR`, else `$XDG_CONFIG_HOME/runw`, else `~/.config/runw`
//! - runtime: `$XDG_RUNTIME_DIR`, else `/tmp`

use std::path::PathBuf;

/// Application name for directory paths
pub const APP_NAME: &str = "runw";

/// Preset catalog file name.
pub const PRESETS_FILE: &str = "presets.toml";

/// Profile file name.
pub const PROFILES_FILE: &str = "runw.toml";

/// Environment variable overriding the config directory.
pub const RUNW_CONFIG_DIR_ENV: &str = "RUNW_CONFIG_DIR";

/// Directories used by a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunwDirs {
    /// The invoking user's home directory.
    pub home: PathBuf,
    /// Directory holding `presets.toml` and `runw.toml`.
    pub config_dir: PathBuf,
    /// Per-user runtime directory (sockets, pipes).
    pub runtime_dir: PathBuf,
}

impl RunwDirs {
    /// Discover directories from the process environment.
    pub fn from_env() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self::from_lookup(home, |name| std::env::var(name).ok())
    }

    /// Discover directories using `lookup` in place of the process environment.
    pub fn from_lookup(home: PathBuf, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);

        let config_dir = var(RUNW_CONFIG_DIR_ENV).unwrap_or_else(|| {
            var("XDG_CONFIG_HOME")
                .unwrap_or_else(|| home.join(".config"))
                .join(APP_NAME)
        });
        let runtime_dir = var("XDG_RUNTIME_DIR").unwrap_or_else(|| PathBuf::from("/tmp"));

        Self {
            home,
            config_dir,
            runtime_dir,
        }
    }

    pub fn presets_file(&self) -> PathBuf {
        self.config_dir.join(PRESETS_FILE)
    }

    pub fn profiles_file(&self) -> PathBuf {
        self.config_dir.join(PROFILES_FILE)
    }

    /// Directory holding D-Bus proxy sockets.
    pub fn bus_proxy_dir(&self) -> PathBuf {
        self.runtime_dir.join("bus-proxy")
    }
}

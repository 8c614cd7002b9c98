//! Fragment data model.
//!
//! A fragment is one named table of the preset or profile files. Every field
//! is optional in TOML; absent sequences, sets and maps deserialize empty and
//! absent scalars deserialize to `None` so merging can tell "unset" apart from
//! an explicit value.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// Access mode of a bind mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
    Device,
}

impl FromStr for AccessMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" | "read-only" => Ok(Self::ReadOnly),
            "rw" | "read-write" => Ok(Self::ReadWrite),
            "dev" | "device" => Ok(Self::Device),
            other => Err(ConfigError::InvalidBindSpec(format!(
                "unknown mode '{other}' (expected ro, rw or dev)"
            ))),
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly => write!(f, "ro"),
            Self::ReadWrite => write!(f, "rw"),
            Self::Device => write!(f, "dev"),
        }
    }
}

/// Namespaces the sandbox binary can unshare.
///
/// Declaration order is the emission order of unshare directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    User,
    Ipc,
    Pid,
    Uts,
    Cgroup,
    Net,
}

impl Namespace {
    /// Every namespace, isolated unless shared.
    pub const ALL: [Namespace; 6] = [
        Namespace::User,
        Namespace::Ipc,
        Namespace::Pid,
        Namespace::Uts,
        Namespace::Cgroup,
        Namespace::Net,
    ];
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Ipc => "ipc",
            Self::Pid => "pid",
            Self::Uts => "uts",
            Self::Cgroup => "cgroup",
            Self::Net => "net",
        };
        f.write_str(name)
    }
}

/// One filesystem exposure.
///
/// In TOML a bind is either a bare path string or a table with exactly one of
/// `src`, `glob` or `tmpfs`:
///
/// ```toml
/// binds = [
///     "/usr/share/fonts",
///     { src = "$HOME/Games", dest = "/games", mode = "ro" },
///     { src = "$XDG_DATA_HOME/app", create = true },
///     { glob = "$XDG_RUNTIME_DIR/pipewire*" },
///     { tmpfs = "/var/cache" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawBindSpec")]
pub enum BindSpec {
    /// Bind a path onto itself.
    Path(String),
    /// Bind `src` onto `dest` (or onto itself).
    Mapped {
        src: String,
        dest: Option<String>,
        mode: Option<AccessMode>,
        create: bool,
    },
    /// Bind every host path matching `pattern` onto itself.
    ///
    /// Matching follows shell rules: wildcards skip dot-entries and `**` is
    /// not recursive (it behaves like `*`).
    Glob {
        pattern: String,
        mode: Option<AccessMode>,
    },
    /// Mount a fresh tmpfs at `path`.
    Tmpfs { path: String },
}

impl BindSpec {
    /// Shorthand for a mapped bind.
    pub fn mapped(src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::Mapped {
            src: src.into(),
            dest: Some(dest.into()),
            mode: None,
            create: false,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBindSpec {
    Path(String),
    Table(RawBindTable),
}

#[derive(Deserialize)]
struct RawBindTable {
    src: Option<String>,
    dest: Option<String>,
    mode: Option<String>,
    create: Option<bool>,
    glob: Option<String>,
    tmpfs: Option<String>,
    #[serde(flatten)]
    unknown: BTreeMap<String, toml::Value>,
}

impl TryFrom<RawBindSpec> for BindSpec {
    type Error = ConfigError;

    fn try_from(raw: RawBindSpec) -> Result<Self, Self::Error> {
        let table = match raw {
            RawBindSpec::Path(path) => return Ok(Self::Path(path)),
            RawBindSpec::Table(table) => table,
        };

        if let Some(key) = table.unknown.keys().next() {
            return Err(ConfigError::InvalidBindSpec(format!("unknown field '{key}'")));
        }
        let mode = table.mode.as_deref().map(str::parse).transpose()?;

        match (table.src, table.glob, table.tmpfs) {
            (Some(src), None, None) => Ok(Self::Mapped {
                src,
                dest: table.dest,
                mode,
                create: table.create.unwrap_or(false),
            }),
            (None, Some(pattern), None) => {
                if table.dest.is_some() || table.create.is_some() {
                    return Err(ConfigError::InvalidBindSpec(format!(
                        "glob bind '{pattern}' only accepts 'mode'"
                    )));
                }
                Ok(Self::Glob { pattern, mode })
            }
            (None, None, Some(path)) => {
                if table.dest.is_some() || table.create.is_some() || mode.is_some() {
                    return Err(ConfigError::InvalidBindSpec(format!(
                        "tmpfs bind '{path}' takes no other fields"
                    )));
                }
                Ok(Self::Tmpfs { path })
            }
            (None, None, None) => Err(ConfigError::InvalidBindSpec(
                "expected one of 'src', 'glob' or 'tmpfs'".to_string(),
            )),
            _ => Err(ConfigError::InvalidBindSpec(
                "'src', 'glob' and 'tmpfs' are mutually exclusive".to_string(),
            )),
        }
    }
}

/// A symbolic link created inside the sandbox, written as `[target, link]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct Symlink {
    pub target: String,
    pub link: String,
}

impl From<(String, String)> for Symlink {
    fn from((target, link): (String, String)) -> Self {
        Self { target, link }
    }
}

impl Symlink {
    pub fn new(target: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            link: link.into(),
        }
    }
}

/// A named, partially specified configuration unit.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fragment {
    /// Presets this fragment depends on, merged before it.
    #[serde(default, rename = "use")]
    pub uses: Vec<String>,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub binds: Vec<BindSpec>,
    #[serde(default)]
    pub device_binds: Vec<BindSpec>,
    #[serde(default)]
    pub symlinks: Vec<Symlink>,
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub session_bus_filter: Vec<String>,
    #[serde(default)]
    pub system_bus_filter: Vec<String>,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub unset_environment: BTreeSet<String>,
    /// Namespaces shared with the host instead of isolated.
    #[serde(default)]
    pub shared_namespaces: BTreeSet<Namespace>,
    /// Raw tokens passed through to the sandbox binary.
    #[serde(default)]
    pub sandbox_args: Vec<String>,
    pub kill_with_parent: Option<bool>,
    pub home: Option<String>,
    pub working_directory: Option<String>,
    pub root_filesystem: Option<String>,
    pub description: Option<String>,
    pub suppress_default: Option<bool>,
}

//! Preset resolution.
//!
//! Merges a profile, its transitive `use` dependencies and the base fragment
//! into one [`ResolvedConfig`]. Dependencies are merged in depth-first
//! postorder, left to right, each preset exactly once. The profile itself is
//! merged last and therefore has the final say.
//!
//! Merge policy:
//! - sequences concatenate (earlier fragments first)
//! - sets union
//! - `environment` overwrites per key
//! - scalars take the last value that is present

use std::collections::{BTreeMap, BTreeSet, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::base::{BASE_PRESET, builtin_base};
use crate::error::{ConfigError, Result};
use crate::fragment::{BindSpec, Fragment, Namespace, Symlink};

/// Named fragments, keyed by preset name.
pub type Catalog = BTreeMap<String, Fragment>;

/// Label used in errors for references made by the profile being resolved.
const ROOT_LABEL: &str = "<profile>";

/// A fully merged configuration with every `use` consumed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub command: Vec<String>,
    pub binds: Vec<BindSpec>,
    pub device_binds: Vec<BindSpec>,
    pub symlinks: Vec<Symlink>,
    pub directories: Vec<String>,
    pub session_bus_filter: Vec<String>,
    pub system_bus_filter: Vec<String>,
    pub environment: IndexMap<String, String>,
    pub unset_environment: BTreeSet<String>,
    pub shared_namespaces: BTreeSet<Namespace>,
    pub sandbox_args: Vec<String>,
    pub kill_with_parent: Option<bool>,
    pub home: Option<String>,
    pub working_directory: Option<String>,
    pub root_filesystem: Option<String>,
    pub description: Option<String>,
    pub suppress_default: Option<bool>,
}

impl ResolvedConfig {
    /// Merge `fragment` on top of the current state. Its `use` list is ignored.
    pub fn merge(&mut self, fragment: &Fragment) {
        self.command.extend_from_slice(&fragment.command);
        self.binds.extend_from_slice(&fragment.binds);
        self.device_binds.extend_from_slice(&fragment.device_binds);
        self.symlinks.extend_from_slice(&fragment.symlinks);
        self.directories.extend_from_slice(&fragment.directories);
        self.session_bus_filter
            .extend_from_slice(&fragment.session_bus_filter);
        self.system_bus_filter
            .extend_from_slice(&fragment.system_bus_filter);
        self.sandbox_args.extend_from_slice(&fragment.sandbox_args);

        self.environment.extend(
            fragment
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self.unset_environment
            .extend(fragment.unset_environment.iter().cloned());
        self.shared_namespaces
            .extend(fragment.shared_namespaces.iter().copied());

        overlay(&mut self.kill_with_parent, &fragment.kill_with_parent);
        overlay(&mut self.home, &fragment.home);
        overlay(&mut self.working_directory, &fragment.working_directory);
        overlay(&mut self.root_filesystem, &fragment.root_filesystem);
        overlay(&mut self.description, &fragment.description);
        overlay(&mut self.suppress_default, &fragment.suppress_default);
    }

    /// Whether a D-Bus proxy is needed.
    pub fn wants_bus_proxy(&self) -> bool {
        !self.session_bus_filter.is_empty() || !self.system_bus_filter.is_empty()
    }
}

fn overlay<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        slot.clone_from(value);
    }
}

/// Resolve `root` against `catalog`.
///
/// This is a pure function over its inputs. Every referenced preset is looked
/// up before anything is merged, so an unknown or cyclic reference fails
/// without producing a partial configuration.
pub fn resolve(root: &Fragment, catalog: &Catalog) -> Result<ResolvedConfig> {
    let mut walk = Walk::new(catalog);
    let mut builtin = None;

    if !root.suppress_default.unwrap_or(false) {
        if catalog.contains_key(BASE_PRESET) {
            walk.visit(BASE_PRESET, ROOT_LABEL)?;
        } else {
            builtin = Some(builtin_base());
        }
    }
    for name in &root.uses {
        walk.visit(name, ROOT_LABEL)?;
    }

    debug!(
        order = ?walk.order.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        builtin_base = builtin.is_some(),
        "resolved preset order"
    );

    let mut resolved = ResolvedConfig::default();
    if let Some(base) = &builtin {
        resolved.merge(base);
    }
    for (_, fragment) in &walk.order {
        resolved.merge(fragment);
    }
    resolved.merge(root);
    Ok(resolved)
}

/// Iterative depth-first postorder walk over `use` edges.
struct Walk<'a> {
    catalog: &'a Catalog,
    done: HashSet<&'a str>,
    order: Vec<(&'a str, &'a Fragment)>,
}

impl<'a> Walk<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            done: HashSet::new(),
            order: Vec::new(),
        }
    }

    fn lookup(&self, name: &str, referenced_by: &str) -> Result<(&'a str, &'a Fragment)> {
        self.catalog
            .get_key_value(name)
            .map(|(key, fragment)| (key.as_str(), fragment))
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    fn visit(&mut self, name: &str, referenced_by: &str) -> Result<()> {
        if self.done.contains(name) {
            return Ok(());
        }
        let (name, fragment) = self.lookup(name, referenced_by)?;

        // Presets on the current path are in progress; meeting one again is a cycle.
        let mut path: Vec<(&'a str, &'a Fragment, usize)> = vec![(name, fragment, 0)];

        while let Some(top) = path.last_mut() {
            let (current, fragment) = (top.0, top.1);
            let Some(dep) = fragment.uses.get(top.2) else {
                path.pop();
                self.done.insert(current);
                self.order.push((current, fragment));
                continue;
            };
            top.2 += 1;

            if self.done.contains(dep.as_str()) {
                continue;
            }
            if let Some(start) = path.iter().position(|(n, _, _)| *n == dep.as_str()) {
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|(n, _, _)| n.to_string()).collect();
                cycle.push(dep.clone());
                return Err(ConfigError::CyclicPreset { cycle });
            }
            let (dep, dep_fragment) = self.lookup(dep, current)?;
            path.push((dep, dep_fragment, 0));
        }
        Ok(())
    }
}

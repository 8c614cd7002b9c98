//! Environment context threaded through compilation.
//!
//! Configuration values may reference variables as `$NAME` or `${NAME}`.
//! References are expanded against a snapshot of the launcher's environment
//! plus every variable applied so far, so `B = "${A}2"` sees an `A` applied
//! earlier in the same pass. Unknown references are left untouched.
//!
//! Applied variables are not written to the launcher's own environment; they
//! are handed to the proxy and to the final exec.

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

/// `$NAME` or `${NAME}`. Group 1: braced name, group 2: bare name.
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([^}]*)\}|([A-Za-z0-9_]+))").expect("variable regex pattern is valid")
});

/// Variables visible to expansion and the variables applied on top.
#[derive(Debug, Clone, Default)]
pub struct EnvContext {
    vars: HashMap<String, String>,
    applied: IndexMap<String, String>,
}

impl EnvContext {
    /// Snapshot the launcher's environment. Non UTF-8 entries cannot be
    /// referenced and are skipped; they still reach the sandbox unchanged.
    pub fn from_process() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            applied: IndexMap::new(),
        }
    }

    /// Make `name` expand to `value` when the environment leaves it unset or
    /// empty. Fallbacks are not passed on to launched processes.
    pub fn with_fallback(mut self, name: &str, value: impl Into<String>) -> Self {
        if self.vars.get(name).is_none_or(|v| v.is_empty()) {
            self.vars.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Set `name` for later expansions and for the launched processes.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let (name, value) = (name.into(), value.into());
        self.vars.insert(name.clone(), value.clone());
        self.applied.insert(name, value);
    }

    /// Variables set through [`EnvContext::set`], in application order.
    pub fn applied(&self) -> impl Iterator<Item = (&str, &str)> {
        self.applied.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand `$NAME` and `${NAME}` references in `input`.
    pub fn expand(&self, input: &str) -> String {
        if !input.contains('$') {
            return input.to_string();
        }
        VAR_REGEX
            .replace_all(input, |caps: &Captures<'_>| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                match self.vars.get(name) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

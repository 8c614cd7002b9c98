//! Directive compilation.
//!
//! Turns a [`ResolvedConfig`] into the ordered directive list and command
//! vector for the sandbox binary. The order is fixed:
//!
//! 1. root filesystem bind
//! 2. `/proc` and `/dev`
//! 3. persistent home
//! 4. namespaces
//! 5. die-with-parent
//! 6. environment, then unset requests
//! 7. device binds, then binds
//! 8. symlinks, directories and raw sandbox arguments
//! 9. D-Bus proxy sockets
//! 10. working directory
//! 11. command
//!
//! Host side effects (creating directories, starting the proxy) happen in
//! that order too, so an error stops everything after it.

use std::os::fd::OwnedFd;
use std::path::{Path, PathBuf};

use glob::MatchOptions;
use runw_config::{AccessMode, BindSpec, Namespace, ResolvedConfig};
use tracing::{debug, warn};

use crate::directive::{Directive, to_tokens};
use crate::env::EnvContext;
use crate::error::{Result, SandboxError};
use crate::proxy::BusProxy;

/// Wildcards never match a leading `.`, as in a shell.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Output of compilation, ready to be launched.
#[derive(Debug)]
pub struct CompiledSandbox {
    pub directives: Vec<Directive>,
    pub command: Vec<String>,
    pub env: EnvContext,
    /// Descriptors referenced by directives; they must outlive the exec.
    pub(crate) held_fds: Vec<OwnedFd>,
}

impl CompiledSandbox {
    /// The directive tokens, as passed through `--args`.
    pub fn tokens(&self) -> Vec<String> {
        to_tokens(&self.directives)
    }
}

/// Compiles resolved configurations for one launch.
#[derive(Debug)]
pub struct Compiler {
    home: PathBuf,
    env: EnvContext,
}

impl Compiler {
    /// `home` is the user's home path inside the sandbox.
    pub fn new(home: impl Into<PathBuf>, env: EnvContext) -> Self {
        Self {
            home: home.into(),
            env,
        }
    }

    pub fn compile(
        mut self,
        cfg: &ResolvedConfig,
        proxy: &mut dyn BusProxy,
    ) -> Result<CompiledSandbox> {
        if cfg.command.is_empty() {
            return Err(SandboxError::EmptyCommand);
        }

        let mut out = Vec::new();
        let mut held_fds = Vec::new();

        if let Some(root) = &cfg.root_filesystem {
            out.push(Directive::Bind {
                mode: AccessMode::Device,
                src: self.env.expand(root),
                dest: "/".to_string(),
                optional: false,
            });
        }

        out.push(Directive::Proc("/proc".to_string()));
        out.push(Directive::Dev("/dev".to_string()));

        if let Some(home) = &cfg.home {
            let src = self.env.expand(home);
            create_host_dir(Path::new(&src))?;
            out.push(Directive::Bind {
                mode: AccessMode::ReadWrite,
                src,
                dest: self.home.to_string_lossy().into_owned(),
                optional: false,
            });
        }

        out.extend(
            Namespace::ALL
                .into_iter()
                .filter(|ns| !cfg.shared_namespaces.contains(ns))
                .map(Directive::Unshare),
        );

        if cfg.kill_with_parent.unwrap_or(false) {
            out.push(Directive::DieWithParent);
        }

        for (name, value) in &cfg.environment {
            let value = self.env.expand(value);
            debug!("setenv {name}={value}");
            self.env.set(name.clone(), value);
        }
        out.extend(cfg.unset_environment.iter().cloned().map(Directive::UnsetEnv));

        for spec in &cfg.device_binds {
            self.compile_bind(spec, AccessMode::Device, &mut out)?;
        }
        for spec in &cfg.binds {
            self.compile_bind(spec, AccessMode::ReadWrite, &mut out)?;
        }

        out.extend(cfg.symlinks.iter().map(|link| Directive::Symlink {
            target: self.env.expand(&link.target),
            link: self.env.expand(&link.link),
        }));
        out.extend(cfg.directories.iter().map(|dir| Directive::Dir(self.env.expand(dir))));
        out.extend(cfg.sandbox_args.iter().cloned().map(Directive::Raw));

        if cfg.wants_bus_proxy() {
            let session = proxy.start(&cfg.session_bus_filter, &cfg.system_bus_filter, &self.env)?;
            out.extend(session.directives);
            held_fds.push(session.sync_fd);
        }

        if let Some(dir) = &cfg.working_directory {
            out.push(Directive::Chdir(self.env.expand(dir)));
        }

        let command: Vec<String> = cfg.command.iter().map(|arg| self.env.expand(arg)).collect();
        debug!(?command, directives = out.len(), "compiled sandbox");

        Ok(CompiledSandbox {
            directives: out,
            command,
            env: self.env,
            held_fds,
        })
    }

    fn compile_bind(
        &self,
        spec: &BindSpec,
        default_mode: AccessMode,
        out: &mut Vec<Directive>,
    ) -> Result<()> {
        match spec {
            BindSpec::Path(path) => {
                let path = self.env.expand(path);
                out.push(Directive::bind_try(default_mode, path.clone(), path));
            }
            BindSpec::Mapped {
                src,
                dest,
                mode,
                create,
            } => {
                let src = self.env.expand(src);
                let dest = dest
                    .as_deref()
                    .map_or_else(|| src.clone(), |dest| self.env.expand(dest));
                if *create {
                    create_host_dir(Path::new(&src))?;
                }
                out.push(Directive::bind_try(mode.unwrap_or(default_mode), src, dest));
            }
            BindSpec::Glob { pattern, mode } => {
                let pattern = shell_pattern(&self.env.expand(pattern));
                let matches = glob::glob_with(&pattern, GLOB_OPTIONS).map_err(|e| {
                    SandboxError::InvalidBindSpec(format!("bad glob pattern '{pattern}': {e}"))
                })?;
                let before = out.len();
                for entry in matches {
                    match entry {
                        Ok(path) => match path.to_str() {
                            Some(path) => out.push(Directive::bind_try(
                                mode.unwrap_or(default_mode),
                                path,
                                path,
                            )),
                            None => warn!("skipping non UTF-8 path {}", path.display()),
                        },
                        Err(e) => warn!("skipping unreadable glob entry: {e}"),
                    }
                }
                if out.len() == before {
                    debug!("glob '{pattern}' matched nothing");
                }
            }
            BindSpec::Tmpfs { path } => out.push(Directive::Tmpfs(self.env.expand(path))),
        }
        Ok(())
    }
}

/// Collapse `**` to `*` so that it matches a single path component.
fn shell_pattern(pattern: &str) -> String {
    let mut out = pattern.to_string();
    while out.contains("**") {
        out = out.replace("**", "*");
    }
    out
}

/// Create `path` and its parents on the host; an existing directory is fine.
fn create_host_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| SandboxError::host_mutation(path, e))?;
    debug!(path = %path.display(), "ensured host directory");
    Ok(())
}

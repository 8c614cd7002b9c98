//! Command execution.

use std::io::{self, Write};

use anyhow::{Context, Result, anyhow};
use runw_config::{Catalog, RunwDirs, find_profile, load_presets, load_profiles, resolve};
use runw_sandbox::{Compiler, DbusProxy, EnvContext, Launcher};
use tracing::debug;

use super::args::Cli;

/// Shell used by `--shell` when `$SHELL` is unset.
pub const FALLBACK_SHELL: &str = "bash";

/// Run the CLI. Only returns on error or after `--list`.
pub fn run(cli: Cli) -> Result<()> {
    let dirs = RunwDirs::from_env();
    debug!(config = %dirs.config_dir.display(), "using config directory");

    let profiles = load_profiles(&dirs.profiles_file())?;
    let presets = load_presets(&dirs.presets_file())?;
    if cli.list {
        return list_profiles(&profiles, &presets, &mut io::stdout().lock())
            .context("failed to write container list");
    }

    let name = cli
        .container
        .as_deref()
        .ok_or_else(|| anyhow!("no container given"))?;
    let profile = find_profile(&profiles, name)?;

    let mut resolved =
        resolve(profile, &presets).with_context(|| format!("failed to resolve '{name}'"))?;
    let shell = cli.shell.then(login_shell);
    apply_overrides(&mut resolved.command, cli.cmd.as_deref(), &cli.args, shell)?;
    debug!(?resolved, "resolved container");

    let mut proxy = DbusProxy::new(&dirs);
    let compiled = Compiler::new(&dirs.home, launch_env(&dirs))
        .compile(&resolved, &mut proxy)
        .with_context(|| format!("failed to prepare '{name}'"))?;

    Err(Launcher::default().launch(compiled).into())
}

/// Write `name<TAB>description` for every profile, sorted by name.
///
/// A profile without its own description shows the one it inherits through
/// `use`; profiles that fail to resolve are still listed.
pub fn list_profiles(
    profiles: &Catalog,
    presets: &Catalog,
    out: &mut impl Write,
) -> io::Result<()> {
    for (name, profile) in profiles {
        let description = match &profile.description {
            Some(description) => Some(description.clone()),
            None => resolve(profile, presets).ok().and_then(|r| r.description),
        };
        writeln!(out, "{name}\t{}", description.unwrap_or_default())?;
    }
    out.flush()
}

/// The host environment, with XDG directories defaulted from `dirs` so that
/// configuration can always reference them.
pub fn launch_env(dirs: &RunwDirs) -> EnvContext {
    EnvContext::from_process()
        .with_fallback("XDG_RUNTIME_DIR", dirs.runtime_dir.to_string_lossy())
        .with_fallback("XDG_CONFIG_HOME", dirs.home.join(".config").to_string_lossy())
        .with_fallback("XDG_CACHE_HOME", dirs.home.join(".cache").to_string_lossy())
        .with_fallback("XDG_DATA_HOME", dirs.home.join(".local/share").to_string_lossy())
}

/// The user's shell from `$SHELL`, or [`FALLBACK_SHELL`].
pub fn login_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_SHELL.to_string())
}

/// Apply CLI command overrides in order: `cmd` replaces the command, `args`
/// are appended, then `shell` replaces everything.
pub fn apply_overrides(
    command: &mut Vec<String>,
    cmd: Option<&str>,
    args: &[String],
    shell: Option<String>,
) -> Result<()> {
    if let Some(cmd) = cmd {
        *command = shlex::split(cmd).ok_or_else(|| anyhow!("cannot parse --cmd: {cmd}"))?;
    }
    command.extend(args.iter().cloned());
    if let Some(shell) = shell {
        *command = vec![shell];
    }
    Ok(())
}

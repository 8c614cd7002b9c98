//! D-Bus proxy coordination.
//!
//! When a profile filters the session or system bus, `xdg-dbus-proxy` is
//! started before the sandbox. It listens on per-launch sockets under
//! `$XDG_RUNTIME_DIR/bus-proxy/`, named after the launcher's pid, and writes
//! one byte to the `--fd` pipe once both sockets accept connections. The read
//! end of that pipe is then handed to bubblewrap as `--sync-fd`; when the
//! sandbox exits the pipe closes and the proxy shuts down.

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd};
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::Duration;

use runw_config::{AccessMode, RunwDirs};
use tracing::{debug, warn};

use crate::directive::Directive;
use crate::env::EnvContext;
use crate::error::{Result, SandboxError};
use crate::rendezvous::{Rendezvous, set_inheritable};
use crate::timeout::DEFAULT_PROXY_READY_TIMEOUT_SECS;

/// Default proxy binary.
pub const XDG_DBUS_PROXY: &str = "/usr/bin/xdg-dbus-proxy";

/// Host and sandbox path of the system bus socket.
pub const SYSTEM_BUS_SOCKET: &str = "/run/dbus/system_bus_socket";

/// Environment variable holding the session bus address.
pub const SESSION_BUS_ADDRESS_ENV: &str = "DBUS_SESSION_BUS_ADDRESS";

/// A started proxy: directives to expose its sockets, plus the descriptor
/// that must stay open until the sandbox binary is executed.
#[derive(Debug)]
pub struct ProxySession {
    pub directives: Vec<Directive>,
    pub sync_fd: OwnedFd,
}

/// Starts a bus proxy for a sandbox.
pub trait BusProxy {
    /// Start the proxy and block until it is ready.
    fn start(
        &mut self,
        session_filter: &[String],
        system_filter: &[String],
        env: &EnvContext,
    ) -> Result<ProxySession>;
}

/// `xdg-dbus-proxy` launched as a child of the launcher.
#[derive(Debug, Clone)]
pub struct DbusProxy {
    program: PathBuf,
    socket_dir: PathBuf,
    session_bus: PathBuf,
    timeout: Duration,
}

impl DbusProxy {
    pub fn new(dirs: &RunwDirs) -> Self {
        Self {
            program: PathBuf::from(XDG_DBUS_PROXY),
            socket_dir: dirs.bus_proxy_dir(),
            session_bus: dirs.runtime_dir.join("bus"),
            timeout: Duration::from_secs(DEFAULT_PROXY_READY_TIMEOUT_SECS),
        }
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Session and system proxy socket paths for launcher `pid`.
    pub fn socket_paths(&self, pid: u32) -> (PathBuf, PathBuf) {
        (
            self.socket_dir.join(pid.to_string()),
            self.socket_dir.join(format!("{pid}-system")),
        )
    }

    fn command(
        &self,
        fd: i32,
        session_address: &str,
        sockets: (&Path, &Path),
        session_filter: &[String],
        system_filter: &[String],
    ) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(format!("--fd={fd}"))
            .arg(session_address)
            .arg(sockets.0)
            .arg("--filter")
            .args(session_filter)
            .arg(format!("unix:path={SYSTEM_BUS_SOCKET}"))
            .arg(sockets.1)
            .arg("--filter")
            .args(system_filter);
        cmd
    }
}

impl BusProxy for DbusProxy {
    fn start(
        &mut self,
        session_filter: &[String],
        system_filter: &[String],
        env: &EnvContext,
    ) -> Result<ProxySession> {
        std::fs::create_dir_all(&self.socket_dir)
            .map_err(|e| SandboxError::host_mutation(&self.socket_dir, e))?;

        let (session_proxy, system_proxy) = self.socket_paths(std::process::id());
        let session_address = env
            .get(SESSION_BUS_ADDRESS_ENV)
            .map(str::to_string)
            .unwrap_or_else(|| format!("unix:path={}", self.session_bus.display()));
        debug!(
            session = %session_proxy.display(),
            system = %system_proxy.display(),
            address = %session_address,
            "starting D-Bus proxy"
        );

        let rendezvous = Rendezvous::new().map_err(|e| {
            SandboxError::ProxyStartup(format!("failed to create readiness pipe: {e}"))
        })?;
        let mut cmd = self.command(
            rendezvous.signal_fd(),
            &session_address,
            (&session_proxy, &system_proxy),
            session_filter,
            system_filter,
        );
        cmd.envs(env.applied());
        rendezvous.share_with(&mut cmd);

        let mut child = cmd.spawn().map_err(|e| {
            SandboxError::ProxyStartup(format!("failed to spawn {}: {e}", self.program.display()))
        })?;

        let sync_fd = rendezvous
            .wait(self.timeout)
            .map_err(|e| abort(&mut child, e))?;
        set_inheritable(sync_fd.as_raw_fd(), true).map_err(|e| {
            abort(&mut child, format!("cannot pass readiness pipe to the sandbox: {e}"))
        })?;
        debug!(pid = child.id(), "D-Bus proxy is ready");

        let directives = vec![
            Directive::bind_try(
                AccessMode::ReadWrite,
                session_proxy.to_string_lossy(),
                self.session_bus.to_string_lossy(),
            ),
            Directive::bind_try(
                AccessMode::ReadWrite,
                system_proxy.to_string_lossy(),
                SYSTEM_BUS_SOCKET,
            ),
            Directive::SyncFd(sync_fd.as_raw_fd()),
        ];
        Ok(ProxySession {
            directives,
            sync_fd,
        })
    }
}

/// Kill and reap a proxy that failed to start.
fn abort(child: &mut Child, reason: impl fmt::Display) -> SandboxError {
    if let Err(e) = child.kill() {
        debug!("proxy already gone: {e}");
    }
    if let Err(e) = child.wait() {
        warn!("failed to reap D-Bus proxy: {e}");
    }
    SandboxError::ProxyStartup(reason.to_string())
}

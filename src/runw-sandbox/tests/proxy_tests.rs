//! D-Bus proxy startup tests against fake proxy scripts.
//!
//! Every test spawns children, so they run serially: a script that is still
//! open for writing in another thread's fork cannot be executed.

use std::fs;
use std::os::fd::AsRawFd;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use runw_config::{AccessMode, RunwDirs};
use runw_sandbox::{BusProxy, DbusProxy, Directive, EnvContext, SYSTEM_BUS_SOCKET, SandboxError};
use serial_test::serial;
use tempfile::TempDir;

fn dirs(runtime: &Path) -> RunwDirs {
    RunwDirs {
        home: PathBuf::from("/home/alice"),
        config_dir: PathBuf::from("/home/alice/.config/runw"),
        runtime_dir: runtime.to_path_buf(),
    }
}

/// Write an executable `/bin/sh` script; `$fd` holds the readiness descriptor.
fn fake_proxy(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-dbus-proxy");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"{}/args\"\nfd=\"${{1#--fd=}}\"\n{body}\n",
        dir.display()
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn env() -> EnvContext {
    EnvContext::from_vars([("DBUS_SESSION_BUS_ADDRESS", "unix:path=/tmp/session-bus")])
}

#[test]
#[serial]
fn test_start_waits_for_readiness_byte() {
    let tmp = TempDir::new().unwrap();
    let program = fake_proxy(tmp.path(), "sleep 0.3\neval \"printf x >&$fd\"\nexec sleep 5");
    let mut proxy = DbusProxy::new(&dirs(tmp.path())).with_program(&program);

    let started = Instant::now();
    let session = proxy
        .start(&["--talk=org.freedesktop.Notifications".to_string()], &[], &env())
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(250));

    let pid = std::process::id();
    let socket_dir = tmp.path().join("bus-proxy");
    assert!(socket_dir.is_dir());
    assert_eq!(
        session.directives,
        vec![
            Directive::bind_try(
                AccessMode::ReadWrite,
                socket_dir.join(pid.to_string()).to_string_lossy(),
                tmp.path().join("bus").to_string_lossy(),
            ),
            Directive::bind_try(
                AccessMode::ReadWrite,
                socket_dir.join(format!("{pid}-system")).to_string_lossy(),
                SYSTEM_BUS_SOCKET,
            ),
            Directive::SyncFd(session.sync_fd.as_raw_fd()),
        ]
    );

    // SAFETY: F_GETFD only reads descriptor flags.
    let flags = unsafe { libc::fcntl(session.sync_fd.as_raw_fd(), libc::F_GETFD) };
    assert_eq!(flags & libc::FD_CLOEXEC, 0);

    let args = fs::read_to_string(tmp.path().join("args")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert!(args[0].starts_with("--fd="));
    assert_eq!(
        &args[1..],
        [
            "unix:path=/tmp/session-bus",
            &*socket_dir.join(pid.to_string()).to_string_lossy(),
            "--filter",
            "--talk=org.freedesktop.Notifications",
            "unix:path=/run/dbus/system_bus_socket",
            &*socket_dir.join(format!("{pid}-system")).to_string_lossy(),
            "--filter",
        ]
    );
}

#[test]
#[serial]
fn test_start_times_out() {
    let tmp = TempDir::new().unwrap();
    let program = fake_proxy(tmp.path(), "exec sleep 5");
    let mut proxy = DbusProxy::new(&dirs(tmp.path()))
        .with_program(&program)
        .with_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let err = proxy.start(&[], &["--talk=a.b".to_string()], &env()).unwrap_err();
    assert!(matches!(err, SandboxError::ProxyStartup(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
#[serial]
fn test_start_fails_when_proxy_exits_early() {
    let tmp = TempDir::new().unwrap();
    let program = fake_proxy(tmp.path(), "exit 1");
    let mut proxy = DbusProxy::new(&dirs(tmp.path())).with_program(&program);

    let started = Instant::now();
    let err = proxy.start(&["--talk=a.b".to_string()], &[], &env()).unwrap_err();
    assert!(matches!(err, SandboxError::ProxyStartup(_)), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
#[serial]
fn test_start_fails_for_missing_program() {
    let tmp = TempDir::new().unwrap();
    let mut proxy =
        DbusProxy::new(&dirs(tmp.path())).with_program(tmp.path().join("no-such-proxy"));

    let err = proxy.start(&["--talk=a.b".to_string()], &[], &env()).unwrap_err();
    match err {
        SandboxError::ProxyStartup(msg) => assert!(msg.contains("no-such-proxy"), "{msg}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
#[serial]
fn test_uncreatable_socket_dir_is_host_mutation() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("runtime");
    fs::write(&blocker, "not a directory").unwrap();
    let mut proxy = DbusProxy::new(&dirs(&blocker)).with_program("/bin/true");

    let err = proxy.start(&["--talk=a.b".to_string()], &[], &env()).unwrap_err();
    assert!(matches!(err, SandboxError::HostMutation { .. }), "{err:?}");
}

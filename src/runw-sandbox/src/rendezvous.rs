//! One-shot readiness rendezvous with a child process.
//!
//! The parent creates a pipe, hands the write end to a child and blocks until
//! the child writes a single byte. The read end is returned to the caller,
//! which typically passes it on to another process so that the child can
//! observe it closing.
//!
//! ```rust,ignore
//! let rendezvous = Rendezvous::new()?;
//! let mut cmd = Command::new("helper");
//! cmd.arg(format!("--fd={}", rendezvous.signal_fd()));
//! rendezvous.share_with(&mut cmd);
//! let child = cmd.spawn()?;
//! let ready = rendezvous.wait(Duration::from_secs(10))?;
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// Why a rendezvous did not complete.
#[derive(Debug, Error)]
pub enum RendezvousError {
    #[error("peer closed the pipe before signalling readiness")]
    Closed,

    #[error("no readiness signal within {0:?}")]
    TimedOut(Duration),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A pipe whose write end is given to a child and whose read end waits.
#[derive(Debug)]
pub struct Rendezvous {
    read: File,
    write: OwnedFd,
}

impl Rendezvous {
    /// Create the pipe. Both ends are close-on-exec.
    pub fn new() -> io::Result<Self> {
        let mut fds: [libc::c_int; 2] = [-1; 2];
        // SAFETY: pipe2 writes two valid descriptors into `fds` on success.
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: both descriptors were just created and are owned by nobody else.
        let (read, write) = unsafe { (File::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
        Ok(Self { read, write })
    }

    /// Descriptor number of the write end, as seen by the child.
    pub fn signal_fd(&self) -> RawFd {
        self.write.as_raw_fd()
    }

    /// Let `cmd` inherit the write end across exec.
    pub fn share_with(&self, cmd: &mut Command) {
        let fd = self.write.as_raw_fd();
        // SAFETY: fcntl is async-signal-safe and only touches the child's copy of `fd`.
        unsafe {
            cmd.pre_exec(move || set_inheritable(fd, true));
        }
    }

    /// Close the parent's write end and wait for one byte.
    ///
    /// Returns the read end on success. Fails with [`RendezvousError::Closed`]
    /// as soon as every write end is closed without a byte (the child exited),
    /// and with [`RendezvousError::TimedOut`] once `timeout` elapses.
    pub fn wait(self, timeout: Duration) -> Result<OwnedFd, RendezvousError> {
        let Self { mut read, write } = self;
        drop(write);

        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(RendezvousError::TimedOut(timeout));
            }
            if !poll_readable(&read, deadline - now)? {
                continue;
            }

            let mut byte = [0u8; 1];
            match read.read(&mut byte) {
                Ok(0) => return Err(RendezvousError::Closed),
                Ok(_) => {
                    debug!(fd = read.as_raw_fd(), "rendezvous complete");
                    return Ok(OwnedFd::from(read));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Wait up to `timeout` for `file` to become readable or hung up.
fn poll_readable(file: &File, timeout: Duration) -> io::Result<bool> {
    let millis = timeout.as_micros().div_ceil(1000).min(libc::c_int::MAX as u128) as libc::c_int;
    let mut pfd = libc::pollfd {
        fd: file.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    // SAFETY: `pfd` is a valid pollfd for the duration of the call.
    let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}

/// Set or clear `FD_CLOEXEC` on `fd`.
pub fn set_inheritable(fd: RawFd, inheritable: bool) -> io::Result<()> {
    // SAFETY: F_GETFD/F_SETFD only read and write descriptor flags.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let flags = if inheritable {
            flags & !libc::FD_CLOEXEC
        } else {
            flags | libc::FD_CLOEXEC
        };
        if libc::fcntl(fd, libc::F_SETFD, flags) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn helper(script: &str, rendezvous: &Rendezvous) -> std::process::Child {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c")
            .arg(script)
            .arg("helper")
            .arg(rendezvous.signal_fd().to_string());
        rendezvous.share_with(&mut cmd);
        cmd.spawn().unwrap()
    }

    fn is_cloexec(fd: RawFd) -> bool {
        // SAFETY: F_GETFD only reads descriptor flags.
        let flags = unsafe { libc::fcntl(fd, libc::F_GETFD) };
        flags & libc::FD_CLOEXEC != 0
    }

    #[test]
    fn test_ready_after_delay() {
        let rendezvous = Rendezvous::new().unwrap();
        let mut child = helper(r#"sleep 0.2; printf x >&"$1""#, &rendezvous);

        let started = Instant::now();
        let fd = rendezvous.wait(Duration::from_secs(10)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(fd.as_raw_fd() >= 0);
        child.wait().unwrap();
    }

    #[test]
    fn test_child_exit_without_signal_is_closed() {
        let rendezvous = Rendezvous::new().unwrap();
        let mut child = helper("exit 0", &rendezvous);

        let err = rendezvous.wait(Duration::from_secs(10)).unwrap_err();
        assert!(matches!(err, RendezvousError::Closed), "{err}");
        child.wait().unwrap();
    }

    #[test]
    fn test_silent_child_times_out() {
        let rendezvous = Rendezvous::new().unwrap();
        let mut child = helper("sleep 5", &rendezvous);

        let started = Instant::now();
        let err = rendezvous.wait(Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, RendezvousError::TimedOut(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(4));

        child.kill().unwrap();
        child.wait().unwrap();
    }

    #[test]
    fn test_pipe_ends_are_cloexec() {
        let rendezvous = Rendezvous::new().unwrap();
        assert!(is_cloexec(rendezvous.signal_fd()));
        assert!(is_cloexec(rendezvous.read.as_raw_fd()));
    }

    #[test]
    fn test_set_inheritable_round_trip() {
        let rendezvous = Rendezvous::new().unwrap();
        let fd = rendezvous.signal_fd();
        set_inheritable(fd, true).unwrap();
        assert!(!is_cloexec(fd));
        set_inheritable(fd, false).unwrap();
        assert!(is_cloexec(fd));
    }
}

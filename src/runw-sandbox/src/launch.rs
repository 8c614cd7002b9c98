//! Terminal handoff to the sandbox binary.
//!
//! Directives travel through `bwrap --args <fd>` rather than argv, which keeps
//! large profiles clear of argument length limits. The launcher then replaces
//! its own process image; on success nothing after the exec runs.

use std::ffi::OsString;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::os::unix::process::CommandExt;
use std::process::Command;

use tracing::debug;

use crate::compile::CompiledSandbox;
use crate::directive::encode_args;
use crate::error::{Result, SandboxError};
use crate::rendezvous::set_inheritable;

/// Default sandbox binary, looked up in `PATH`.
pub const BWRAP: &str = "bwrap";

/// Executes compiled sandboxes.
#[derive(Debug, Clone)]
pub struct Launcher {
    program: OsString,
}

impl Default for Launcher {
    fn default() -> Self {
        Self::new(BWRAP)
    }
}

impl Launcher {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Replace the current process with the sandbox binary.
    ///
    /// Only returns if the exec failed.
    pub fn launch(&self, sandbox: CompiledSandbox) -> SandboxError {
        match self.exec(sandbox) {
            Ok(never) => match never {},
            Err(e) => e,
        }
    }

    fn exec(&self, sandbox: CompiledSandbox) -> Result<std::convert::Infallible> {
        let args = args_file(&encode_args(&sandbox.directives))?;

        debug!(tokens = ?sandbox.tokens(), "bwrap args");
        let mut cmd = Command::new(&self.program);
        cmd.arg("--args")
            .arg(args.as_raw_fd().to_string())
            .args(&sandbox.command)
            .envs(sandbox.env.applied());

        let source = cmd.exec();
        // Descriptors stay open until exec has failed.
        drop(sandbox.held_fds);
        drop(args);
        Err(SandboxError::Launch {
            program: self.program.to_string_lossy().into_owned(),
            source,
        })
    }
}

/// An inheritable, rewound anonymous file holding `content`.
fn args_file(content: &[u8]) -> Result<File> {
    let mut file = tempfile::tempfile()?;
    file.write_all(content)?;
    file.seek(SeekFrom::Start(0))?;
    set_inheritable(file.as_raw_fd(), true)?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_args_file_is_rewound_and_inheritable() {
        let mut file = args_file(b"--proc\0/proc").unwrap();
        // SAFETY: F_GETFD only reads descriptor flags.
        let flags = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETFD) };
        assert_eq!(flags & libc::FD_CLOEXEC, 0);

        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"--proc\0/proc");
    }
}

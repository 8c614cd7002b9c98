//! Bubblewrap directives.
//!
//! A [`Directive`] is one option group of the sandbox binary. Directives are
//! order sensitive: later mounts shadow earlier ones, so the compiler emits
//! them in a fixed sequence and [`encode_args`] preserves it.

use std::os::fd::RawFd;

use runw_config::{AccessMode, Namespace};

/// One instruction for the sandbox binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Bind `src` onto `dest`. Optional binds are skipped when `src` is missing.
    Bind {
        mode: AccessMode,
        src: String,
        dest: String,
        optional: bool,
    },
    Tmpfs(String),
    Proc(String),
    Dev(String),
    Unshare(Namespace),
    DieWithParent,
    UnsetEnv(String),
    Symlink { target: String, link: String },
    Dir(String),
    Chdir(String),
    /// Keep `fd` open for the lifetime of the sandbox.
    SyncFd(RawFd),
    /// A token passed through verbatim.
    Raw(String),
}

impl Directive {
    /// A bind that tolerates a missing source.
    pub fn bind_try(mode: AccessMode, src: impl Into<String>, dest: impl Into<String>) -> Self {
        Self::Bind {
            mode,
            src: src.into(),
            dest: dest.into(),
            optional: true,
        }
    }

    /// Append this directive's tokens to `out`.
    pub fn push_tokens(&self, out: &mut Vec<String>) {
        match self {
            Self::Bind {
                mode,
                src,
                dest,
                optional,
            } => {
                out.push(bind_verb(*mode, *optional).to_string());
                out.push(src.clone());
                out.push(dest.clone());
            }
            Self::Tmpfs(path) => push(out, "--tmpfs", [path]),
            Self::Proc(path) => push(out, "--proc", [path]),
            Self::Dev(path) => push(out, "--dev", [path]),
            Self::Unshare(ns) => out.push(unshare_verb(*ns).to_string()),
            Self::DieWithParent => out.push("--die-with-parent".to_string()),
            Self::UnsetEnv(name) => push(out, "--unsetenv", [name]),
            Self::Symlink { target, link } => push(out, "--symlink", [target, link]),
            Self::Dir(path) => push(out, "--dir", [path]),
            Self::Chdir(path) => push(out, "--chdir", [path]),
            Self::SyncFd(fd) => {
                out.push("--sync-fd".to_string());
                out.push(fd.to_string());
            }
            Self::Raw(token) => out.push(token.clone()),
        }
    }
}

fn push<const N: usize>(out: &mut Vec<String>, verb: &str, operands: [&String; N]) {
    out.push(verb.to_string());
    out.extend(operands.into_iter().cloned());
}

fn bind_verb(mode: AccessMode, optional: bool) -> &'static str {
    match (mode, optional) {
        (AccessMode::ReadOnly, true) => "--ro-bind-try",
        (AccessMode::ReadOnly, false) => "--ro-bind",
        (AccessMode::ReadWrite, true) => "--bind-try",
        (AccessMode::ReadWrite, false) => "--bind",
        (AccessMode::Device, true) => "--dev-bind-try",
        (AccessMode::Device, false) => "--dev-bind",
    }
}

fn unshare_verb(ns: Namespace) -> &'static str {
    match ns {
        Namespace::User => "--unshare-user-try",
        Namespace::Ipc => "--unshare-ipc",
        Namespace::Pid => "--unshare-pid",
        Namespace::Uts => "--unshare-uts",
        Namespace::Cgroup => "--unshare-cgroup-try",
        Namespace::Net => "--unshare-net",
    }
}

/// Flatten directives into the sandbox binary's argument tokens.
pub fn to_tokens(directives: &[Directive]) -> Vec<String> {
    let mut out = Vec::with_capacity(directives.len() * 3);
    for directive in directives {
        directive.push_tokens(&mut out);
    }
    out
}

/// Encode directives for `bwrap --args <fd>`: tokens joined by NUL, with no
/// trailing separator.
pub fn encode_args(directives: &[Directive]) -> Vec<u8> {
    to_tokens(directives).join("\0").into_bytes()
}

//! runw sandbox: bubblewrap directive compilation and launch.
//!
//! # Architecture
//!
//! ```text
//! ResolvedConfig ──► Compiler ──► CompiledSandbox ──► Launcher (exec bwrap)
//!                       │
//!                       └──► BusProxy (xdg-dbus-proxy + readiness rendezvous)
//! ```
//!
//! Linux only: relies on `pipe2`, `poll` and bubblewrap's `--args`/`--sync-fd`.

pub mod compile;
pub mod directive;
pub mod env;
pub mod error;
pub mod launch;
pub mod proxy;
pub mod rendezvous;
pub mod timeout;

pub use compile::{CompiledSandbox, Compiler};
pub use directive::{Directive, encode_args, to_tokens};
pub use env::EnvContext;
pub use error::{Result, SandboxError};
pub use launch::{BWRAP, Launcher};
pub use proxy::{BusProxy, DbusProxy, ProxySession, SYSTEM_BUS_SOCKET, XDG_DBUS_PROXY};
pub use rendezvous::{Rendezvous, RendezvousError};

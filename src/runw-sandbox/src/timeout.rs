//! Timeout constants for runw.

/// How long to wait for the D-Bus proxy to report readiness, in seconds.
///
/// The proxy only has to bind two listening sockets, so anything beyond a
/// few seconds means it is stuck or waiting on an unreachable bus.
pub const DEFAULT_PROXY_READY_TIMEOUT_SECS: u64 = 10;

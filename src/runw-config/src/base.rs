//! Built-in base fragment.
//!
//! Used when the preset catalog does not define [`BASE_PRESET`] itself. It
//! exposes the host's system directories, the merged-usr symlinks, GPU, input
//! and sound devices, display and audio sockets, and shader caches: enough for
//! most desktop programs to start without extra presets.
//!
//! Paths reference `$XDG_RUNTIME_DIR`, `$XDG_CACHE_HOME` and
//! `$XDG_CONFIG_HOME`; they are expanded at compile time.

use crate::fragment::{AccessMode, BindSpec, Fragment, Symlink};

/// Reserved preset name merged into every profile unless suppressed.
pub const BASE_PRESET: &str = "default";

const SYSTEM_BINDS: &[&str] = &[
    "/usr",
    "/etc",
    "/opt",
    "/var/lib/alsa",
    "/run/systemd/resolve",
    "/tmp/.X11-unix",
    "/tmp/.ICE-unix",
];

const DEVICE_BINDS: &[&str] = &[
    "/dev/dri",
    "/dev/input",
    "/dev/hugepages",
    "/dev/snd",
    "/dev/fuse",
    "/sys/block",
    "/sys/bus",
    "/sys/class",
    "/sys/dev",
    "/sys/devices",
    "/sys/module",
];

/// Display and audio sockets.
const RUNTIME_SOCKETS: &[&str] = &["wayland*", "pulse*", "pipewire*"];

const SHADER_CACHES: &[&str] = &[
    "mesa_shader_cache",
    "radv_builtin_shaders64",
    "nv",
    "nvidia",
    "radv_builtin_shaders",
    "mesa_shader_cache_db",
];

fn path(p: impl Into<String>) -> BindSpec {
    BindSpec::Path(p.into())
}

fn glob(pattern: impl Into<String>) -> BindSpec {
    BindSpec::Glob {
        pattern: pattern.into(),
        mode: None,
    }
}

fn read_only(src: impl Into<String>) -> BindSpec {
    BindSpec::Mapped {
        src: src.into(),
        dest: None,
        mode: Some(AccessMode::ReadOnly),
        create: false,
    }
}

/// The base fragment used when the catalog has no `default` preset.
pub fn builtin_base() -> Fragment {
    let mut device_binds: Vec<BindSpec> = DEVICE_BINDS.iter().copied().map(path).collect();
    device_binds.insert(3, glob("/dev/nvidia*"));

    let mut binds: Vec<BindSpec> = SYSTEM_BINDS.iter().copied().map(path).collect();
    binds.extend(
        RUNTIME_SOCKETS
            .iter()
            .map(|name| glob(format!("$XDG_RUNTIME_DIR/{name}"))),
    );
    binds.extend(
        SHADER_CACHES
            .iter()
            .map(|name| path(format!("$XDG_CACHE_HOME/{name}"))),
    );
    binds.push(path("$XDG_CONFIG_HOME/MangoHud"));
    binds.push(read_only("$XDG_CONFIG_HOME/user-dirs.dirs"));
    binds.push(read_only("$XDG_CONFIG_HOME/user-dirs.locale"));

    Fragment {
        binds,
        device_binds,
        symlinks: vec![
            Symlink::new("/usr/bin", "/bin"),
            Symlink::new("/usr/bin", "/sbin"),
            Symlink::new("/usr/lib", "/lib"),
            Symlink::new("/usr/lib64", "/lib64"),
            Symlink::new("/run", "/var/run"),
        ],
        directories: vec!["/var/empty".to_string(), "/tmp".to_string()],
        ..Fragment::default()
    }
}

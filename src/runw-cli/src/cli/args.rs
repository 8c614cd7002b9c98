//! Command-line surface.

use clap::Parser;

/// Run a preconfigured bubblewrap container
///
/// Containers are defined in `runw.toml` and may pull in presets from
/// `presets.toml`, both under `$XDG_CONFIG_HOME/runw`.
///
/// # Examples
///
/// Launch a container:
///     runw firefox
///
/// Pass extra arguments to the container's command:
///     runw firefox -- --private-window
///
/// Open a shell with the container's view of the system:
///     runw -s firefox
#[derive(Parser, Debug)]
#[command(name = "runw", version, about, long_about = None)]
pub struct Cli {
    /// Container to launch
    #[arg(required_unless_present = "list")]
    pub container: Option<String>,

    /// Run the user's shell ($SHELL, default bash) instead of the command
    #[arg(short, long)]
    pub shell: bool,

    /// Replace the container's command (split with shell quoting rules)
    #[arg(short, long, value_name = "COMMAND")]
    pub cmd: Option<String>,

    /// List configured containers and exit
    #[arg(short, long)]
    pub list: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Extra arguments appended to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_container_only() {
        let cli = Cli::try_parse_from(["runw", "firefox"]).unwrap();
        assert_eq!(cli.container.as_deref(), Some("firefox"));
        assert!(!cli.shell && !cli.list && !cli.verbose);
        assert!(cli.cmd.is_none());
        assert!(cli.args.is_empty());
    }

    #[test]
    fn test_parse_flags() {
        let cli = Cli::try_parse_from(["runw", "-s", "-v", "-c", "ls -la", "htop"]).unwrap();
        assert!(cli.shell);
        assert!(cli.verbose);
        assert_eq!(cli.cmd.as_deref(), Some("ls -la"));
        assert_eq!(cli.container.as_deref(), Some("htop"));
    }

    #[test]
    fn test_parse_trailing_args() {
        let cli =
            Cli::try_parse_from(["runw", "firefox", "--", "--private-window", "a b"]).unwrap();
        assert_eq!(cli.args, vec!["--private-window", "a b"]);

        let cli = Cli::try_parse_from(["runw", "firefox", "https://example.org", "-v"]).unwrap();
        assert_eq!(cli.args, vec!["https://example.org", "-v"]);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_list_needs_no_container() {
        let cli = Cli::try_parse_from(["runw", "--list"]).unwrap();
        assert!(cli.list);
        assert!(cli.container.is_none());
    }

    #[test]
    fn test_container_required_without_list() {
        assert!(Cli::try_parse_from(["runw"]).is_err());
        assert!(Cli::try_parse_from(["runw", "-s"]).is_err());
    }
}

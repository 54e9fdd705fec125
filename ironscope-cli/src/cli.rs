//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Ironscope -- pentest workspace manager and scanner report importer.
///
/// Use `ironscope <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "ironscope", version, about, long_about = None)]
pub struct Cli {
    /// Path to the ironscope.toml configuration file.
    ///
    /// When omitted, `./ironscope.toml` is used if present, otherwise built-in defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage workspaces.
    Workspace(WorkspaceArgs),

    /// Import a scanner report into a workspace.
    Import(ImportArgs),

    /// List hosts stored in a workspace.
    Hosts(HostsArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- workspace ----

#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub action: WorkspaceAction,
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceAction {
    /// Create a new workspace.
    Create {
        /// Workspace name (lowercase, starts with a letter).
        name: String,

        /// Free-form description.
        #[arg(short, long, default_value = "")]
        description: String,

        /// Storage backend (fs, docstore). Defaults to `persistence.default_backend`.
        #[arg(short, long)]
        backend: Option<String>,
    },
    /// List all workspaces across backends.
    List,
    /// Show a workspace record with host and command counts.
    Show {
        /// Workspace name.
        name: String,
    },
    /// Remove a workspace and its storage. Removing an unknown name succeeds.
    Remove {
        /// Workspace name.
        name: String,
    },
}

// ---- import ----

/// Route a report file through the plugin matching `--plugin`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Target workspace.
    pub workspace: String,

    /// Scanner report file (captured command output).
    pub report: PathBuf,

    /// Command signature of the producing tool (e.g. nessus, nmap).
    #[arg(short, long)]
    pub plugin: String,
}

// ---- hosts ----

#[derive(Args, Debug)]
pub struct HostsArgs {
    /// Workspace name.
    pub workspace: String,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, persistence, plugins).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn parse_workspace_create_defaults() {
        let cli = Cli::try_parse_from(["ironscope", "workspace", "create", "acme"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Workspace(args) => match args.action {
                WorkspaceAction::Create {
                    name,
                    description,
                    backend,
                } => {
                    assert_eq!(name, "acme");
                    assert!(description.is_empty());
                    assert!(backend.is_none(), "backend should fall back to config");
                }
                _ => panic!("expected Create action"),
            },
            _ => panic!("expected Workspace command"),
        }
    }

    #[test]
    fn parse_workspace_create_with_backend() {
        let cli = Cli::try_parse_from([
            "ironscope",
            "workspace",
            "create",
            "acme",
            "-d",
            "q3 external",
            "--backend",
            "docstore",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Workspace(WorkspaceArgs {
                action:
                    WorkspaceAction::Create {
                        description,
                        backend,
                        ..
                    },
            }) => {
                assert_eq!(description, "q3 external");
                assert_eq!(backend.as_deref(), Some("docstore"));
            }
            _ => panic!("expected workspace create"),
        }
    }

    #[test]
    fn parse_workspace_list_show_remove() {
        for (args, expected) in [
            (vec!["ironscope", "workspace", "list"], "list"),
            (vec!["ironscope", "workspace", "show", "acme"], "show"),
            (vec!["ironscope", "workspace", "remove", "acme"], "remove"),
        ] {
            let cli = Cli::try_parse_from(args).expect("parse succeeded");
            let Commands::Workspace(ws) = cli.command else {
                panic!("expected Workspace command");
            };
            let got = match ws.action {
                WorkspaceAction::List => "list",
                WorkspaceAction::Show { .. } => "show",
                WorkspaceAction::Remove { .. } => "remove",
                WorkspaceAction::Create { .. } => "create",
            };
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn parse_import() {
        let cli = Cli::try_parse_from([
            "ironscope",
            "import",
            "acme",
            "/tmp/scan.nessus",
            "--plugin",
            "nessus",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::Import(args) => {
                assert_eq!(args.workspace, "acme");
                assert_eq!(args.report, PathBuf::from("/tmp/scan.nessus"));
                assert_eq!(args.plugin, "nessus");
            }
            _ => panic!("expected Import command"),
        }
    }

    #[test]
    fn import_requires_plugin() {
        let args = Cli::try_parse_from(["ironscope", "import", "acme", "scan.xml"]);
        assert!(args.is_err(), "--plugin is required");
    }

    #[test]
    fn parse_hosts() {
        let cli = Cli::try_parse_from(["ironscope", "hosts", "acme"]).expect("parse succeeded");
        assert!(matches!(cli.command, Commands::Hosts(HostsArgs { workspace }) if workspace == "acme"));
    }

    #[test]
    fn parse_config_show_section() {
        let cli = Cli::try_parse_from(["ironscope", "config", "show", "--section", "plugins"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(ConfigArgs {
                action: ConfigAction::Show { section },
            }) => assert_eq!(section.as_deref(), Some("plugins")),
            _ => panic!("expected config show"),
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ironscope",
            "workspace",
            "list",
            "--output",
            "json",
            "-c",
            "/etc/ironscope.toml",
            "--log-level",
            "debug",
        ])
        .expect("parse succeeded");
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ironscope.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn config_path_defaults_to_none() {
        let cli = Cli::try_parse_from(["ironscope", "config", "validate"]).expect("parse succeeded");
        assert!(cli.config.is_none());
        assert!(matches!(cli.output, OutputFormat::Text));
    }

    #[test]
    fn missing_or_unknown_command_fails() {
        assert!(Cli::try_parse_from(["ironscope"]).is_err());
        assert!(Cli::try_parse_from(["ironscope", "scan"]).is_err());
    }

    #[test]
    fn command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "ironscope");
        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in ["workspace", "import", "hosts", "config"] {
            assert!(subcommands.contains(&expected), "missing '{expected}'");
        }
    }
}

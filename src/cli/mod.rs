//! CLI argument definitions for nxm.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("NXM_GIT_COMMIT"),
    ", built ",
    env!("NXM_BUILD_TIMESTAMP"),
    ")"
);

/// nxm - manage the session state of a flake-based NixOS / home-manager setup.
#[derive(Parser, Debug)]
#[command(name = "nxm")]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Config root holding the `nxm/` directory (session.json, config.kdl).
    /// Can also be set via NXM_CONFIG_DIR.
    #[arg(long = "config-dir", global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a session record (default: the active session)
    Read {
        /// Session file to read instead of the active one
        path: Option<PathBuf>,
    },

    /// Apply the home-manager configuration; `switch all` also rebuilds the system
    Switch {
        /// `all` switches system and user configuration
        #[arg(value_enum)]
        scope: Option<SwitchScope>,

        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },

    /// Switch desktop environment (rebuilds system and user, resets the theme)
    Desktop {
        /// Desktop environment name as understood by the flake (e.g. gnome)
        environment: String,

        /// Print the commands instead of running them; the session is not saved
        #[arg(long)]
        dry_run: bool,
    },

    /// Module management commands
    Module {
        #[command(subcommand)]
        command: ModuleCommands,
    },

    /// Update flake inputs, then switch system and user
    Update {
        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,
    },
}

/// Module subcommands
#[derive(Subcommand, Debug)]
pub enum ModuleCommands {
    /// List available modules and whether each is enabled
    List,

    /// Enable one or more modules by name (e.g. `gaming` for gaming.nix)
    Enable {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },

    /// Disable one or more modules by name
    Disable {
        #[arg(required = true, value_name = "NAME")]
        names: Vec<String>,
    },
}

/// Scope argument for `switch`.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchScope {
    /// System and user configuration
    All,
}

impl Commands {
    /// Command name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Read { .. } => "read",
            Commands::Switch { .. } => "switch",
            Commands::Desktop { .. } => "desktop",
            Commands::Module {
                command: ModuleCommands::List,
            } => "module list",
            Commands::Module {
                command: ModuleCommands::Enable { .. },
            } => "module enable",
            Commands::Module {
                command: ModuleCommands::Disable { .. },
            } => "module disable",
            Commands::Update { .. } => "update",
        }
    }
}

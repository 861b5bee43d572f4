//! nxm - session state for a flake-based NixOS / home-manager workflow.
//!
//! This library provides the core functionality for the `nxm` CLI tool:
//! the persisted session record, module discovery and enable/disable
//! reconciliation, the environment handed to the configuration build, and
//! the ordering of the external switch commands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod env;
pub mod logging;
pub mod modules;
pub mod session;
pub mod switch;
pub mod sys;

use std::path::PathBuf;

/// Library-level error type for nxm operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Could not determine the user config directory")]
    NoConfigDir,

    #[error("Could not determine the home directory")]
    NoHomeDir,

    #[error("Could not determine {0}")]
    Identity(String),

    #[error("Malformed session file {}: {source}", path.display())]
    MalformedSession {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot read module directory {}: {source}", path.display())]
    ModuleDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown module: {0}")]
    UnknownModule(String),

    #[error("Resolved {resolved} module(s) but {requested} were requested")]
    ResolutionMismatch { requested: usize, resolved: usize },

    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}")]
    CommandFailed { program: String, status: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for nxm operations.
pub type Result<T> = std::result::Result<T, Error>;

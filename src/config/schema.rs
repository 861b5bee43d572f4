//! KDL schema for `config.kdl`.
//!
//! Every node is optional; anything absent falls back to a built-in default
//! during resolution.
//!
//! ```kdl
//! modules-dir "modules"
//! privilege "sudo"          // sudo | none | remote-sudo
//! system-switch #true
//! home-manager "home-manager"
//! nixos-rebuild "nixos-rebuild"
//! nix "nix"
//! sudo "sudo"
//! ```

use crate::{Error, Result};
use kdl::KdlDocument;
use serde::{Deserialize, Serialize};

/// How the system-level switch acquires root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Privilege {
    /// Prefix the rebuild with `sudo` (skipped when already root)
    #[default]
    Sudo,
    /// Run the rebuild as-is
    None,
    /// Let the rebuild tool escalate itself via `--use-remote-sudo`
    RemoteSudo,
}

impl Privilege {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sudo" => Some(Self::Sudo),
            "none" => Some(Self::None),
            "remote-sudo" | "remote" => Some(Self::RemoteSudo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sudo => "sudo",
            Self::None => "none",
            Self::RemoteSudo => "remote-sudo",
        }
    }
}

impl std::fmt::Display for Privilege {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Preferences stored in config.kdl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NxmConfig {
    /// Subpath of the flake directory holding `<module>.nix` files
    pub modules_dir: Option<String>,

    pub privilege: Option<Privilege>,

    /// `false` selects the per-user variant with no system-level path
    pub system_switch: Option<bool>,

    pub home_manager: Option<String>,
    pub nixos_rebuild: Option<String>,
    pub nix: Option<String>,
    pub sudo: Option<String>,
}

impl NxmConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config text.
    pub fn parse(text: &str) -> Result<Self> {
        let doc: KdlDocument = text
            .parse()
            .map_err(|e| Error::Config(format!("invalid KDL: {}", e)))?;
        Self::from_kdl(&doc)
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. A known node with a value of the wrong
    /// type or an unrecognised value is an error.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self> {
        let mut config = Self::new();

        config.modules_dir = string_node(doc, "modules-dir")?;

        if let Some(s) = string_node(doc, "privilege")? {
            let privilege = Privilege::parse(&s).ok_or_else(|| {
                Error::Config(format!(
                    "privilege must be 'sudo', 'none' or 'remote-sudo', got '{}'",
                    s
                ))
            })?;
            config.privilege = Some(privilege);
        }

        config.system_switch = bool_node(doc, "system-switch")?;
        config.home_manager = string_node(doc, "home-manager")?;
        config.nixos_rebuild = string_node(doc, "nixos-rebuild")?;
        config.nix = string_node(doc, "nix")?;
        config.sudo = string_node(doc, "sudo")?;

        Ok(config)
    }
}

fn string_node(doc: &KdlDocument, name: &str) -> Result<Option<String>> {
    let Some(entry) = doc.get(name).and_then(|node| node.entries().first()) else {
        return Ok(None);
    };
    match entry.value().as_string() {
        Some(s) if !s.trim().is_empty() => Ok(Some(s.to_string())),
        Some(_) => Err(Error::Config(format!("{} must not be empty", name))),
        None => Err(Error::Config(format!("{} must be a string", name))),
    }
}

fn bool_node(doc: &KdlDocument, name: &str) -> Result<Option<bool>> {
    let Some(entry) = doc.get(name).and_then(|node| node.entries().first()) else {
        return Ok(None);
    };
    entry
        .value()
        .as_bool()
        .map(Some)
        .ok_or_else(|| Error::Config(format!("{} must be #true or #false", name)))
}

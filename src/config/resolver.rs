//! Precedence resolution for nxm settings.
//!
//! ## Config root (highest to lowest)
//!
//! 1. `--config-dir` CLI flag
//! 2. `NXM_CONFIG_DIR` environment variable
//! 3. Platform user config directory (`~/.config` on Linux)
//!
//! The tool's files live in `<root>/nxm/`.
//!
//! ## Settings (highest to lowest)
//!
//! 1. `<root>/nxm/config.kdl`
//! 2. Built-in defaults

use super::schema::{NxmConfig, Privilege};
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config root.
pub const CONFIG_DIR_ENV: &str = "NXM_CONFIG_DIR";

/// Directory under the config root owned by nxm.
pub const APP_DIR_NAME: &str = "nxm";

pub const CONFIG_FILE_NAME: &str = "config.kdl";

/// Default subpath of the flake directory scanned for modules.
pub const DEFAULT_MODULES_DIR: &str = "modules";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    File,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File => write!(f, "file"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_dir: Option<PathBuf>,
}

/// External program names, overridable for testing or non-standard installs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programs {
    pub home_manager: String,
    pub nixos_rebuild: String,
    pub nix: String,
    pub sudo: String,
}

impl Default for Programs {
    fn default() -> Self {
        Self {
            home_manager: "home-manager".to_string(),
            nixos_rebuild: "nixos-rebuild".to_string(),
            nix: "nix".to_string(),
            sudo: "sudo".to_string(),
        }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// `<root>/nxm`
    pub app_dir: PathBuf,
    pub app_dir_source: ValueSource,
    pub modules_dir: String,
    pub privilege: Privilege,
    pub system_switch: bool,
    pub programs: Programs,
}

impl Settings {
    /// Defaults rooted at `app_dir`, as if no config.kdl existed.
    pub fn with_app_dir(app_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_dir: app_dir.into(),
            app_dir_source: ValueSource::Default,
            modules_dir: DEFAULT_MODULES_DIR.to_string(),
            privilege: Privilege::default(),
            system_switch: true,
            programs: Programs::default(),
        }
    }

    /// Layer config.kdl values over the current settings.
    pub fn apply(&mut self, config: NxmConfig) {
        if let Some(dir) = config.modules_dir {
            self.modules_dir = dir;
        }
        if let Some(privilege) = config.privilege {
            self.privilege = privilege;
        }
        if let Some(enabled) = config.system_switch {
            self.system_switch = enabled;
        }
        if let Some(p) = config.home_manager {
            self.programs.home_manager = p;
        }
        if let Some(p) = config.nixos_rebuild {
            self.programs.nixos_rebuild = p;
        }
        if let Some(p) = config.nix {
            self.programs.nix = p;
        }
        if let Some(p) = config.sudo {
            self.programs.sudo = p;
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.app_dir.join(CONFIG_FILE_NAME)
    }
}

/// Resolve the config root, returning `<root>/nxm` and its source.
pub fn resolve_app_dir(overrides: &ConfigOverrides) -> Result<(PathBuf, ValueSource)> {
    if let Some(ref dir) = overrides.config_dir {
        return Ok((dir.join(APP_DIR_NAME), ValueSource::CliFlag));
    }

    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
        return Ok((
            PathBuf::from(dir).join(APP_DIR_NAME),
            ValueSource::EnvVar(CONFIG_DIR_ENV.to_string()),
        ));
    }

    let root = dirs::config_dir().ok_or(Error::NoConfigDir)?;
    Ok((root.join(APP_DIR_NAME), ValueSource::Default))
}

/// Resolve all settings for this invocation.
pub fn resolve_settings(overrides: &ConfigOverrides) -> Result<Settings> {
    let (app_dir, source) = resolve_app_dir(overrides)?;
    let mut settings = Settings::with_app_dir(app_dir);
    settings.app_dir_source = source;

    if let Some(config) = load_config_file(&settings.config_file())? {
        settings.apply(config);
    }

    tracing::debug!(
        app_dir = %settings.app_dir.display(),
        source = %settings.app_dir_source,
        modules_dir = %settings.modules_dir,
        privilege = %settings.privilege,
        system_switch = settings.system_switch,
        "resolved settings"
    );

    Ok(settings)
}

/// Read config.kdl if present. A missing file is not an error.
fn load_config_file(path: &Path) -> Result<Option<NxmConfig>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    };
    NxmConfig::parse(&text)
        .map(Some)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

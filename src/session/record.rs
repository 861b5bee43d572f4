//! The persisted session record.

use serde::{Deserialize, Deserializer, Serialize};

/// Machine identity and enabled feature modules, persisted as `session.json`.
///
/// Every key is optional on read: missing keys and `null` values become
/// empty values. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionRecord {
    /// Set at bootstrap, never changed by nxm afterwards
    #[serde(deserialize_with = "null_as_empty")]
    pub hostname: String,

    /// Set at bootstrap from the invoking user
    #[serde(deserialize_with = "null_as_empty")]
    pub username: String,

    /// Path to the flake holding the NixOS / home-manager configuration
    #[serde(deserialize_with = "null_as_empty")]
    pub flake_dir: String,

    /// Carried through, not interpreted
    #[serde(deserialize_with = "null_as_empty")]
    pub profile: String,

    /// Last applied desktop environment; empty means the system default
    #[serde(deserialize_with = "null_as_empty")]
    pub desktop_environment: String,

    /// Transient theme override, cleared by every successful desktop switch
    #[serde(deserialize_with = "null_as_empty")]
    pub theme: String,

    /// Module file names (`gaming.nix`), without duplicates
    #[serde(deserialize_with = "null_as_empty")]
    pub enabled_modules: Vec<String>,
}

impl SessionRecord {
    /// A freshly bootstrapped record.
    pub fn bootstrap(hostname: String, username: String, flake_dir: String) -> Self {
        Self {
            hostname,
            username,
            flake_dir,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, module: &str) -> bool {
        self.enabled_modules.iter().any(|m| m == module)
    }

    /// Format for human-readable output.
    pub fn to_human(&self) -> String {
        let modules = if self.enabled_modules.is_empty() {
            "(none)".to_string()
        } else {
            self.enabled_modules.join(", ")
        };
        let or_unset = |s: &str| {
            if s.is_empty() {
                "(unset)".to_string()
            } else {
                s.to_string()
            }
        };
        [
            format!("hostname: {}", or_unset(&self.hostname)),
            format!("username: {}", or_unset(&self.username)),
            format!("flake dir: {}", or_unset(&self.flake_dir)),
            format!("profile: {}", or_unset(&self.profile)),
            format!("desktop environment: {}", or_unset(&self.desktop_environment)),
            format!("theme: {}", or_unset(&self.theme)),
            format!("enabled modules: {}", modules),
        ]
        .join("\n")
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

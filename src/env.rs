//! Environment handed to the configuration build.
//!
//! The flake is evaluated with `--impure` and reads these variables with
//! `builtins.getEnv`. The mapping is a fixed, ordered table; `hostname` and
//! `username` are not projected because they select the flake output
//! instead.
//!
//! Variables are injected into each child process rather than set on the
//! nxm process itself.

use crate::session::SessionRecord;
use serde::Serialize;
use std::process::Command;

pub const FLAKE_DIR_VAR: &str = "FLAKE_DIR";
pub const PROFILE_VAR: &str = "PROFILE";
pub const DESKTOP_ENVIRONMENT_VAR: &str = "DESKTOP_ENVIRONMENT";
pub const THEME_VAR: &str = "THEME";
pub const ENABLED_MODULES_VAR: &str = "ENABLED_MODULES";

type FieldAccessor = fn(&SessionRecord) -> String;

/// Record field to variable name, in projection order.
const PROJECTION: &[(&str, FieldAccessor)] = &[
    (FLAKE_DIR_VAR, flake_dir),
    (PROFILE_VAR, profile),
    (DESKTOP_ENVIRONMENT_VAR, desktop_environment),
    (THEME_VAR, theme),
    (ENABLED_MODULES_VAR, enabled_modules),
];

fn flake_dir(r: &SessionRecord) -> String {
    r.flake_dir.clone()
}

fn profile(r: &SessionRecord) -> String {
    r.profile.clone()
}

fn desktop_environment(r: &SessionRecord) -> String {
    r.desktop_environment.clone()
}

fn theme(r: &SessionRecord) -> String {
    r.theme.clone()
}

fn enabled_modules(r: &SessionRecord) -> String {
    render_list(&r.enabled_modules)
}

/// Render a list as `[a b c]`, order-preserving.
pub fn render_list(items: &[String]) -> String {
    format!("[{}]", items.join(" "))
}

/// The projected variables, in table order.
///
/// Serializes as a list of `[name, value]` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EnvProjection {
    vars: Vec<(&'static str, String)>,
}

impl EnvProjection {
    pub fn project(record: &SessionRecord) -> Self {
        Self {
            vars: PROJECTION
                .iter()
                .map(|(name, accessor)| (*name, accessor(record)))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.vars.iter().map(|(n, v)| (*n, v.as_str()))
    }

    /// Variable names, for `sudo --preserve-env`.
    pub fn names(&self) -> Vec<&'static str> {
        self.vars.iter().map(|(n, _)| *n).collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Set every variable on a command about to be spawned.
    pub fn apply(&self, cmd: &mut Command) {
        cmd.envs(self.iter());
    }
}

//! External command construction.
//!
//! This module builds the exact argument lists for the update, user switch
//! and system switch commands. It does not execute anything.

use crate::config::{Privilege, Programs};
use crate::env::EnvProjection;
use crate::session::SessionRecord;
use serde::Serialize;

/// A fully specified external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment for the child, in projection order
    pub env: EnvProjection,
}

impl CommandSpec {
    fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: EnvProjection::default(),
        }
    }

    fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn flag_with_value(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    fn with_env(mut self, env: &EnvProjection) -> Self {
        self.env = env.clone();
        self
    }

    /// Wrap this command in `sudo`, keeping the projected variables.
    fn under_sudo(self, sudo: &str) -> Self {
        let mut wrapped = Self::new(sudo);
        if !self.env.is_empty() {
            let names = self.env.names();
            wrapped = wrapped.arg(format!("--preserve-env={}", names.join(",")));
        }
        wrapped = wrapped.arg(self.program);
        wrapped.args.extend(self.args);
        wrapped.env = self.env;
        wrapped
    }

    /// Render as a shell-like line: `VAR=value program arg...`.
    pub fn display_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, quote(v)))
            .collect();
        parts.push(quote(&self.program));
        parts.extend(self.args.iter().map(|a| quote(a)));
        parts.join(" ")
    }

    /// `program arg...` without the environment.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| quote(s))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./#=:,+@".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

/// `<flakeDir>#<attr>`
fn flake_ref(record: &SessionRecord, attr: &str) -> String {
    format!("{}#{}", record.flake_dir, attr)
}

/// `nix flake update --flake <flakeDir>`
pub fn update(record: &SessionRecord, programs: &Programs) -> CommandSpec {
    CommandSpec::new(&programs.nix)
        .arg("flake")
        .arg("update")
        .flag_with_value("--flake", record.flake_dir.clone())
}

/// `home-manager switch --flake <flakeDir>#<username> --impure`
pub fn user_switch(record: &SessionRecord, programs: &Programs, env: &EnvProjection) -> CommandSpec {
    CommandSpec::new(&programs.home_manager)
        .arg("switch")
        .flag_with_value("--flake", flake_ref(record, &record.username))
        .arg("--impure")
        .with_env(env)
}

/// `[sudo] nixos-rebuild switch --flake <flakeDir>#<hostname> --impure [--use-remote-sudo]`
///
/// The hostname is lower-cased to match the flake's `nixosConfigurations`
/// attribute. `as_root` suppresses the `sudo` prefix.
pub fn system_switch(
    record: &SessionRecord,
    programs: &Programs,
    env: &EnvProjection,
    privilege: Privilege,
    as_root: bool,
) -> CommandSpec {
    let host = record.hostname.to_lowercase();
    let mut cmd = CommandSpec::new(&programs.nixos_rebuild)
        .arg("switch")
        .flag_with_value("--flake", flake_ref(record, &host))
        .arg("--impure")
        .with_env(env);

    match privilege {
        Privilege::Sudo if !as_root => cmd = cmd.under_sudo(&programs.sudo),
        Privilege::RemoteSudo => cmd = cmd.arg("--use-remote-sudo"),
        Privilege::Sudo | Privilege::None => {}
    }
    cmd
}

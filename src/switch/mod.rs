//! Switch orchestration.
//!
//! One invocation runs at most an update, then a system switch, then a user
//! switch, strictly in that order:
//!
//! ```text
//! Idle -> EnvProjected -> [SystemSwitching] -> UserSwitching -> Done
//! ```
//!
//! Every command must succeed; the first failure ends the invocation with
//! no retry and no rollback.

pub mod command;
pub mod runner;

pub use command::CommandSpec;
pub use runner::{CommandRunner, DryRunRunner, ProcessRunner};

use crate::config::{Privilege, Programs, Settings};
use crate::env::EnvProjection;
use crate::session::SessionRecord;
use crate::{Error, Result};
use serde::Serialize;

/// What the operator asked to switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// User configuration only
    Default,
    /// System, then user
    All,
    /// System, then user; required by a desktop change
    ForcedSystem,
}

/// Which switches an invocation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwitchPlan {
    pub run_system: bool,
    pub run_user: bool,
}

/// The user switch always runs; the system switch runs for `All` and
/// `ForcedSystem`.
pub fn decide(scope: Scope) -> SwitchPlan {
    SwitchPlan {
        run_system: matches!(scope, Scope::All | Scope::ForcedSystem),
        run_user: true,
    }
}

/// Settings the orchestrator needs, split out of [`Settings`].
#[derive(Debug, Clone)]
pub struct SwitchSettings {
    pub programs: Programs,
    pub privilege: Privilege,
    /// `false` for per-user setups with no system configuration
    pub system_switch: bool,
    /// Already root, so `sudo` is not needed
    pub as_root: bool,
}

impl SwitchSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            programs: settings.programs.clone(),
            privilege: settings.privilege,
            system_switch: settings.system_switch,
            as_root: crate::sys::is_root(),
        }
    }
}

/// Sequences external commands for one invocation.
pub struct SwitchOrchestrator<R> {
    settings: SwitchSettings,
    runner: R,
}

impl<R: CommandRunner> SwitchOrchestrator<R> {
    pub fn new(settings: SwitchSettings, runner: R) -> Self {
        Self { settings, runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// The plan for `scope` under this setup's variant.
    pub fn plan(&self, scope: Scope) -> SwitchPlan {
        let plan = self.effective_plan(scope);
        if decide(scope).run_system && !plan.run_system {
            tracing::warn!("system switch requested but disabled in config; switching user only");
        }
        plan
    }

    fn effective_plan(&self, scope: Scope) -> SwitchPlan {
        let mut plan = decide(scope);
        plan.run_system &= self.settings.system_switch;
        plan
    }

    /// Project the record's environment and run the switches for `scope`.
    pub fn switch(&mut self, record: &SessionRecord, scope: Scope) -> Result<SwitchPlan> {
        let plan = self.plan(scope);
        check_record(record, plan)?;

        let env = EnvProjection::project(record);
        tracing::debug!(vars = env.len(), "projected environment");

        if plan.run_system {
            let cmd = command::system_switch(
                record,
                &self.settings.programs,
                &env,
                self.settings.privilege,
                self.settings.as_root,
            );
            self.runner.run(&cmd)?;
        }
        if plan.run_user {
            let cmd = command::user_switch(record, &self.settings.programs, &env);
            self.runner.run(&cmd)?;
        }
        Ok(plan)
    }

    /// Switch to `environment` and return the record to persist.
    ///
    /// The input record is left untouched. On success the returned record
    /// carries the new desktop environment and an empty theme; on failure
    /// nothing changes and there is nothing to persist.
    pub fn switch_desktop(
        &mut self,
        record: &SessionRecord,
        environment: &str,
    ) -> Result<SessionRecord> {
        let environment = environment.trim();
        if environment.is_empty() {
            return Err(Error::MissingArgument("desktop environment".to_string()));
        }

        let mut next = record.clone();
        next.desktop_environment = environment.to_string();
        self.switch(&next, Scope::ForcedSystem)?;

        next.theme.clear();
        Ok(next)
    }

    /// Refresh the flake inputs, then switch system and user.
    pub fn update_then_switch(&mut self, record: &SessionRecord) -> Result<SwitchPlan> {
        check_record(record, self.effective_plan(Scope::All))?;
        let cmd = command::update(record, &self.settings.programs);
        self.runner.run(&cmd)?;
        self.switch(record, Scope::All)
    }
}

/// Fail before spawning anything if the record cannot name a flake output.
///
/// Older session files may lack `username` or `hostname`, which would
/// otherwise produce a dangling `<flakeDir>#` reference.
fn check_record(record: &SessionRecord, plan: SwitchPlan) -> Result<()> {
    let missing = |field: &str| Error::MissingArgument(format!("{} in session record", field));
    if record.flake_dir.trim().is_empty() {
        return Err(missing("flakeDir"));
    }
    if plan.run_system && record.hostname.trim().is_empty() {
        return Err(missing("hostname"));
    }
    if plan.run_user && record.username.trim().is_empty() {
        return Err(missing("username"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every command; fails the first one whose program matches.
    #[derive(Default)]
    struct FakeRunner {
        ran: Vec<CommandSpec>,
        fail_on: Option<String>,
    }

    impl CommandRunner for FakeRunner {
        fn run(&mut self, spec: &CommandSpec) -> Result<()> {
            self.ran.push(spec.clone());
            if self.fail_on.as_deref() == Some(spec.program.as_str()) {
                return Err(Error::CommandFailed {
                    program: spec.program.clone(),
                    status: "exit code 1".into(),
                });
            }
            Ok(())
        }
    }

    fn settings() -> SwitchSettings {
        SwitchSettings {
            programs: Programs::default(),
            privilege: Privilege::None,
            system_switch: true,
            as_root: false,
        }
    }

    fn record() -> SessionRecord {
        SessionRecord {
            hostname: "nixbox".into(),
            username: "robert".into(),
            flake_dir: "/flake".into(),
            theme: "dark".into(),
            ..Default::default()
        }
    }

    fn programs(runner: &FakeRunner) -> Vec<&str> {
        runner.ran.iter().map(|c| c.program.as_str()).collect()
    }

    #[test]
    fn test_decide_table() {
        assert_eq!(
            decide(Scope::Default),
            SwitchPlan {
                run_system: false,
                run_user: true
            }
        );
        assert_eq!(
            decide(Scope::All),
            SwitchPlan {
                run_system: true,
                run_user: true
            }
        );
        assert_eq!(
            decide(Scope::ForcedSystem),
            SwitchPlan {
                run_system: true,
                run_user: true
            }
        );
    }

    #[test]
    fn test_default_switch_runs_user_only() {
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        orch.switch(&record(), Scope::Default).unwrap();
        assert_eq!(programs(orch.runner()), vec!["home-manager"]);
    }

    #[test]
    fn test_all_runs_system_before_user() {
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        orch.switch(&record(), Scope::All).unwrap();
        assert_eq!(programs(orch.runner()), vec!["nixos-rebuild", "home-manager"]);
    }

    #[test]
    fn test_system_failure_stops_before_user() {
        let runner = FakeRunner {
            fail_on: Some("nixos-rebuild".into()),
            ..Default::default()
        };
        let mut orch = SwitchOrchestrator::new(settings(), runner);
        assert!(orch.switch(&record(), Scope::All).is_err());
        assert_eq!(programs(orch.runner()), vec!["nixos-rebuild"]);
    }

    #[test]
    fn test_per_user_variant_never_runs_system() {
        let mut s = settings();
        s.system_switch = false;
        let mut orch = SwitchOrchestrator::new(s, FakeRunner::default());
        let plan = orch.switch(&record(), Scope::ForcedSystem).unwrap();
        assert!(!plan.run_system);
        assert_eq!(programs(orch.runner()), vec!["home-manager"]);
    }

    #[test]
    fn test_switch_desktop_success_clears_theme() {
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        let original = record();
        let next = orch.switch_desktop(&original, "gnome").unwrap();

        assert_eq!(next.desktop_environment, "gnome");
        assert_eq!(next.theme, "");
        assert_eq!(original.theme, "dark");
        assert_eq!(programs(orch.runner()), vec!["nixos-rebuild", "home-manager"]);
    }

    #[test]
    fn test_switch_desktop_projects_new_environment_and_old_theme() {
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        orch.switch_desktop(&record(), "gnome").unwrap();

        for cmd in &orch.runner().ran {
            assert_eq!(cmd.env.get("DESKTOP_ENVIRONMENT"), Some("gnome"));
            assert_eq!(cmd.env.get("THEME"), Some("dark"));
        }
    }

    #[test]
    fn test_switch_desktop_failure_changes_nothing() {
        let runner = FakeRunner {
            fail_on: Some("home-manager".into()),
            ..Default::default()
        };
        let mut orch = SwitchOrchestrator::new(settings(), runner);
        let original = record();
        let result = orch.switch_desktop(&original, "gnome");

        assert!(matches!(result, Err(Error::CommandFailed { .. })));
        assert_eq!(original.theme, "dark");
        assert_eq!(original.desktop_environment, "");
    }

    #[test]
    fn test_switch_desktop_requires_name() {
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        let result = orch.switch_desktop(&record(), "  ");
        assert!(matches!(result, Err(Error::MissingArgument(_))));
        assert!(orch.runner().ran.is_empty());
    }

    #[test]
    fn test_record_without_username_runs_nothing() {
        let record: SessionRecord =
            serde_json::from_str(r#"{"hostname":"x","flakeDir":"/f"}"#).unwrap();
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());

        for scope in [Scope::Default, Scope::All] {
            match orch.switch(&record, scope) {
                Err(Error::MissingArgument(what)) => {
                    assert_eq!(what, "username in session record")
                }
                other => panic!("expected MissingArgument, got {:?}", other),
            }
        }
        assert!(orch.update_then_switch(&record).is_err());
        assert!(orch.runner().ran.is_empty());
    }

    #[test]
    fn test_record_without_hostname() {
        let record: SessionRecord =
            serde_json::from_str(r#"{"username":"robert","flakeDir":"/f"}"#).unwrap();
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());

        let result = orch.switch(&record, Scope::All);
        assert!(matches!(result, Err(Error::MissingArgument(ref w)) if w == "hostname in session record"));
        assert!(orch.runner().ran.is_empty());

        // A user-only switch does not need the hostname.
        orch.switch(&record, Scope::Default).unwrap();
        assert_eq!(programs(orch.runner()), vec!["home-manager"]);
    }

    #[test]
    fn test_record_without_flake_dir() {
        let record = SessionRecord {
            flake_dir: String::new(),
            ..record()
        };
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        assert!(orch.switch(&record, Scope::Default).is_err());
        assert!(orch.runner().ran.is_empty());
    }

    #[test]
    fn test_update_then_switch_order() {
        let mut orch = SwitchOrchestrator::new(settings(), FakeRunner::default());
        let plan = orch.update_then_switch(&record()).unwrap();
        assert!(plan.run_system && plan.run_user);
        assert_eq!(
            programs(orch.runner()),
            vec!["nix", "nixos-rebuild", "home-manager"]
        );
    }

    #[test]
    fn test_update_failure_skips_switch() {
        let runner = FakeRunner {
            fail_on: Some("nix".into()),
            ..Default::default()
        };
        let mut orch = SwitchOrchestrator::new(settings(), runner);
        assert!(orch.update_then_switch(&record()).is_err());
        assert_eq!(programs(orch.runner()), vec!["nix"]);
    }

    #[test]
    fn test_runs_through_mut_reference() {
        let mut runner = DryRunRunner::default();
        {
            let mut orch = SwitchOrchestrator::new(settings(), &mut runner);
            orch.switch(&record(), Scope::Default).unwrap();
        }
        assert_eq!(runner.planned.len(), 1);
    }
}

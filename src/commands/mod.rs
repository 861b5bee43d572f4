//! Command implementations for the nxm CLI.
//!
//! One function per subcommand. Each loads what it needs through a
//! [`Context`], does its work and returns a result implementing [`Output`].
//! Nothing here prints, except child process output streamed by the
//! [`ProcessRunner`].

use crate::config::{ConfigOverrides, Settings, resolve_settings};
use crate::modules::{self, ModuleCatalog, ModuleStatus, Notice};
use crate::session::{self, SessionRecord, SessionStore};
use crate::switch::{
    CommandRunner, CommandSpec, DryRunRunner, ProcessRunner, Scope, SwitchOrchestrator,
    SwitchPlan, SwitchSettings,
};
use crate::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Resolved settings plus the bootstrapped session for one invocation.
#[derive(Debug)]
pub struct Context {
    pub settings: Settings,
    pub store: SessionStore,
    pub record: SessionRecord,
}

impl Context {
    /// Resolve settings, bootstrap the session file if needed, then load it.
    pub fn open(overrides: &ConfigOverrides) -> Result<Self> {
        let settings = resolve_settings(overrides)?;
        Self::open_with_settings(settings)
    }

    pub fn open_with_settings(settings: Settings) -> Result<Self> {
        let store = SessionStore::new(&settings.app_dir);
        store.bootstrap()?;
        let record = store.load()?;
        Ok(Self {
            settings,
            store,
            record,
        })
    }

    fn flake_dir(&self) -> PathBuf {
        PathBuf::from(&self.record.flake_dir)
    }

    fn catalog(&self) -> Result<ModuleCatalog> {
        ModuleCatalog::discover(&self.flake_dir(), &self.settings.modules_dir)
    }

    fn switch_settings(&self) -> SwitchSettings {
        SwitchSettings::from_settings(&self.settings)
    }
}

fn to_json_string<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

// === read ===

/// A session record as read from disk.
#[derive(Debug)]
pub struct ReadResult {
    pub path: PathBuf,
    pub record: SessionRecord,
}

impl Output for ReadResult {
    /// The stored representation: 4-space indented JSON.
    fn to_json(&self) -> String {
        session::to_json_pretty(&self.record)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .unwrap_or_else(|| to_json_string(&self.record))
    }

    fn to_human(&self) -> String {
        format!("{}\n{}", self.path.display(), self.record.to_human())
    }
}

/// Show a session record: `path`, or the active session when `None`.
pub fn read(ctx: &Context, path: Option<&Path>) -> Result<ReadResult> {
    match path {
        Some(path) => Ok(ReadResult {
            path: path.to_path_buf(),
            record: session::load_record(path)?,
        }),
        None => Ok(ReadResult {
            path: ctx.store.path().to_path_buf(),
            record: ctx.record.clone(),
        }),
    }
}

// === module ===

#[derive(Debug, Serialize)]
pub struct ModuleListResult {
    pub modules: Vec<ModuleStatus>,
}

impl Output for ModuleListResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.modules.is_empty() {
            return "No modules found.".to_string();
        }
        self.modules
            .iter()
            .map(|m| format!("[{}] {}", if m.enabled { "x" } else { " " }, m.module))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List every discoverable module with its enabled flag.
pub fn module_list(ctx: &Context) -> Result<ModuleListResult> {
    let catalog = ctx.catalog()?;
    Ok(ModuleListResult {
        modules: modules::list_status(&catalog, &ctx.record),
    })
}

#[derive(Debug, Serialize)]
pub struct ModuleChangeResult {
    pub action: &'static str,
    pub changed: Vec<String>,
    pub notices: Vec<Notice>,
    pub enabled_modules: Vec<String>,
}

impl Output for ModuleChangeResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self.notices.iter().map(|n| format!("Note: {}", n)).collect();
        for module in &self.changed {
            lines.push(format!("{} {}", self.action, module));
        }
        if self.enabled_modules.is_empty() {
            lines.push("Enabled modules: (none)".to_string());
        } else {
            lines.push(format!("Enabled modules: {}", self.enabled_modules.join(", ")));
        }
        lines.join("\n")
    }
}

/// Enable modules by bare name and persist the session.
pub fn module_enable(ctx: &mut Context, names: &[String]) -> Result<ModuleChangeResult> {
    let resolved = ctx.catalog()?.resolve(names)?;
    let outcome = modules::enable(&mut ctx.record, &resolved);
    ctx.store.save(&ctx.record)?;
    tracing::info!(changed = ?outcome.changed, "enabled modules");
    Ok(ModuleChangeResult {
        action: "Enabled",
        changed: outcome.changed,
        notices: outcome.notices,
        enabled_modules: ctx.record.enabled_modules.clone(),
    })
}

/// Disable modules by bare name and persist the session.
pub fn module_disable(ctx: &mut Context, names: &[String]) -> Result<ModuleChangeResult> {
    let resolved = ctx.catalog()?.resolve(names)?;
    let outcome = modules::disable(&mut ctx.record, &resolved);
    ctx.store.save(&ctx.record)?;
    tracing::info!(changed = ?outcome.changed, "disabled modules");
    Ok(ModuleChangeResult {
        action: "Disabled",
        changed: outcome.changed,
        notices: outcome.notices,
        enabled_modules: ctx.record.enabled_modules.clone(),
    })
}

// === switch / desktop / update ===

#[derive(Debug, Serialize)]
pub struct PlannedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: serde_json::Map<String, serde_json::Value>,
}

impl From<&CommandSpec> for PlannedCommand {
    fn from(spec: &CommandSpec) -> Self {
        Self {
            program: spec.program.clone(),
            args: spec.args.clone(),
            env: spec
                .env
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
                .collect(),
        }
    }
}

/// Outcome of any command that runs (or would run) external switches.
#[derive(Debug, Serialize)]
pub struct SwitchResult {
    pub dry_run: bool,
    pub updated: bool,
    pub system: bool,
    pub user: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desktop_environment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<PlannedCommand>,
    #[serde(skip)]
    lines: Vec<String>,
}

impl SwitchResult {
    fn new(dry_run: bool, updated: bool, plan: SwitchPlan, runner: Option<DryRunRunner>) -> Self {
        let planned = runner.map(|r| r.planned).unwrap_or_default();
        Self {
            dry_run,
            updated,
            system: plan.run_system,
            user: plan.run_user,
            desktop_environment: None,
            commands: planned.iter().map(PlannedCommand::from).collect(),
            lines: planned.iter().map(CommandSpec::display_line).collect(),
        }
    }
}

impl Output for SwitchResult {
    fn to_json(&self) -> String {
        to_json_string(self)
    }

    fn to_human(&self) -> String {
        if self.dry_run {
            return self.lines.join("\n");
        }
        let mut lines = Vec::new();
        if self.updated {
            lines.push("Updated flake inputs".to_string());
        }
        if self.system {
            lines.push("Switched system configuration".to_string());
        }
        if self.user {
            lines.push("Switched home-manager configuration".to_string());
        }
        if let Some(ref de) = self.desktop_environment {
            lines.push(format!("Desktop environment: {}", de));
        }
        lines.join("\n")
    }
}

/// Run `op` against a real or recording runner, depending on `dry_run`.
fn with_runner<T>(
    ctx: &Context,
    dry_run: bool,
    op: impl FnOnce(&mut SwitchOrchestrator<&mut dyn CommandRunner>) -> Result<T>,
) -> Result<(T, Option<DryRunRunner>)> {
    let mut recorder = DryRunRunner::default();
    let mut process = ProcessRunner;
    let runner: &mut dyn CommandRunner = if dry_run {
        &mut recorder
    } else {
        &mut process
    };

    let mut orch = SwitchOrchestrator::new(ctx.switch_settings(), runner);
    let value = op(&mut orch)?;
    drop(orch);

    Ok((value, dry_run.then_some(recorder)))
}

/// Apply the user configuration, or system and user with `all`.
pub fn switch(ctx: &Context, all: bool, dry_run: bool) -> Result<SwitchResult> {
    let scope = if all { Scope::All } else { Scope::Default };
    let (plan, runner) = with_runner(ctx, dry_run, |orch| orch.switch(&ctx.record, scope))?;
    Ok(SwitchResult::new(dry_run, false, plan, runner))
}

/// Switch desktop environment. The session is saved, with the theme
/// cleared, only after every switch succeeded and never on a dry run.
pub fn desktop(ctx: &mut Context, environment: &str, dry_run: bool) -> Result<SwitchResult> {
    let ((next, plan), runner) = with_runner(ctx, dry_run, |orch| {
        let next = orch.switch_desktop(&ctx.record, environment)?;
        Ok((next, orch.plan(Scope::ForcedSystem)))
    })?;

    if !dry_run {
        ctx.store.save(&next)?;
        tracing::info!(desktop = %next.desktop_environment, "desktop environment switched");
        ctx.record = next;
    }

    let mut result = SwitchResult::new(dry_run, false, plan, runner);
    result.desktop_environment = Some(environment.trim().to_string());
    Ok(result)
}

/// Update flake inputs, then switch system and user.
pub fn update(ctx: &Context, dry_run: bool) -> Result<SwitchResult> {
    let (plan, runner) = with_runner(ctx, dry_run, |orch| orch.update_then_switch(&ctx.record))?;
    Ok(SwitchResult::new(dry_run, true, plan, runner))
}

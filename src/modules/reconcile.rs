//! Enable/disable reconciliation of the session's module set.

use super::catalog::ModuleCatalog;
use crate::session::SessionRecord;
use serde::Serialize;
use std::collections::HashSet;

/// A non-fatal observation made while reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "module", rename_all = "snake_case")]
pub enum Notice {
    AlreadyEnabled(String),
    AlreadyDisabled(String),
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::AlreadyEnabled(m) => write!(f, "{} is already enabled", m),
            Notice::AlreadyDisabled(m) => write!(f, "{} is already disabled", m),
        }
    }
}

/// What a reconciliation call changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reconciliation {
    /// Modules added or removed, in request order
    pub changed: Vec<String>,
    pub notices: Vec<Notice>,
}

/// One catalog entry with its enabled flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub module: String,
    pub enabled: bool,
}

/// Add each module not already enabled, appending in request order.
pub fn enable(record: &mut SessionRecord, modules: &[String]) -> Reconciliation {
    let mut outcome = Reconciliation::default();

    for module in modules {
        if record.is_enabled(module) {
            tracing::info!(module = %module, "module already enabled");
            outcome.notices.push(Notice::AlreadyEnabled(module.clone()));
        } else {
            record.enabled_modules.push(module.clone());
            outcome.changed.push(module.clone());
        }
    }

    outcome
}

/// Remove the given modules, keeping the order of the rest.
///
/// The new list is built by filtering the old one against the target set,
/// so removing neighbours in one call cannot skip an element.
pub fn disable(record: &mut SessionRecord, modules: &[String]) -> Reconciliation {
    let mut outcome = Reconciliation::default();
    let mut targets: HashSet<&str> = HashSet::with_capacity(modules.len());

    for module in modules {
        if !targets.insert(module.as_str()) {
            continue;
        }
        if record.is_enabled(module) {
            outcome.changed.push(module.clone());
        } else {
            tracing::info!(module = %module, "module already disabled");
            outcome.notices.push(Notice::AlreadyDisabled(module.clone()));
        }
    }

    record
        .enabled_modules
        .retain(|m| !targets.contains(m.as_str()));

    outcome
}

/// Pair every catalog entry with whether the record enables it.
pub fn list_status(catalog: &ModuleCatalog, record: &SessionRecord) -> Vec<ModuleStatus> {
    catalog
        .entries()
        .iter()
        .map(|module| ModuleStatus {
            module: module.clone(),
            enabled: record.is_enabled(module),
        })
        .collect()
}

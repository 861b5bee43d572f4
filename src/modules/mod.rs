//! Feature modules: discovery from the flake and enable/disable bookkeeping.
//!
//! A module is a `<name>.nix` file under the flake's module directory. The
//! session record stores enabled modules by file name; the flake reads them
//! back through `ENABLED_MODULES` (see [`crate::env`]).

pub mod catalog;
pub mod reconcile;

pub use catalog::{MODULE_SUFFIX, ModuleCatalog, RESERVED_MODULE, module_dir};
pub use reconcile::{ModuleStatus, Notice, Reconciliation, disable, enable, list_status};

//! Configuration for nxm.
//!
//! Two files live in `<config-root>/nxm/`:
//!
//! - `session.json`: the session record (see [`crate::session`]), owned and
//!   rewritten by nxm.
//! - `config.kdl`: optional tool preferences, written by the operator and
//!   only ever read by nxm.
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    APP_DIR_NAME, CONFIG_DIR_ENV, ConfigOverrides, DEFAULT_MODULES_DIR, Programs, Settings,
    ValueSource, resolve_app_dir, resolve_settings,
};
pub use schema::{NxmConfig, Privilege};

//! Module discovery and name resolution.

use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File suffix of a module definition.
pub const MODULE_SUFFIX: &str = ".nix";

/// Scaffold entry in the module directory, never selectable.
pub const RESERVED_MODULE: &str = "default.nix";

/// The module identifiers available at one point in time.
///
/// Entries are file names (`gaming.nix`) in directory enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleCatalog {
    entries: Vec<String>,
}

impl ModuleCatalog {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// List `<flake_dir>/<modules_dir>/*.nix`, minus `default.nix`.
    pub fn discover(flake_dir: &Path, modules_dir: &str) -> Result<Self> {
        let dir = module_dir(flake_dir, modules_dir);
        let read_dir = fs::read_dir(&dir).map_err(|source| Error::ModuleDir {
            path: dir.clone(),
            source,
        })?;

        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| Error::ModuleDir {
                path: dir.clone(),
                source,
            })?;

            let Ok(name) = entry.file_name().into_string() else {
                tracing::warn!(
                    path = %entry.path().display(),
                    "skipping module file with non UTF-8 name"
                );
                continue;
            };
            if !name.ends_with(MODULE_SUFFIX) || name == RESERVED_MODULE {
                continue;
            }
            // Follows symlinks, so linked module files count.
            if !entry.path().is_file() {
                continue;
            }
            entries.push(name);
        }

        tracing::debug!(dir = %dir.display(), count = entries.len(), "discovered modules");
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Map bare names (`gaming`) to catalog entries (`gaming.nix`).
    ///
    /// Matching is case-insensitive. A trailing `.nix` on the requested name
    /// is accepted. Resolution is all-or-nothing: the first unknown name
    /// fails the whole call, and so does any name that matches more than
    /// one entry.
    pub fn resolve<S: AsRef<str>>(&self, requested: &[S]) -> Result<Vec<String>> {
        let mut resolved = Vec::with_capacity(requested.len());

        for name in requested {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(Error::MissingArgument("module name".to_string()));
            }

            let stem = strip_suffix_ignore_case(name, MODULE_SUFFIX);
            let wanted = format!("{}{}", stem, MODULE_SUFFIX);
            let before = resolved.len();
            resolved.extend(
                self.entries
                    .iter()
                    .filter(|entry| entry.eq_ignore_ascii_case(&wanted))
                    .cloned(),
            );

            if resolved.len() == before {
                return Err(Error::UnknownModule(name.to_string()));
            }
        }

        if resolved.len() != requested.len() {
            return Err(Error::ResolutionMismatch {
                requested: requested.len(),
                resolved: resolved.len(),
            });
        }

        Ok(resolved)
    }
}

/// `<flake_dir>/<modules_dir>`
pub fn module_dir(flake_dir: &Path, modules_dir: &str) -> PathBuf {
    flake_dir.join(modules_dir)
}

fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> &'a str {
    let split = name.len().saturating_sub(suffix.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(tail)) if !stem.is_empty() && tail.eq_ignore_ascii_case(suffix) => stem,
        _ => name,
    }
}

//! Session storage.
//!
//! The session record lives at `<config-root>/nxm/session.json` as one
//! indented JSON object. It is bootstrapped on first run, loaded at the start
//! of every invocation and rewritten only by commands that change it.
//!
//! The file is not locked. Two invocations that both save race, and the last
//! writer wins.

mod record;

pub use record::SessionRecord;

use crate::{Error, Result, sys};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SESSION_FILE_NAME: &str = "session.json";

/// Directory under `$HOME` used as the default flake location.
pub const DEFAULT_FLAKE_DIR_NAME: &str = "nixos-config";

/// Permissions for session.json (Unix: 0644, readable by all).
#[cfg(unix)]
pub const SESSION_FILE_MODE: u32 = 0o644;

/// Reads and writes the session record at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store for `session.json` inside `app_dir`.
    pub fn new(app_dir: &Path) -> Self {
        Self {
            path: app_dir.join(SESSION_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the session file from the running system if it is absent.
    ///
    /// Returns `true` if a new record was written. An existing file is never
    /// touched, whatever its content.
    pub fn bootstrap(&self) -> Result<bool> {
        self.bootstrap_with(system_record)
    }

    /// Like [`bootstrap`](Self::bootstrap), with the initial record supplied
    /// by `seed`. `seed` only runs when the file is absent.
    pub fn bootstrap_with<F>(&self, seed: F) -> Result<bool>
    where
        F: FnOnce() -> Result<SessionRecord>,
    {
        match fs::metadata(&self.path) {
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io(e)),
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let record = seed()?;
        self.save(&record)?;
        tracing::info!(path = %self.path.display(), "bootstrapped session");
        Ok(true)
    }

    /// Read and parse the session record.
    pub fn load(&self) -> Result<SessionRecord> {
        load_record(&self.path)
    }

    /// Write the record, replacing any existing file.
    ///
    /// The record is written to a temporary file next to the target and
    /// renamed over it, so a failed write leaves the previous file intact.
    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(&to_json_pretty(record)?)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(SESSION_FILE_MODE))?;
        }

        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!(path = %self.path.display(), "saved session");
        Ok(())
    }
}

/// Read and parse a session record from any path.
pub fn load_record(path: &Path) -> Result<SessionRecord> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|source| Error::MalformedSession {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a record the way it is stored: 4-space indented JSON.
pub fn to_json_pretty(record: &SessionRecord) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record.serialize(&mut ser)?;
    Ok(buf)
}

/// The record a first run starts from.
fn system_record() -> Result<SessionRecord> {
    let home = dirs::home_dir().ok_or(Error::NoHomeDir)?;
    let flake_dir = home.join(DEFAULT_FLAKE_DIR_NAME);
    Ok(SessionRecord::bootstrap(
        sys::hostname()?,
        sys::username()?,
        flake_dir.to_string_lossy().to_string(),
    ))
}

//! OS identity lookups: hostname, invoking user, and privilege detection.

use crate::{Error, Result};

/// Context information when running under sudo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SudoContext {
    /// The login name of the user who invoked sudo
    pub user: String,
}

/// Returns true when the effective UID is root.
#[cfg(unix)]
pub fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

/// Detects if the current process is running as root via sudo.
///
/// Returns `Some(SudoContext)` if the process is running as root (UID 0) and
/// `SUDO_USER` is set. A direct root login has no `SUDO_USER` and yields
/// `None`.
#[cfg(unix)]
pub fn detect_sudo_context() -> Option<SudoContext> {
    if !is_root() {
        return None;
    }

    let user = std::env::var("SUDO_USER").ok()?;
    Some(SudoContext { user })
}

#[cfg(not(unix))]
pub fn detect_sudo_context() -> Option<SudoContext> {
    // Sudo is a Unix concept, not applicable on Windows
    None
}

/// The machine's hostname, as reported by the OS.
#[cfg(unix)]
pub fn hostname() -> Result<String> {
    let name = nix::unistd::gethostname()
        .map_err(|e| Error::Identity(format!("hostname: {}", e)))?;
    name.into_string()
        .map_err(|_| Error::Identity("hostname: not valid UTF-8".to_string()))
}

#[cfg(not(unix))]
pub fn hostname() -> Result<String> {
    std::env::var("COMPUTERNAME").map_err(|_| Error::Identity("hostname".to_string()))
}

/// The login name of the user this invocation acts on behalf of.
///
/// Under sudo this is the invoking user rather than root.
pub fn username() -> Result<String> {
    let sudo_user = detect_sudo_context().map(|ctx| ctx.user);
    let env_user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok();

    if let Some(name) = pick_username(sudo_user, env_user) {
        return Ok(name);
    }
    username_from_uid()
}

/// Prefer the sudo caller, then the environment; blanks count as unset.
fn pick_username(sudo_user: Option<String>, env_user: Option<String>) -> Option<String> {
    sudo_user
        .into_iter()
        .chain(env_user)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

#[cfg(unix)]
fn username_from_uid() -> Result<String> {
    let uid = nix::unistd::getuid();
    match nix::unistd::User::from_uid(uid) {
        Ok(Some(user)) => Ok(user.name),
        Ok(None) => Err(Error::Identity(format!("user name for uid {}", uid))),
        Err(e) => Err(Error::Identity(format!("user name for uid {}: {}", uid, e))),
    }
}

#[cfg(not(unix))]
fn username_from_uid() -> Result<String> {
    Err(Error::Identity("user name".to_string()))
}

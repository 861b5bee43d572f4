//! Common test utilities for nxm integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never touch the
//! user's real `~/.config/nxm/` or flake.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// User name every test invocation runs as.
pub const TEST_USER: &str = "tester";

/// A test environment with isolated config and home directories.
///
/// - `config_dir`: config root, passed via `NXM_CONFIG_DIR`
/// - `home_dir`: `$HOME`, so the bootstrapped flake dir is
///   `<home_dir>/nixos-config`
///
/// The `nxm()` method sets both per invocation, making tests parallel-safe.
pub struct TestEnv {
    pub config_dir: TempDir,
    pub home_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().unwrap(),
            home_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and bootstrap the session.
    pub fn init() -> Self {
        let env = Self::new();
        env.nxm().arg("read").assert().success();
        env
    }

    /// Get a Command for the nxm binary with isolated directories.
    pub fn nxm(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_nxm"));
        cmd.current_dir(self.home_dir.path());
        cmd.env("NXM_CONFIG_DIR", self.config_dir.path());
        cmd.env("HOME", self.home_dir.path());
        cmd.env("USER", TEST_USER);
        cmd.env_remove("SUDO_USER");
        cmd.env_remove("NXM_LOG");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// `<config_dir>/nxm`
    pub fn app_dir(&self) -> PathBuf {
        self.config_dir.path().join("nxm")
    }

    pub fn session_path(&self) -> PathBuf {
        self.app_dir().join("session.json")
    }

    /// The default flake location for this environment.
    pub fn flake_dir(&self) -> PathBuf {
        self.home_dir.path().join("nixos-config")
    }

    /// Create `<flake>/modules/<name>` for each name.
    pub fn add_modules(&self, names: &[&str]) {
        let dir = self.flake_dir().join("modules");
        fs::create_dir_all(&dir).unwrap();
        for name in names {
            fs::write(dir.join(name), "{ ... }: { }\n").unwrap();
        }
    }

    pub fn read_session(&self) -> serde_json::Value {
        let text = fs::read_to_string(self.session_path()).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    pub fn session_text(&self) -> String {
        fs::read_to_string(self.session_path()).unwrap()
    }

    pub fn write_session(&self, value: &serde_json::Value) {
        fs::create_dir_all(self.app_dir()).unwrap();
        fs::write(
            self.session_path(),
            serde_json::to_string_pretty(value).unwrap(),
        )
        .unwrap();
    }

    pub fn write_config(&self, kdl: &str) {
        fs::create_dir_all(self.app_dir()).unwrap();
        fs::write(self.app_dir().join("config.kdl"), kdl).unwrap();
    }

    /// Point every external program at `true` or `false`.
    pub fn use_programs(&self, succeed: bool) {
        let program = if succeed { "true" } else { "false" };
        self.write_config(&format!(
            "privilege \"none\"\nhome-manager \"{p}\"\nnixos-rebuild \"{p}\"\nnix \"{p}\"\n",
            p = program
        ));
    }

    pub fn home_path(&self) -> &Path {
        self.home_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

//! Integration tests for `nxm switch`, `nxm desktop` and `nxm update`.
//!
//! External programs are replaced with `true` / `false` through config.kdl,
//! or not run at all with `--dry-run`.

#![cfg(unix)]

mod common;

use common::{TEST_USER, TestEnv};
use predicates::prelude::*;
use serde_json::json;

fn dry_run_programs(env: &TestEnv, args: &[&str]) -> Vec<String> {
    let output = env.nxm().args(args).arg("--dry-run").output().unwrap();
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["dry_run"], true);
    parsed["commands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["program"].as_str().unwrap().to_string())
        .collect()
}

fn set_theme(env: &TestEnv, theme: &str) {
    let mut session = env.read_session();
    session["theme"] = json!(theme);
    env.write_session(&session);
}

#[test]
fn test_switch_default_is_user_only() {
    let env = TestEnv::init();
    env.write_config("privilege \"none\"\n");
    assert_eq!(dry_run_programs(&env, &["switch"]), vec!["home-manager"]);
}

#[test]
fn test_switch_all_runs_system_then_user() {
    let env = TestEnv::init();
    env.write_config("privilege \"none\"\n");
    assert_eq!(
        dry_run_programs(&env, &["switch", "all"]),
        vec!["nixos-rebuild", "home-manager"]
    );
}

#[test]
fn test_switch_dry_run_human_shows_command_and_env() {
    let env = TestEnv::init();
    env.add_modules(&["gaming.nix"]);
    env.nxm()
        .args(["module", "enable", "gaming"])
        .assert()
        .success();

    let flake_ref = format!("{}#{}", env.flake_dir().display(), TEST_USER);
    env.nxm()
        .args(["switch", "--dry-run", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("home-manager switch --flake"))
        .stdout(predicate::str::contains(flake_ref))
        .stdout(predicate::str::contains("--impure"))
        .stdout(predicate::str::contains("ENABLED_MODULES='[gaming.nix]'"));
}

#[test]
fn test_switch_all_uses_lowercase_hostname() {
    let env = TestEnv::init();
    env.write_config("privilege \"none\"\n");
    let mut session = env.read_session();
    session["hostname"] = json!("NixBox");
    env.write_session(&session);

    let output = env
        .nxm()
        .args(["switch", "all", "--dry-run"])
        .output()
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let system_args = parsed["commands"][0]["args"].as_array().unwrap();
    assert!(system_args[2].as_str().unwrap().ends_with("#nixbox"));
}

#[test]
fn test_per_user_variant_skips_system() {
    let env = TestEnv::init();
    env.write_config("system-switch #false\n");
    assert_eq!(
        dry_run_programs(&env, &["switch", "all"]),
        vec!["home-manager"]
    );
}

#[test]
fn test_remote_sudo_variant() {
    let env = TestEnv::init();
    env.write_config("privilege \"remote-sudo\"\n");
    let output = env
        .nxm()
        .args(["switch", "all", "--dry-run", "-H"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--use-remote-sudo"));
    assert!(!stdout.contains("sudo --preserve-env"));
}

#[test]
fn test_update_dry_run_order() {
    let env = TestEnv::init();
    env.write_config("privilege \"none\"\n");
    assert_eq!(
        dry_run_programs(&env, &["update"]),
        vec!["nix", "nixos-rebuild", "home-manager"]
    );
}

#[test]
fn test_switch_runs_programs() {
    let env = TestEnv::init();
    env.use_programs(true);
    env.nxm()
        .args(["switch", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"system\":true"))
        .stdout(predicate::str::contains("\"user\":true"));
}

#[test]
fn test_switch_failure_is_fatal() {
    let env = TestEnv::init();
    env.use_programs(false);
    env.nxm()
        .arg("switch")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("false exited with exit code 1"));
}

#[test]
fn test_missing_program_is_fatal() {
    let env = TestEnv::init();
    env.write_config("home-manager \"nxm-no-such-program\"\n");
    env.nxm()
        .arg("switch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to run nxm-no-such-program"));
}

#[test]
fn test_child_output_is_streamed() {
    let env = TestEnv::init();
    env.write_config("privilege \"none\"\nhome-manager \"echo\"\n");
    env.nxm()
        .arg("switch")
        .assert()
        .success()
        .stdout(predicate::str::contains("switch --flake"));
}

#[test]
fn test_desktop_success_clears_theme() {
    let env = TestEnv::init();
    env.use_programs(true);
    set_theme(&env, "dark");

    env.nxm()
        .args(["desktop", "gnome"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"desktop_environment\":\"gnome\""));

    let session = env.read_session();
    assert_eq!(session["desktopEnvironment"], "gnome");
    assert_eq!(session["theme"], "");
}

#[test]
fn test_desktop_failure_changes_nothing() {
    let env = TestEnv::init();
    env.use_programs(false);
    set_theme(&env, "dark");
    let before = env.session_text();

    env.nxm()
        .args(["desktop", "gnome"])
        .assert()
        .failure()
        .code(1);

    assert_eq!(env.session_text(), before);
    let session = env.read_session();
    assert_eq!(session["desktopEnvironment"], "");
    assert_eq!(session["theme"], "dark");
}

#[test]
fn test_desktop_dry_run_changes_nothing() {
    let env = TestEnv::init();
    env.write_config("privilege \"none\"\n");
    set_theme(&env, "dark");
    let before = env.session_text();

    assert_eq!(
        dry_run_programs(&env, &["desktop", "kde"]),
        vec!["nixos-rebuild", "home-manager"]
    );
    assert_eq!(env.session_text(), before);
}

#[test]
fn test_desktop_requires_environment() {
    let env = TestEnv::init();
    env.nxm().arg("desktop").assert().failure();
}

#[test]
fn test_desktop_rejects_blank_environment() {
    let env = TestEnv::init();
    env.use_programs(true);
    env.nxm()
        .args(["desktop", " "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Missing argument: desktop environment"));
}

#[test]
fn test_session_without_username_is_rejected() {
    let env = TestEnv::init();
    env.use_programs(true);
    env.write_session(&json!({
        "hostname": "nixbox",
        "flakeDir": env.flake_dir().to_string_lossy(),
    }));

    env.nxm()
        .args(["switch", "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("username in session record"));
}

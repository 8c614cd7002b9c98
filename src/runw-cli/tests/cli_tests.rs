//! End-to-end tests for the `runw` binary that stop before the sandbox exec.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn runw(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("runw").unwrap();
    cmd.env("RUNW_CONFIG_DIR", config_dir)
        .env("XDG_RUNTIME_DIR", config_dir)
        .env_remove("RUST_LOG");
    cmd
}

fn config(profiles: &str, presets: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("runw.toml"), profiles).unwrap();
    fs::write(dir.path().join("presets.toml"), presets).unwrap();
    dir
}

#[test]
fn test_list_prints_sorted_profiles() {
    let dir = config(
        r#"
        [htop]
        command = ["htop"]

        [Firefox]
        description = "Web browser"
        command = ["firefox"]
        "#,
        "",
    );

    runw(dir.path())
        .arg("--list")
        .assert()
        .success()
        .stdout("firefox\tWeb browser\nhtop\t\n");
}

#[test]
fn test_list_shows_description_from_presets() {
    let dir = config(
        "[firefox]\nuse = [\"browser\"]\ncommand = [\"firefox\"]\n",
        "[browser]\ndescription = \"Sandboxed browser\"\n",
    );
    runw(dir.path())
        .arg("--list")
        .assert()
        .success()
        .stdout("firefox\tSandboxed browser\n");
}

#[test]
fn test_list_without_config_is_empty() {
    let dir = TempDir::new().unwrap();
    runw(&dir.path().join("missing"))
        .arg("-l")
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_xdg_config_home_is_used() {
    let xdg = TempDir::new().unwrap();
    fs::create_dir(xdg.path().join("runw")).unwrap();
    fs::write(
        xdg.path().join("runw/runw.toml"),
        "[mpv]\ndescription = \"Player\"\ncommand = [\"mpv\"]\n",
    )
    .unwrap();

    Command::cargo_bin("runw")
        .unwrap()
        .env_remove("RUNW_CONFIG_DIR")
        .env("XDG_CONFIG_HOME", xdg.path())
        .arg("--list")
        .assert()
        .success()
        .stdout("mpv\tPlayer\n");
}

#[test]
fn test_unknown_container_fails() {
    let dir = config("[htop]\ncommand = [\"htop\"]\n", "");
    runw(dir.path())
        .arg("firefox")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("error:").and(predicate::str::contains("firefox")));
}

#[test]
fn test_unknown_preset_fails() {
    let dir = config("[app]\nuse = [\"gpu\"]\ncommand = [\"app\"]\n", "");
    runw(dir.path())
        .arg("app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown preset 'gpu'"));
}

#[test]
fn test_cyclic_presets_fail() {
    let dir = config(
        "[app]\nuse = [\"a\"]\ncommand = [\"app\"]\n",
        "[a]\nuse = [\"b\"]\n\n[b]\nuse = [\"a\"]\n",
    );
    runw(dir.path())
        .arg("app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cyclic preset dependency"));
}

#[test]
fn test_malformed_config_fails() {
    let dir = config("[app]\nbinds = [{ src = \"/a\", mode = \"sideways\" }]\n", "");
    runw(dir.path())
        .arg("app")
        .assert()
        .failure()
        .stderr(predicate::str::contains("runw.toml"));
}

#[test]
fn test_empty_cmd_override_fails_before_launch() {
    let dir = config("[app]\nhome = \"$RUNW_CONFIG_DIR/home\"\ncommand = [\"app\"]\n", "");
    runw(dir.path())
        .args(["--cmd", "", "app"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
    assert!(!dir.path().join("home").exists());
}

#[test]
fn test_missing_container_argument_is_usage_error() {
    let dir = TempDir::new().unwrap();
    runw(dir.path()).assert().failure().code(2);
}

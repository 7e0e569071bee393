use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[allow(deprecated)]
fn modgraph_cmd(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("modgraph").unwrap();
    cmd.env("HOME", home)
        .env_remove("MODGRAPH_MODULEPATH")
        .env_remove("MODGRAPH_REGISTRY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_list_shows_installed_modules() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("modules");
    let dir = modules.join("apollo");
    fs::create_dir_all(&dir).unwrap();
    let metadata = json!({
        "name": "alice-apollo",
        "version": "0.0.2",
        "dependencies": [{ "name": "alice-java", "version_requirement": ">= 1.7.0" }],
    });
    fs::write(dir.join("metadata.json"), metadata.to_string()).unwrap();

    modgraph_cmd(tmp.path())
        .arg("list")
        .arg("--modulepath")
        .arg(&modules)
        .assert()
        .success()
        .stdout(predicate::str::contains("└─┬ alice-apollo (v0.0.2)"))
        .stdout(predicate::str::contains(
            "  └── UNMET DEPENDENCY alice-java (>= 1.7.0)",
        ));
}

#[test]
fn test_list_uses_config_modulepath() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("configured");
    fs::create_dir_all(&modules).unwrap();
    fs::create_dir_all(tmp.path().join(".modgraph")).unwrap();
    fs::write(
        tmp.path().join(".modgraph").join("config.toml"),
        format!("[paths]\nmodulepath = [{:?}]\n", modules.display().to_string()),
    )
    .unwrap();

    modgraph_cmd(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(modules.display().to_string()))
        .stdout(predicate::str::contains("(no modules installed)"));
}

#[test]
fn test_list_env_modulepath() {
    let tmp = TempDir::new().unwrap();
    let modules = tmp.path().join("from-env");
    fs::create_dir_all(&modules).unwrap();

    modgraph_cmd(tmp.path())
        .arg("list")
        .env("MODGRAPH_MODULEPATH", &modules)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(modules.display().to_string()));
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".modgraph")).unwrap();
    fs::write(tmp.path().join(".modgraph").join("config.toml"), "[paths\n").unwrap();

    modgraph_cmd(tmp.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

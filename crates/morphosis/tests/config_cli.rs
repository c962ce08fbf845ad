use std::fs;
use std::process::Command;

use tempfile::TempDir;

fn morphosis(home: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_morphosis"));
    command
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("HOME", home.path())
        .env_remove("MORPHOSIS_CONFIG")
        .env("RUST_LOG", "off");
    command
}

#[test]
fn config_show_prints_the_resolved_file() {
    let home = TempDir::new().unwrap();
    let scene = home.path().join("scene.toml");
    fs::write(&scene, "version = 1\n\n[sequence]\nseed = 4242\n").unwrap();

    let output = morphosis(&home)
        .args(["config", "show", "--config"])
        .arg(&scene)
        .output()
        .expect("failed to run morphosis config show");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("seed = 4242"), "{stdout}");
    assert!(stdout.contains("loaded from"), "{stdout}");
    assert!(stdout.contains(&home.path().join("assets").display().to_string()));
}

#[test]
fn config_show_reads_the_environment_variable() {
    let home = TempDir::new().unwrap();
    let scene = home.path().join("env.toml");
    fs::write(&scene, "version = 1\n\n[window]\ntitle = \"From Env\"\n").unwrap();

    let output = morphosis(&home)
        .env("MORPHOSIS_CONFIG", &scene)
        .args(["config", "show"])
        .output()
        .expect("failed to run morphosis config show");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("title = \"From Env\""), "{stdout}");
}

#[test]
fn config_show_without_a_file_prints_defaults() {
    let home = TempDir::new().unwrap();

    let output = morphosis(&home)
        .args(["config", "show"])
        .output()
        .expect("failed to run morphosis config show");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("# built-in defaults"), "{stdout}");
    assert!(stdout.contains("title = \"Morphosis\""), "{stdout}");
}

#[test]
fn config_show_rejects_an_invalid_file() {
    let home = TempDir::new().unwrap();
    let scene = home.path().join("bad.toml");
    fs::write(&scene, "version = 7\n").unwrap();

    let status = morphosis(&home)
        .args(["config", "show", "--config"])
        .arg(&scene)
        .status()
        .expect("failed to run morphosis config show");

    assert!(!status.success());
}

#[test]
fn config_where_points_at_config_toml() {
    let home = TempDir::new().unwrap();

    let output = morphosis(&home)
        .args(["config", "where"])
        .output()
        .expect("failed to run morphosis config where");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.trim_end().ends_with("config.toml (not present)"), "{stdout}");
}

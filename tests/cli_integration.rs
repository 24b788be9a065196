//! Integration tests for the `stow` binary.
//!
//! Every test runs against its own `--home`, so nothing touches the user's
//! cache or configuration.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a command for running stow against `home`.
fn stow(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stow").unwrap();
    cmd.arg("--home").arg(home).arg("--no-interactive");
    cmd.env_remove("STOW_HOME").env_remove("STOW_LOG");
    cmd
}

fn write(dir: &Path, relative: &str, content: &str) {
    let path = dir.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Export `say/0.1@lasote/testing` with bundled sources into `home`.
fn export_say(home: &Path, work: &Path) {
    write(work, "recipe.toml", "[recipe]\nexports_sources = [\"*.c\"]\n");
    write(work, "say.c", "void say() {}");
    stow(home)
        .args(["export"])
        .arg(work)
        .arg("say/0.1@lasote/testing")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported say/0.1@lasote/testing#"));
}

#[test]
fn version_flag_works() {
    let temp = TempDir::new().unwrap();
    stow(temp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stow"));
}

#[test]
fn invalid_reference_is_rejected() {
    let temp = TempDir::new().unwrap();
    stow(temp.path())
        .args(["info", "not-a-reference"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid reference 'not-a-reference'"));
}

#[test]
fn paths_live_under_the_home() {
    let temp = TempDir::new().unwrap();
    let export = temp.path().join("data/say/0.1/lasote/testing/export");
    stow(temp.path())
        .args(["paths", "say/0.1@lasote/testing", "--package", "abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains(export.to_string_lossy().into_owned()))
        .stdout(predicate::str::contains("package: "));
}

#[test]
fn export_register_info() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    export_say(&home, &temp.path().join("work"));

    let built = temp.path().join("built");
    write(&built, "lib/libsay.a", "ar");
    stow(&home)
        .args(["register", "say/0.1@lasote/testing", "p1"])
        .arg(&built)
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered say/0.1@lasote/testing:p1#"));

    stow(&home)
        .args(["info", "say/0.1@lasote/testing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote: (local)"))
        .stdout(predicate::str::contains("Exported: "))
        .stdout(predicate::str::contains("p1 #"))
        .stdout(predicate::str::contains("outdated").not());

    stow(&home)
        .args(["search", "say"])
        .assert()
        .success()
        .stdout(predicate::str::contains("say/0.1@lasote/testing"));

    stow(&home)
        .args(["search", "SAY/*@lasote/*"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Existing package recipes:"))
        .stdout(predicate::str::contains("say/0.1@lasote/testing"));

    stow(&home)
        .args(["search", "SAY*", "--case-sensitive"])
        .assert()
        .success()
        .stdout(predicate::str::contains("There are no packages matching the 'SAY*' pattern"));
}

#[test]
fn remote_configuration_roundtrip() {
    let temp = TempDir::new().unwrap();
    stow(temp.path())
        .args(["remote", "add", "origin", "/srv/stow"])
        .assert()
        .success();
    stow(temp.path())
        .args(["remote", "add", "origin", "/elsewhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot add remote 'origin'"));
    stow(temp.path())
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("origin: /srv/stow (default)"));

    assert!(temp.path().join("config.toml").exists());
    stow(temp.path())
        .args(["remote", "remove", "origin"])
        .assert()
        .success();
    stow(temp.path())
        .args(["remote", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn download_then_resolve_offline() {
    let temp = TempDir::new().unwrap();
    let publisher = temp.path().join("publisher");
    export_say(&publisher, &temp.path().join("work"));

    let consumer = temp.path().join("consumer");
    stow(&consumer)
        .args(["remote", "add", "origin"])
        .arg(publisher.join("data"))
        .assert()
        .success();
    stow(&consumer)
        .args(["download", "say/0.1@lasote/testing", "--remote", "origin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Downloaded say/0.1@lasote/testing#"));
    assert!(consumer
        .join("data/say/0.1/lasote/testing/export_source/say.c")
        .exists());

    let app = temp.path().join("app");
    write(
        &app,
        "recipe.toml",
        "[recipe]\nrequires = [\"say/[~0.1]@lasote/testing\"]\n",
    );
    stow(&consumer)
        .arg("resolve")
        .arg(app.join("recipe.toml"))
        .arg("--decisions")
        .assert()
        .success()
        .stdout(predicate::str::contains("0: say/0.1@lasote/testing#"))
        .stdout(predicate::str::contains("root: say/[~0.1]@lasote/testing resolved to"));
}

#[test]
fn copy_without_force_leaves_destination_alone() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    export_say(&home, &temp.path().join("work"));

    stow(&home)
        .args(["copy", "say/0.1@lasote/testing", "lasote/stable"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied say/0.1@lasote/testing to say/0.1@lasote/stable"));

    // The destination exists now; non-interactive runs decline to overwrite.
    stow(&home)
        .args(["copy", "say/0.1@lasote/testing", "lasote/stable"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Copy skipped"));

    stow(&home)
        .args(["copy", "say/0.1@lasote/testing", "lasote/stable", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied"));

    stow(&home)
        .args(["copy", "say/0.1@lasote/testing", "stable"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("user/channel"));
}

#[test]
fn conflicting_graph_fails_with_context() {
    let temp = TempDir::new().unwrap();
    let home = temp.path().join("home");
    for (name, recipe) in [
        ("zlib12", "[recipe]\n"),
        ("zlib13", "[recipe]\n"),
        ("png", "[recipe]\nrequires = [\"zlib/1.2@conan/stable\"]\n"),
        ("ssl", "[recipe]\nrequires = [\"zlib/1.3@conan/stable\"]\n"),
    ] {
        write(&temp.path().join(name), "recipe.toml", recipe);
    }
    for (folder, reference) in [
        ("zlib12", "zlib/1.2@conan/stable"),
        ("zlib13", "zlib/1.3@conan/stable"),
        ("png", "png/1.0@conan/stable"),
        ("ssl", "ssl/1.0@conan/stable"),
    ] {
        stow(&home)
            .arg("export")
            .arg(temp.path().join(folder))
            .arg(reference)
            .assert()
            .success();
    }

    let app = temp.path().join("app");
    write(
        &app,
        "recipe.toml",
        "[recipe]\nrequires = [\"png/1.0@conan/stable\", \"ssl/1.0@conan/stable\"]\n",
    );
    stow(&home)
        .arg("resolve")
        .arg(app.join("recipe.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to resolve dependency graph"))
        .stderr(predicate::str::contains("conflict on 'zlib'"));
}

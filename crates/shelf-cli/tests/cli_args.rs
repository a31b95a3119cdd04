use assert_cmd::Command;
use predicates::prelude::*;

fn shelf() -> Command {
    Command::cargo_bin("shelf").unwrap()
}

#[test]
fn help_lists_commands() {
    shelf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("update"))
        .stdout(predicate::str::contains("delete"));
}

#[test]
fn list_requires_a_type() {
    shelf()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CATALOG_TYPE"));
}

#[test]
fn invalid_catalog_type_is_rejected_before_any_request() {
    shelf()
        .args(["list", "workflow"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid catalog type: workflow"));
}

#[test]
fn upload_requires_all_positional_arguments() {
    shelf()
        .args(["upload", "replica", "r1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn upload_fails_on_unreadable_file() {
    shelf()
        .args([
            "upload",
            "replica",
            "r1",
            "file",
            "/nonexistent/path/to/rc.txt",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn delete_requires_a_name() {
    shelf()
        .args(["delete", "replica"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("NAME"));
}

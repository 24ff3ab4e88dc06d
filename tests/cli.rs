//! CLI surface smoke tests, in the teacher's subprocess-driven style
//! (`assert_cmd`/`predicates`), scoped to what can be exercised without a
//! compiled plug-in fixture: argument validation and file-not-found paths.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn missing_name_argument_is_rejected() {
    Command::cargo_bin("modelc")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("name"));
}

#[test]
fn nonexistent_yaml_path_reports_an_io_error() {
    Command::cargo_bin("modelc")
        .unwrap()
        .args(&["--name=does-not-matter", "no-such-file.yaml"])
        .assert()
        .failure();
}

#[test]
fn no_stack_document_among_given_yaml_is_a_configuration_error() {
    let dir = std::env::temp_dir().join(format!("modelc-cli-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let model_path = dir.join("model.yaml");
    std::fs::write(
        &model_path,
        "metadata:\n  name: some-model\nspec:\n  runtime:\n    gateway: true\n",
    )
    .unwrap();

    Command::cargo_bin("modelc")
        .unwrap()
        .arg("--name=some-instance")
        .arg(&model_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Stack document"));

    std::fs::remove_dir_all(&dir).ok();
}

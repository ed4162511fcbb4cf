use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn inspect_prints_the_tree_as_xml() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "Hello '''world'''\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg("inspect").arg(&input);

    cmd.assert().success().stdout(
        predicate::str::contains("xmlns=\"http://moinmo.in/namespaces/page\"")
            .and(predicate::str::contains("<strong>world</strong>")),
    );
}

#[test]
fn inspect_with_explicit_source_format() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("notes");
    fs::write(&input, "**bold**").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path())
        .arg("inspect")
        .arg(&input)
        .arg("compact")
        .arg("--from")
        .arg("creole");

    cmd.assert()
        .success()
        .stdout("<page><body><p><strong>bold</strong></p></body></page>\n");
}

#[test]
fn inspect_json_view() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.txt");
    fs::write(&input, "verbatim\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg("inspect").arg(&input).arg("json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"verbatim\""));
}

#[test]
fn inspect_rejects_unknown_view() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "x").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg("inspect").arg(&input).arg("treeviz");

    cmd.assert().failure();
}

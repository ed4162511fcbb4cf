use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn converts_moinwiki_to_markdown_on_stdout() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "= Title =\n\nSome '''bold''' text.\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.arg("convert").arg(&input).arg("--to").arg("markdown");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("# Title").and(predicate::str::contains("**bold**")));
}

#[test]
fn convert_is_the_default_command() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.md");
    fs::write(&input, "Some *emphasis*.\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg(&input).arg("--to").arg("moinwiki");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("''emphasis''"));
}

#[test]
fn writes_output_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    let output = dir.path().join("page.html");
    fs::write(&input, "Hello ''world''\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path())
        .arg("convert")
        .arg(&input)
        .arg("--to")
        .arg("html")
        .arg("-o")
        .arg(&output);

    cmd.assert().success().stdout(predicate::str::is_empty());
    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("<em>world</em>"), "{html}");
}

#[test]
fn standalone_html_through_extra_parameters() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "Hello\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path())
        .arg(&input)
        .arg("--to")
        .arg("html")
        .arg("--extra-standalone")
        .arg("--extra-title")
        .arg("Front");

    cmd.assert().success().stdout(
        predicate::str::contains("<html")
            .and(predicate::str::contains("<title>Front</title>")),
    );
}

#[test]
fn smileys_flag_turns_on_the_icon_pass() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "Nice :-) work\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path())
        .arg(&input)
        .arg("--to")
        .arg("html")
        .arg("--smileys");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("moin-text-icon moin-smile"));
}

#[test]
fn default_output_comes_from_config() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "Plain '''text'''").unwrap();
    let config = dir.path().join("custom.toml");
    fs::write(&config, "[convert]\ndefault_output = \"text\"\n").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path())
        .arg(&input)
        .arg("--config")
        .arg(&config);

    cmd.assert().success().stdout("Plain text\n");
}

#[test]
fn local_moin_toml_is_picked_up() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("data.csv");
    fs::write(&input, "a,b\n1,2\n").unwrap();
    fs::write(
        dir.path().join("moin.toml"),
        "[convert]\ndefault_output = \"text\"\n\n[formats.csv]\ndelimiter = \",\"\n",
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg("convert").arg("data.csv");

    cmd.assert().success().stdout("a | b\n1 | 2\n");
}

#[test]
fn undetectable_format_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.unknownext");
    fs::write(&input, "x").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg("convert").arg(&input).arg("--to").arg("html");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Could not detect format"));
}

#[test]
fn unknown_target_fails() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("page.moin");
    fs::write(&input, "x").unwrap();

    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg(&input).arg("--to").arg("odt");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("format 'odt' not found"));
}

#[test]
fn missing_input_file_fails() {
    let dir = tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("moinconv");
    cmd.current_dir(dir.path()).arg("convert").arg("absent.moin").arg("--to").arg("html");

    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("absent.moin"));
}

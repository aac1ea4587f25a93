//! Thin end-to-end coverage of the `pkgmirror` binary's argument handling.
//! Exercises the compiled binary rather than calling into `cli::run_cli`
//! directly, so it also catches misconfigured `clap::Arg` wiring.

use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_pkgmirror"))
}

#[test]
fn missing_subcommand_prints_help_and_succeeds() {
    let output = bin().output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("pkgmirror"));
}

#[test]
fn mirror_without_destination_exits_with_malformed_argument_code() {
    let output = bin()
        .args(["mirror", "--origin-url", "http://example.com/debian"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--destination"));
}

#[test]
fn mirror_with_unknown_type_exits_with_malformed_argument_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = bin()
        .args([
            "mirror",
            "--destination",
            dir.path().to_str().unwrap(),
            "--origin-url",
            "http://example.com/debian",
            "--type",
            "dpkg",
        ])
        .output()
        .unwrap();

    // `--type` is restricted to `deb`/`yum` by `possible_values`, so clap
    // itself rejects this before the registry ever sees it.
    assert_eq!(output.status.code(), Some(2));
}

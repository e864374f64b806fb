//! End-to-end tests of the `pvm` binary: exit codes and image lifecycle.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn pvm(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pvm"))
        .args(args)
        .current_dir(dir)
        .env_remove("PVM_IMAGE")
        .env_remove("PVM_TRACE")
        .output()
        .expect("Failed to run pvm")
}

#[test]
fn test_assemble_then_resume() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("prog.fs"), ": helper ret\n: init call helper bye\n").unwrap();

    let first = pvm(dir.path(), &["--words", "prog.fs"]);
    assert!(first.status.success(), "{:?}", first);
    let stdout = String::from_utf8_lossy(&first.stdout);
    assert!(stdout.contains("init"));
    assert!(stdout.contains("helper"));
    assert!(dir.path().join("pvm.img").exists());

    // Source is no longer needed once the image exists
    fs::remove_file(dir.path().join("prog.fs")).unwrap();
    let second = pvm(dir.path(), &["--list"]);
    assert!(second.status.success(), "{:?}", second);
    assert!(String::from_utf8_lossy(&second.stdout).contains("call"));
}

#[test]
fn test_trace_goes_to_stderr() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("prog.fs"), ": init nop bye").unwrap();

    let out = pvm(dir.path(), &["--image", "t.img", "--trace", "prog.fs"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("nop"));
    assert!(stderr.contains("halt"));
}

#[test]
fn test_unresolved_reference_exits_nonzero() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("bad.fs"), ": init call missing").unwrap();

    let out = pvm(dir.path(), &["bad.fs"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("missing"));
    assert!(!dir.path().join("pvm.img").exists());
}

#[test]
fn test_runtime_fault_exits_nonzero() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(dir.path().join("bad.fs"), ": init ret").unwrap();

    let out = pvm(dir.path(), &["bad.fs"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("underflow"));
}

#[test]
fn test_missing_source_for_new_image() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let out = pvm(dir.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!dir.path().join("pvm.img").exists());
}

#[test]
fn test_config_file_and_limit() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    fs::write(
        dir.path().join("pvm.toml"),
        "image = \"small.img\"\nmemory_size = 0x40\n",
    )
    .unwrap();
    fs::write(dir.path().join("spin.fs"), ": init l: jmp l").unwrap();

    let out = pvm(dir.path(), &["--limit", "100", "spin.fs"]);
    assert!(out.status.success(), "{:?}", out);
    assert_eq!(fs::metadata(dir.path().join("small.img")).unwrap().len(), 0x40);
}

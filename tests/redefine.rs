#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use jvmti_stress::gate::BootstrapGate;
use jvmti_stress::options::RedefineOptions;
use jvmti_stress::redefine::{
    read_exchange_file, run_transformer, write_exchange_file, RedefineError, Redefiner,
};

/// Writes an executable shell script standing in for the transformer.
fn write_stub(dir: &Path, script: &str) -> PathBuf {
    let path = dir.join("transformer.sh");
    fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn exchange_options(dir: &Path, transformer_cmd: PathBuf) -> RedefineOptions {
    RedefineOptions {
        transformer_cmd,
        input_path: dir.join("in.bin"),
        output_path: dir.join("out.bin"),
    }
}

fn open_gate() -> Arc<BootstrapGate> {
    let gate = Arc::new(BootstrapGate::new());
    gate.mark_ready();
    gate
}

#[test]
fn gate_is_a_one_way_latch() {
    let gate = BootstrapGate::new();
    assert!(!gate.is_ready());
    gate.mark_ready();
    assert!(gate.is_ready());
    // Idempotent.
    gate.mark_ready();
    assert!(gate.is_ready());
}

#[test]
fn exchange_files_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exchange.bin");

    let payload = b"\xca\xfe\xba\xbe arbitrary class bytes".to_vec();
    write_exchange_file(&path, &payload).unwrap();
    assert_eq!(read_exchange_file(&path).unwrap(), payload);

    // Overwrite with an empty buffer: reads back empty, not an error.
    write_exchange_file(&path, &[]).unwrap();
    assert_eq!(read_exchange_file(&path).unwrap(), Vec::<u8>::new());

    // A missing file is an error.
    assert!(read_exchange_file(&dir.path().join("missing.bin")).is_err());
}

#[test]
fn run_transformer_reports_nonzero_exit_as_data() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "echo oops >&2\nexit 3");

    let invocation = run_transformer(&stub, ["whatever"]).unwrap();
    assert_eq!(invocation.status.code(), Some(3));
    assert!(invocation.stderr.contains("oops"));
}

#[test]
fn run_transformer_propagates_spawn_failure() {
    let dir = TempDir::new().unwrap();
    assert!(run_transformer(&dir.path().join("no-such-tool"), ["x"]).is_err());
}

#[test]
fn closed_gate_short_circuits_with_no_side_effects() {
    let dir = TempDir::new().unwrap();
    // The stub would fail loudly if it ever ran.
    let stub = write_stub(dir.path(), "exit 99");
    let options = exchange_options(dir.path(), stub);
    let input_path = options.input_path.clone();
    let output_path = options.output_path.clone();

    let redefiner = Redefiner::new(options, Arc::new(BootstrapGate::new()));
    let result = redefiner.try_transform("a/b/C", b"bytes").unwrap();

    assert!(result.is_none());
    assert!(!input_path.exists(), "input exchange file was written");
    assert!(!output_path.exists(), "output exchange file was written");
}

#[test]
fn transformer_failure_carries_stderr() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "echo dexter blew up >&2\nexit 1");
    let redefiner = Redefiner::new(exchange_options(dir.path(), stub), open_gate());

    let err = redefiner.try_transform("a/b/C", b"bytes").unwrap_err();
    match err {
        RedefineError::TransformerFailed { status, stderr } => {
            assert_eq!(status.code(), Some(1));
            assert!(stderr.contains("dexter blew up"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn missing_transformer_is_a_spawn_error() {
    let dir = TempDir::new().unwrap();
    let options = exchange_options(dir.path(), dir.path().join("no-such-tool"));
    let redefiner = Redefiner::new(options, open_gate());

    let err = redefiner.try_transform("a/b/C", b"bytes").unwrap_err();
    assert!(matches!(err, RedefineError::Spawn { .. }));
}

#[test]
fn silent_success_is_a_failure() {
    let dir = TempDir::new().unwrap();
    // Exits 0 without writing any output.
    let stub = write_stub(dir.path(), "exit 0");
    let redefiner = Redefiner::new(exchange_options(dir.path(), stub), open_gate());

    let err = redefiner.try_transform("a/b/C", b"bytes").unwrap_err();
    assert!(matches!(err, RedefineError::EmptyOutput));
}

#[test]
fn stale_output_is_never_mistaken_for_a_fresh_result() {
    let dir = TempDir::new().unwrap();
    let stub = write_stub(dir.path(), "exit 0");
    let options = exchange_options(dir.path(), stub);
    // Leftover from a previous, successful transformation.
    fs::write(&options.output_path, b"stale previous result").unwrap();

    let redefiner = Redefiner::new(options, open_gate());
    let err = redefiner.try_transform("a/b/C", b"bytes").unwrap_err();
    assert!(matches!(err, RedefineError::EmptyOutput));
}

#[test]
fn echo_transformer_round_trips_the_class_bytes() {
    let dir = TempDir::new().unwrap();
    let argv_log = dir.path().join("argv.log");
    // Echoes its input file to its output file and records its argv.
    let stub = write_stub(
        dir.path(),
        &format!(
            r#"printf '%s\n' "$@" > {argv_log}
out=""
in=""
while [ $# -gt 0 ]; do
  case "$1" in
    -x|-e) shift 2 ;;
    -o) out="$2"; shift 2 ;;
    *) in="$1"; shift ;;
  esac
done
cat "$in" > "$out""#,
            argv_log = argv_log.display()
        ),
    );
    let options = exchange_options(dir.path(), stub);
    let redefiner = Redefiner::new(options, open_gate());

    let class_bytes = b"\xca\xfe\xba\xbe fake class body for a.b.C".to_vec();
    let replacement = redefiner.try_transform("a/b/C", &class_bytes).unwrap();
    assert_eq!(replacement, Some(class_bytes));

    // The transformer saw the fixed argument template with the dotted name.
    let argv: Vec<String> = fs::read_to_string(&argv_log)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(argv[0], "-x");
    assert_eq!(argv[1], "full_rewrite");
    assert_eq!(argv[2], "-e");
    assert_eq!(argv[3], "a.b.C");
    assert_eq!(argv[4], "-o");
}

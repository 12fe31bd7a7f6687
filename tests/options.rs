use std::path::PathBuf;

use jvmti_stress::options::{OptionsError, RedefineOptions, StressOptions};

#[test]
fn bare_marker_disables_both_stress_paths() {
    let options = StressOptions::parse("jvmti-stress").unwrap();
    assert!(!options.trace);
    assert!(options.redefine.is_none());
}

#[test]
fn trace_only() {
    let options = StressOptions::parse("jvmti-stress,trace").unwrap();
    assert!(options.trace);
    assert!(options.redefine.is_none());
}

#[test]
fn redefine_consumes_three_positional_tokens() {
    let options =
        StressOptions::parse("jvmti-stress,redefine,/usr/bin/dexter,/tmp/in.bin,/tmp/out.bin")
            .unwrap();
    assert!(!options.trace);
    assert_eq!(
        options.redefine,
        Some(RedefineOptions {
            transformer_cmd: PathBuf::from("/usr/bin/dexter"),
            input_path: PathBuf::from("/tmp/in.bin"),
            output_path: PathBuf::from("/tmp/out.bin"),
        })
    );
}

#[test]
fn segment_order_is_free() {
    let trace_first = StressOptions::parse("jvmti-stress,trace,redefine,A,B,C").unwrap();
    let trace_last = StressOptions::parse("jvmti-stress,redefine,A,B,C,trace").unwrap();
    assert_eq!(trace_first, trace_last);
    assert!(trace_first.trace);
    assert_eq!(
        trace_first.redefine.as_ref().map(|r| r.transformer_cmd.clone()),
        Some(PathBuf::from("A"))
    );
}

#[test]
fn missing_marker_is_fatal() {
    let err = StressOptions::parse("redefine,A,B,C").unwrap_err();
    assert_eq!(err, OptionsError::MissingMarker("redefine".to_string()));

    let err = StressOptions::parse("").unwrap_err();
    assert_eq!(err, OptionsError::MissingMarker(String::new()));
}

#[test]
fn unknown_segment_is_fatal() {
    let err = StressOptions::parse("jvmti-stress,profile").unwrap_err();
    assert_eq!(err, OptionsError::UnknownOption("profile".to_string()));
}

#[test]
fn truncated_redefine_is_fatal() {
    for raw in [
        "jvmti-stress,redefine",
        "jvmti-stress,redefine,A",
        "jvmti-stress,redefine,A,B",
    ] {
        let err = StressOptions::parse(raw).unwrap_err();
        assert_eq!(err, OptionsError::TruncatedRedefine, "input: {raw}");
    }
}

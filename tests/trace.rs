use std::ptr;

use jvmti_stress::sys::jni::{jobject, jvalue, JNI_FALSE, JNI_TRUE};
use jvmti_stress::trace::{
    format_entry_line, format_exit_line, format_native_bind_line, render_return_value,
    return_descriptor, ExitCause, ObjectInspector, ReturnKind,
};

/// Inspector that answers with a canned description, standing in for the
/// live-VM class-signature lookup.
struct FakeInspector(&'static str);

impl ObjectInspector for FakeInspector {
    fn describe(&self, _obj: jobject) -> String {
        self.0.to_string()
    }
}

const NO_OBJECTS: FakeInspector = FakeInspector("<should not be consulted>");

fn fake_object() -> jobject {
    // The inspector never dereferences it; any non-null value will do.
    0x1000 as jobject
}

#[test]
fn return_kind_decodes_the_descriptor_after_the_parenthesis() {
    assert_eq!(ReturnKind::from_method_signature("(JI)I"), ReturnKind::Int);
    assert_eq!(ReturnKind::from_method_signature("()V"), ReturnKind::Void);
    assert_eq!(
        ReturnKind::from_method_signature("()Ljava/lang/String;"),
        ReturnKind::Reference
    );
    assert_eq!(ReturnKind::from_method_signature("(I)[B"), ReturnKind::Reference);
    assert_eq!(ReturnKind::from_method_signature("()Z"), ReturnKind::Boolean);
    assert_eq!(ReturnKind::from_method_signature("()Q"), ReturnKind::Unrecognized);

    assert_eq!(return_descriptor("(Ljava/lang/String;I)J"), "J");
}

#[test]
fn integer_value_renders_as_decimal() {
    let rendered = render_return_value("(J)I", jvalue { i: 42 }, &NO_OBJECTS);
    assert_eq!(rendered, "42");
}

#[test]
fn primitive_values_render_naturally() {
    assert_eq!(
        render_return_value("()Z", jvalue { z: JNI_TRUE }, &NO_OBJECTS),
        "true"
    );
    assert_eq!(
        render_return_value("()Z", jvalue { z: JNI_FALSE }, &NO_OBJECTS),
        "false"
    );
    assert_eq!(render_return_value("()B", jvalue { b: -7 }, &NO_OBJECTS), "-7");
    assert_eq!(render_return_value("()S", jvalue { s: 300 }, &NO_OBJECTS), "300");
    assert_eq!(
        render_return_value("()J", jvalue { j: -1234567890123 }, &NO_OBJECTS),
        "-1234567890123"
    );
    assert_eq!(render_return_value("()F", jvalue { f: 1.5 }, &NO_OBJECTS), "1.5");
    assert_eq!(render_return_value("()D", jvalue { d: -0.25 }, &NO_OBJECTS), "-0.25");
}

#[test]
fn void_renders_the_fixed_placeholder() {
    let rendered = render_return_value("()V", jvalue { i: 0 }, &NO_OBJECTS);
    assert_eq!(rendered, "<void>");
}

#[test]
fn null_reference_renders_null_without_consulting_the_inspector() {
    let rendered = render_return_value(
        "()Ljava/lang/Object;",
        jvalue { l: ptr::null_mut() },
        &NO_OBJECTS,
    );
    assert_eq!(rendered, "null");
}

#[test]
fn reference_values_go_through_the_inspector() {
    let inspector = FakeInspector("Ljava/lang/String; (value: \"hi\")");
    let rendered = render_return_value(
        "()Ljava/lang/String;",
        jvalue { l: fake_object() },
        &inspector,
    );
    assert_eq!(rendered, "Ljava/lang/String; (value: \"hi\")");
}

#[test]
fn unrecognized_descriptor_renders_an_explicit_marker() {
    let rendered = render_return_value("()Q", jvalue { i: 0 }, &NO_OBJECTS);
    assert_eq!(rendered, "<unrecognized return type Q>");
}

#[test]
fn entry_line_names_method_and_thread() {
    let line = format_entry_line("main", "La/b/C;", "run", "()V");
    assert_eq!(line, "Entering method \"La/b/C;->run()V\". Thread is \"main\"");
}

#[test]
fn exit_line_tags_a_normal_return_with_its_value() {
    let line = format_exit_line(
        "worker-1",
        "La/b/C;",
        "size",
        "()I",
        &ExitCause::Return("42".to_string()),
    );
    assert_eq!(
        line,
        "Leaving method \"La/b/C;->size()I\". Thread is \"worker-1\". Cause: return 42."
    );
}

#[test]
fn exit_line_tags_an_exceptional_pop_without_a_value() {
    let line = format_exit_line("main", "La/b/C;", "fail", "()V", &ExitCause::Exception);
    assert_eq!(
        line,
        "Leaving method \"La/b/C;->fail()V\". Thread is \"main\". Cause: exception."
    );
}

#[test]
fn native_bind_line_names_method_and_thread() {
    let line = format_native_bind_line("main", "La/b/C;", "nativeInit", "()V");
    assert_eq!(
        line,
        "Loading native method \"La/b/C;->nativeInit()V\". Thread is \"main\""
    );
}

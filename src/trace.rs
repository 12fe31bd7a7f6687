//! Method entry/exit trace observer.
//!
//! Formats and emits one human-readable line per traced event. Exit events
//! carry the method's return value, rendered according to the return type
//! decoded from the method signature; a frame popped by an exception has no
//! value to render and is tagged with its cause instead.

use std::fmt;

use tracing::info;

use crate::sys::jni::{jobject, jvalue, JNI_TRUE};

/// Capability needed to render an object reference: resolving its class
/// signature and, for string instances, the literal content. Injected so the
/// rendering logic stays independent of a live VM.
pub trait ObjectInspector {
    /// Describes a non-null object reference.
    fn describe(&self, obj: jobject) -> String;
}

/// Return type of a method, decoded once from the descriptor character after
/// `)` in its signature.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReturnKind {
    Reference,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Void,
    Unrecognized,
}

impl ReturnKind {
    /// Decodes a bare return-type descriptor (`I`, `Ljava/lang/String;`,
    /// `[B`, ...).
    pub fn from_descriptor(descriptor: &str) -> Self {
        match descriptor.chars().next() {
            Some('[') | Some('L') => ReturnKind::Reference,
            Some('Z') => ReturnKind::Boolean,
            Some('B') => ReturnKind::Byte,
            Some('C') => ReturnKind::Char,
            Some('S') => ReturnKind::Short,
            Some('I') => ReturnKind::Int,
            Some('J') => ReturnKind::Long,
            Some('F') => ReturnKind::Float,
            Some('D') => ReturnKind::Double,
            Some('V') => ReturnKind::Void,
            _ => ReturnKind::Unrecognized,
        }
    }

    /// Decodes the return type of a full method signature such as
    /// `(Ljava/lang/String;I)V`.
    pub fn from_method_signature(signature: &str) -> Self {
        Self::from_descriptor(return_descriptor(signature))
    }
}

/// The return-type portion of a method signature (everything after `)`).
pub fn return_descriptor(signature: &str) -> &str {
    match signature.split_once(')') {
        Some((_, ret)) => ret,
        None => signature,
    }
}

/// Renders a method's return value from the tagged union the VM hands the
/// exit callback. The signature's return descriptor selects which union
/// field is live.
pub fn render_return_value(
    signature: &str,
    value: jvalue,
    inspector: &dyn ObjectInspector,
) -> String {
    let descriptor = return_descriptor(signature);
    match ReturnKind::from_descriptor(descriptor) {
        ReturnKind::Reference => {
            let obj = unsafe { value.l };
            if obj.is_null() {
                "null".to_string()
            } else {
                inspector.describe(obj)
            }
        }
        ReturnKind::Boolean => {
            if unsafe { value.z } == JNI_TRUE {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        ReturnKind::Byte => unsafe { value.b }.to_string(),
        ReturnKind::Char => unsafe { value.c }.to_string(),
        ReturnKind::Short => unsafe { value.s }.to_string(),
        ReturnKind::Int => unsafe { value.i }.to_string(),
        ReturnKind::Long => unsafe { value.j }.to_string(),
        ReturnKind::Float => unsafe { value.f }.to_string(),
        ReturnKind::Double => unsafe { value.d }.to_string(),
        ReturnKind::Void => "<void>".to_string(),
        ReturnKind::Unrecognized => format!("<unrecognized return type {}>", descriptor),
    }
}

/// Why a method frame was popped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitCause {
    /// Normal return, with the rendered value.
    Return(String),
    /// Popped by an exception; there is no value to render.
    Exception,
}

impl fmt::Display for ExitCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitCause::Return(value) => write!(f, "return {}", value),
            ExitCause::Exception => write!(f, "exception"),
        }
    }
}

// =============================================================================
// Line formatting
// =============================================================================

pub fn format_entry_line(
    thread: &str,
    class_sig: &str,
    method_name: &str,
    method_sig: &str,
) -> String {
    format!(
        "Entering method \"{}->{}{}\". Thread is \"{}\"",
        class_sig, method_name, method_sig, thread
    )
}

pub fn format_exit_line(
    thread: &str,
    class_sig: &str,
    method_name: &str,
    method_sig: &str,
    cause: &ExitCause,
) -> String {
    format!(
        "Leaving method \"{}->{}{}\". Thread is \"{}\". Cause: {}.",
        class_sig, method_name, method_sig, thread, cause
    )
}

pub fn format_native_bind_line(
    thread: &str,
    class_sig: &str,
    method_name: &str,
    method_sig: &str,
) -> String {
    format!(
        "Loading native method \"{}->{}{}\". Thread is \"{}\"",
        class_sig, method_name, method_sig, thread
    )
}

// =============================================================================
// Emitters
// =============================================================================

pub fn log_entry(thread: &str, class_sig: &str, method_name: &str, method_sig: &str) {
    info!("{}", format_entry_line(thread, class_sig, method_name, method_sig));
}

pub fn log_exit(
    thread: &str,
    class_sig: &str,
    method_name: &str,
    method_sig: &str,
    cause: &ExitCause,
) {
    info!(
        "{}",
        format_exit_line(thread, class_sig, method_name, method_sig, cause)
    );
}

pub fn log_native_bind(thread: &str, class_sig: &str, method_name: &str, method_sig: &str) {
    info!(
        "{}",
        format_native_bind_line(thread, class_sig, method_name, method_sig)
    );
}

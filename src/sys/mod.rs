//! Raw FFI bindings to the JNI and JVMTI interfaces.
//!
//! Layout-sensitive vtable declarations trimmed to the slots the agent
//! dereferences. Use the wrappers in [`crate::env`] unless you are writing
//! boundary code.

pub mod jni;
pub mod jvmti;

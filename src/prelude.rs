//! Common imports for the agent's boundary code.
//!
//! Intentionally small: the wrapper types, the raw binding modules, and the
//! agent plumbing.

pub use crate::env::{JniEnv, Jvmti, ThreadInfo};
pub use crate::export_agent;
pub use crate::get_default_callbacks;
pub use crate::sys::{jni, jvmti};
pub use crate::Agent;

//! High-level environment wrappers for JVMTI and JNI.
//!
//! [`Jvmti`] wraps the JVMTI environment: capability negotiation, event
//! management, method/class/thread queries, and agent-heap allocation with
//! the Deallocate bookkeeping handled internally. [`JniEnv`] wraps the JNI
//! environment for the handful of operations the agent performs from
//! callbacks.
//!
//! Both are thin views over raw pointers handed in by the VM; construct them
//! with `from_raw` at the top of a callback and let them drop at the end.

pub use crate::jni_wrapper::JniEnv;
pub use crate::jvmti_wrapper::{Jvmti, ThreadInfo};

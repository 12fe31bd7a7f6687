//! # jvmti-stress
//!
//! A JVMTI agent that stress-tests a JVM's class-redefinition and
//! native-method-binding machinery, written in pure Rust.
//!
//! The agent subscribes to class-file load hooks and, for every class loaded
//! after the VM's bootstrap class set is up, round-trips the class bytes
//! through an external bytecode-rewriting tool: bytes are externalized to a
//! temp file, the transformer is invoked on it, and the rewritten bytes are
//! handed back to the loader in place of the originals. A correct VM must
//! absorb this for every class it loads. Optionally it also traces every
//! method entry and exit, rendering return values.
//!
//! ## Usage
//!
//! Build as a `cdylib` and attach:
//!
//! ```bash
//! cargo build --release
//! java \
//!   -agentpath:./target/release/libjvmti_stress.so=jvmti-stress,redefine,/usr/bin/dexter,/tmp/in.bin,/tmp/out.bin,trace \
//!   MyApp
//! ```
//!
//! Options (comma separated, after the `=`):
//! - `jvmti-stress` - mandatory leading marker;
//! - `redefine,<transformer>,<input-temp>,<output-temp>` - run every loaded
//!   class through the external transformer;
//! - `trace` - log every method entry/exit.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------+
//! |                 StressAgent (agent.rs)                  |
//! |   options / gate / redefine / trace orchestration       |
//! +---------------------------------------------------------+
//! |          Agent trait + trampolines (this file)          |
//! +---------------------------------------------------------+
//! |        High-level wrappers: env::Jvmti, env::JniEnv     |
//! +---------------------------------------------------------+
//! |         Raw FFI bindings: sys::jni, sys::jvmti          |
//! +---------------------------------------------------------+
//! ```
//!
//! The `sys` layer is layout-exact but trimmed to the slots this agent
//! calls; the wrappers give the callbacks `Result`-returning queries with
//! the JVMTI Deallocate bookkeeping handled internally.

pub mod env;
pub mod sys;

// Implementation modules (use `env` for the wrapper API)
#[doc(hidden)]
pub mod jni_wrapper;
#[doc(hidden)]
pub mod jvmti_wrapper;

pub mod agent;
pub mod gate;
pub mod options;
pub mod prelude;
pub mod redefine;
pub mod trace;

use std::os::raw::{c_char, c_uchar, c_void};
use std::sync::OnceLock;

pub use crate::sys::jni;
use crate::sys::jvmti;

/// The callback surface this agent consumes from the VM.
///
/// Event methods default to no-ops; `on_load` is the required
/// initialization point. Implementations must be `Sync + Send` because the
/// VM delivers events from arbitrary threads.
///
/// Unlike a general-purpose event trait, every event method receives the
/// delivering `jvmtiEnv` pointer: the handlers here need it for method and
/// class queries and for allocating replacement class buffers.
pub trait Agent: Sync + Send {
    /// Called when the agent is loaded into the JVM. Parse options, request
    /// capabilities, register callbacks.
    ///
    /// Return `JNI_OK` (0) to continue loading, `JNI_ERR` (-1) to abort.
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint;

    /// Called when the agent is unloaded at JVM shutdown.
    fn on_unload(&self) {}

    /// VM initialization is complete; JNI is fully usable.
    fn vm_init(
        &self,
        _jvmti: *mut jvmti::jvmtiEnv,
        _jni: *mut jni::JNIEnv,
        _thread: jni::jthread,
    ) {
    }

    /// The VM is about to terminate.
    fn vm_death(&self, _jvmti: *mut jvmti::jvmtiEnv, _jni: *mut jni::JNIEnv) {}

    /// Class bytecode is about to be loaded or redefined. Publish a
    /// replacement by allocating through JVMTI and setting the two out
    /// parameters; leave them untouched to load the original bytes.
    #[allow(clippy::too_many_arguments)]
    fn class_file_load_hook(
        &self,
        _jvmti: *mut jvmti::jvmtiEnv,
        _jni: *mut jni::JNIEnv,
        _class_being_redefined: jni::jclass,
        _loader: jni::jobject,
        _name: *const c_char,
        _protection_domain: jni::jobject,
        _class_data_len: jni::jint,
        _class_data: *const c_uchar,
        _new_class_data_len: *mut jni::jint,
        _new_class_data: *mut *mut c_uchar,
    ) {
    }

    /// A method was entered. Fires for every call; high overhead.
    fn method_entry(
        &self,
        _jvmti: *mut jvmti::jvmtiEnv,
        _jni: *mut jni::JNIEnv,
        _thread: jni::jthread,
        _method: jni::jmethodID,
    ) {
    }

    /// A method is about to return, or its frame is being popped by an
    /// exception (in which case `return_value` is not meaningful).
    fn method_exit(
        &self,
        _jvmti: *mut jvmti::jvmtiEnv,
        _jni: *mut jni::JNIEnv,
        _thread: jni::jthread,
        _method: jni::jmethodID,
        _was_popped_by_exception: jni::jboolean,
        _return_value: jni::jvalue,
    ) {
    }

    /// A native method is being bound to its implementation. Write through
    /// `new_address_ptr` to redirect the binding.
    fn native_method_bind(
        &self,
        _jvmti: *mut jvmti::jvmtiEnv,
        _jni: *mut jni::JNIEnv,
        _thread: jni::jthread,
        _method: jni::jmethodID,
        _address: *mut c_void,
        _new_address_ptr: *mut *mut c_void,
    ) {
    }
}

/// Holds the agent instance so the static C trampolines can find it.
pub static GLOBAL_AGENT: OnceLock<Box<dyn Agent>> = OnceLock::new();

/// Initializes the global agent (called by [`export_agent!`]).
pub fn set_global_agent(agent: Box<dyn Agent>) -> Result<(), ()> {
    GLOBAL_AGENT.set(agent).map_err(|_| ())
}

unsafe extern "system" fn trampoline_vm_init(
    jvmti_env: *mut jvmti::jvmtiEnv,
    jni_env: *mut jni::JNIEnv,
    thread: jni::jthread,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.vm_init(jvmti_env, jni_env, thread);
    }
}

unsafe extern "system" fn trampoline_vm_death(
    jvmti_env: *mut jvmti::jvmtiEnv,
    jni_env: *mut jni::JNIEnv,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.vm_death(jvmti_env, jni_env);
    }
}

unsafe extern "system" fn trampoline_class_file_load_hook(
    jvmti_env: *mut jvmti::jvmtiEnv,
    jni_env: *mut jni::JNIEnv,
    class_being_redefined: jni::jclass,
    loader: jni::jobject,
    name: *const c_char,
    protection_domain: jni::jobject,
    class_data_len: jni::jint,
    class_data: *const c_uchar,
    new_class_data_len: *mut jni::jint,
    new_class_data: *mut *mut c_uchar,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.class_file_load_hook(
            jvmti_env,
            jni_env,
            class_being_redefined,
            loader,
            name,
            protection_domain,
            class_data_len,
            class_data,
            new_class_data_len,
            new_class_data,
        );
    }
}

unsafe extern "system" fn trampoline_method_entry(
    jvmti_env: *mut jvmti::jvmtiEnv,
    jni_env: *mut jni::JNIEnv,
    thread: jni::jthread,
    method: jni::jmethodID,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.method_entry(jvmti_env, jni_env, thread, method);
    }
}

unsafe extern "system" fn trampoline_method_exit(
    jvmti_env: *mut jvmti::jvmtiEnv,
    jni_env: *mut jni::JNIEnv,
    thread: jni::jthread,
    method: jni::jmethodID,
    was_popped_by_exception: jni::jboolean,
    return_value: jni::jvalue,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.method_exit(
            jvmti_env,
            jni_env,
            thread,
            method,
            was_popped_by_exception,
            return_value,
        );
    }
}

unsafe extern "system" fn trampoline_native_method_bind(
    jvmti_env: *mut jvmti::jvmtiEnv,
    jni_env: *mut jni::JNIEnv,
    thread: jni::jthread,
    method: jni::jmethodID,
    address: *mut c_void,
    new_address_ptr: *mut *mut c_void,
) {
    if let Some(agent) = GLOBAL_AGENT.get() {
        agent.native_method_bind(jvmti_env, jni_env, thread, method, address, new_address_ptr);
    }
}

/// Returns a `jvmtiEventCallbacks` table with the events this agent consumes
/// wired to the global agent instance: `VMInit`, `VMDeath`,
/// `ClassFileLoadHook`, `MethodEntry`, `MethodExit`, `NativeMethodBind`.
///
/// Registering a callback delivers nothing by itself; each event also has to
/// be enabled with `Jvmti::set_event_notification_mode`.
pub fn get_default_callbacks() -> jvmti::jvmtiEventCallbacks {
    let mut callbacks = jvmti::jvmtiEventCallbacks::default();

    callbacks.VMInit = Some(trampoline_vm_init);
    callbacks.VMDeath = Some(trampoline_vm_death);
    callbacks.ClassFileLoadHook = Some(trampoline_class_file_load_hook);
    callbacks.MethodEntry = Some(trampoline_method_entry);
    callbacks.MethodExit = Some(trampoline_method_exit);
    callbacks.NativeMethodBind = Some(trampoline_native_method_bind);

    callbacks
}

/// Exports an [`Agent`] implementation as a loadable JVMTI agent library.
///
/// Generates the `Agent_OnLoad` / `Agent_OnUnload` entry points the JVM
/// looks for when loading the library via `-agentpath`. The agent type must
/// also implement [`Default`]; one instance is created per JVM and stored in
/// a global `OnceLock`.
#[macro_export]
macro_rules! export_agent {
    ($agent_type:ty) => {
        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnLoad(
            vm: *mut $crate::sys::jni::JavaVM,
            options: *mut std::ffi::c_char,
            _reserved: *mut std::ffi::c_void,
        ) -> $crate::sys::jni::jint {
            let agent = Box::new(<$agent_type>::default());
            if $crate::set_global_agent(agent).is_err() {
                return $crate::sys::jni::JNI_ERR;
            }

            let options_str = if options.is_null() {
                ""
            } else {
                std::ffi::CStr::from_ptr(options).to_str().unwrap_or("")
            };

            if let Some(global_agent) = $crate::GLOBAL_AGENT.get() {
                return global_agent.on_load(vm, options_str);
            }

            $crate::sys::jni::JNI_ERR
        }

        #[no_mangle]
        pub unsafe extern "system" fn Agent_OnUnload(_vm: *mut $crate::sys::jni::JavaVM) {
            if let Some(agent) = $crate::GLOBAL_AGENT.get() {
                agent.on_unload();
            }
        }
    };
}

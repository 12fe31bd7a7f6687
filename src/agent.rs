//! The stress agent: VM-callback plumbing around the core components.
//!
//! All agent state lives in one [`StressContext`] built during
//! `Agent_OnLoad`; callbacks read it through the agent instance rather than
//! any hidden global. The only mutations after load are the bootstrap
//! gate's one-way release and two statistics counters.
//!
//! Error policy inside callbacks: a failed VM query logs an error and
//! abandons that callback's work. Nothing is ever propagated back into
//! VM-internal code, which has no way to recover from it.

use std::ffi::CStr;
use std::os::raw::{c_char, c_uchar, c_void};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::env::{JniEnv, Jvmti};
use crate::export_agent;
use crate::gate::BootstrapGate;
use crate::options::StressOptions;
use crate::redefine::Redefiner;
use crate::sys::{jni, jvmti};
use crate::trace::{self, ExitCause, ObjectInspector};
use crate::{get_default_callbacks, Agent};

/// Thread-name fallback when the delivering thread reference is null.
const NULL_THREAD_NAME: &str = "<NULLPTR>";
/// Thread-name fallback when `GetThreadInfo` fails mid-callback.
const UNKNOWN_THREAD_NAME: &str = "<UNKNOWN THREAD>";
/// Class signature that triggers literal-content rendering on trace exit.
const STRING_CLASS_SIGNATURE: &str = "Ljava/lang/String;";
/// Bootstrap-class-loader helper that must be initialized before any
/// redefinition; loading it too late produces spurious VM error output once
/// bootstrap classes have been redefined.
const BOOTSTRAP_SENTINEL_CLASS: &str = "java/lang/VMClassLoader";

/// Everything the callbacks need, constructed once at attach.
struct StressContext {
    options: StressOptions,
    gate: Arc<BootstrapGate>,
    redefiner: Option<Redefiner>,
    classes_seen: AtomicU64,
    classes_redefined: AtomicU64,
}

/// Agent entry point type; exported at the bottom of this file.
#[derive(Default)]
pub struct StressAgent {
    ctx: OnceLock<StressContext>,
}

/// A resolved method identity for trace output.
struct MethodIdentity {
    class_signature: String,
    name: String,
    signature: String,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // The host process may already have a subscriber; that is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn resolve_thread_name(jvmti: &Jvmti, thread: jni::jthread) -> String {
    if thread.is_null() {
        return NULL_THREAD_NAME.to_string();
    }
    match jvmti.get_thread_info(thread) {
        Ok(info) => info.name,
        Err(_) => UNKNOWN_THREAD_NAME.to_string(),
    }
}

/// Resolves declaring class signature plus method name and signature,
/// releasing the class reference before returning. On any query failure the
/// error is logged and `None` tells the caller to abandon the callback.
fn resolve_method(jvmti: &Jvmti, jni: &JniEnv, method: jni::jmethodID) -> Option<MethodIdentity> {
    let klass = match jvmti.get_method_declaring_class(method) {
        Ok(klass) => klass,
        Err(e) => {
            error!("Unable to get method declaring class: {:?}", e);
            return None;
        }
    };
    let (name, signature) = match jvmti.get_method_name(method) {
        Ok(parts) => parts,
        Err(e) => {
            error!("Unable to get method name: {:?}", e);
            jni.delete_local_ref(klass);
            return None;
        }
    };
    let class_signature = match jvmti.get_class_signature(klass) {
        Ok(sig) => sig,
        Err(e) => {
            error!("Unable to get class signature: {:?}", e);
            jni.delete_local_ref(klass);
            return None;
        }
    };
    jni.delete_local_ref(klass);
    Some(MethodIdentity {
        class_signature,
        name,
        signature,
    })
}

/// Renders object references against the live VM: class signature, plus the
/// literal content for string instances.
struct VmObjectInspector<'a> {
    jvmti: &'a Jvmti,
    jni: &'a JniEnv,
}

impl ObjectInspector for VmObjectInspector<'_> {
    fn describe(&self, obj: jni::jobject) -> String {
        let klass = self.jni.get_object_class(obj);
        let signature = match self.jvmti.get_class_signature(klass) {
            Ok(sig) => sig,
            Err(e) => {
                error!("Unable to get class signature: {:?}", e);
                self.jni.delete_local_ref(klass);
                return "<UNKNOWN>".to_string();
            }
        };
        self.jni.delete_local_ref(klass);

        if signature == STRING_CLASS_SIGNATURE {
            match self.jni.get_string_utf(obj) {
                Some(value) => format!("{} (value: \"{}\")", signature, value),
                None => format!("{} (unable to get value)", signature),
            }
        } else {
            signature
        }
    }
}

impl Agent for StressAgent {
    fn on_load(&self, vm: *mut jni::JavaVM, options: &str) -> jni::jint {
        init_logging();

        let options = match StressOptions::parse(options) {
            Ok(options) => options,
            Err(e) => {
                error!("refusing to attach: {}", e);
                return jni::JNI_ERR;
            }
        };

        let jvmti_env = match Jvmti::new(vm) {
            Ok(env) => env,
            Err(code) => {
                error!("unable to get jvmti env (JNI error {})", code);
                return jni::JNI_ERR;
            }
        };

        let gate = Arc::new(BootstrapGate::new());
        let redefiner = options
            .redefine
            .clone()
            .map(|redefine| Redefiner::new(redefine, Arc::clone(&gate)));
        let redefine_enabled = redefiner.is_some();
        let trace_enabled = options.trace;

        let ctx = StressContext {
            options,
            gate,
            redefiner,
            classes_seen: AtomicU64::new(0),
            classes_redefined: AtomicU64::new(0),
        };
        if self.ctx.set(ctx).is_err() {
            error!("agent loaded twice into the same VM");
            return jni::JNI_ERR;
        }

        // Take everything the VM offers; the stress paths together touch
        // class hooks, method events and native-method binding.
        let caps = match jvmti_env.get_potential_capabilities() {
            Ok(caps) => caps,
            Err(e) => {
                error!("unable to query potential capabilities: {:?}", e);
                return jni::JNI_ERR;
            }
        };
        if let Err(e) = jvmti_env.add_capabilities(&caps) {
            error!("unable to add capabilities: {:?}", e);
            return jni::JNI_ERR;
        }
        if redefine_enabled && !caps.can_generate_all_class_hook_events() {
            warn!("VM cannot deliver class hooks for all classes; redefinition coverage will be partial");
        }
        if trace_enabled
            && !(caps.can_generate_method_entry_events() && caps.can_generate_method_exit_events())
        {
            warn!("VM cannot deliver method entry/exit events; tracing will be incomplete");
        }

        if let Err(e) = jvmti_env.set_event_callbacks(get_default_callbacks()) {
            error!("unable to set event callbacks: {:?}", e);
            return jni::JNI_ERR;
        }
        if let Err(e) = jvmti_env.enable_events_global(&[
            jvmti::JVMTI_EVENT_NATIVE_METHOD_BIND,
            jvmti::JVMTI_EVENT_VM_INIT,
            jvmti::JVMTI_EVENT_VM_DEATH,
        ]) {
            error!("unable to enable lifecycle events: {:?}", e);
            return jni::JNI_ERR;
        }
        if redefine_enabled {
            if let Err(e) = jvmti_env.set_event_notification_mode(
                true,
                jvmti::JVMTI_EVENT_CLASS_FILE_LOAD_HOOK,
                std::ptr::null_mut(),
            ) {
                error!("unable to enable the class file load hook: {:?}", e);
                return jni::JNI_ERR;
            }
        }

        info!(
            "jvmti-stress attached (redefine: {}, trace: {})",
            redefine_enabled, trace_enabled
        );
        jni::JNI_OK
    }

    // Final setup once the VM is fully initialized: release the bootstrap
    // gate and switch on the (very noisy) method events only now.
    fn vm_init(
        &self,
        jvmti_env: *mut jvmti::jvmtiEnv,
        jni_env: *mut jni::JNIEnv,
        _thread: jni::jthread,
    ) {
        let Some(ctx) = self.ctx.get() else { return };
        let jvmti = unsafe { Jvmti::from_raw(jvmti_env) };
        let jni = unsafe { JniEnv::from_raw(jni_env) };

        info!(
            "manual load & initialization of class {}",
            BOOTSTRAP_SENTINEL_CLASS
        );
        match jni.find_class(BOOTSTRAP_SENTINEL_CLASS) {
            None => {
                // Likely a VM without this helper class. Clear the pending
                // ClassNotFound so the application never sees it; the gate
                // stays closed and redefinition stays suppressed.
                warn!("Unable to find {} class!", BOOTSTRAP_SENTINEL_CLASS);
                jni.exception_clear();
            }
            Some(klass) => {
                // Looking up a method is specified to initialize the class;
                // the lookup result itself is irrelevant.
                let _ = jni.get_method_id(klass, "hashCode", "()I");
                jni.delete_local_ref(klass);
                ctx.gate.mark_ready();
            }
        }

        if ctx.options.trace {
            if let Err(e) = jvmti.set_event_notification_mode(
                true,
                jvmti::JVMTI_EVENT_METHOD_ENTRY,
                std::ptr::null_mut(),
            ) {
                error!("Unable to enable method entry events: {:?}", e);
            }
            if let Err(e) = jvmti.set_event_notification_mode(
                true,
                jvmti::JVMTI_EVENT_METHOD_EXIT,
                std::ptr::null_mut(),
            ) {
                error!("Unable to enable method exit events: {:?}", e);
            }
        }
    }

    fn vm_death(&self, _jvmti: *mut jvmti::jvmtiEnv, _jni: *mut jni::JNIEnv) {
        let Some(ctx) = self.ctx.get() else { return };
        info!(
            "jvmti-stress done: {} classes intercepted, {} redefined",
            ctx.classes_seen.load(Ordering::Relaxed),
            ctx.classes_redefined.load(Ordering::Relaxed)
        );
    }

    fn class_file_load_hook(
        &self,
        jvmti_env: *mut jvmti::jvmtiEnv,
        _jni: *mut jni::JNIEnv,
        _class_being_redefined: jni::jclass,
        _loader: jni::jobject,
        name: *const c_char,
        _protection_domain: jni::jobject,
        class_data_len: jni::jint,
        class_data: *const c_uchar,
        new_class_data_len: *mut jni::jint,
        new_class_data: *mut *mut c_uchar,
    ) {
        let Some(ctx) = self.ctx.get() else { return };
        let Some(redefiner) = ctx.redefiner.as_ref() else {
            return;
        };
        // Anonymous/hidden classes arrive without a name; leave them alone.
        if name.is_null() || class_data.is_null() || class_data_len <= 0 {
            return;
        }

        let class_name = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
        let class_bytes =
            unsafe { std::slice::from_raw_parts(class_data, class_data_len as usize) };
        ctx.classes_seen.fetch_add(1, Ordering::Relaxed);

        match redefiner.try_transform(&class_name, class_bytes) {
            Ok(Some(replacement)) => {
                // Hand the replacement to the VM in a buffer it owns.
                let jvmti = unsafe { Jvmti::from_raw(jvmti_env) };
                match jvmti.allocate_copy(&replacement) {
                    Ok(buffer) => {
                        unsafe {
                            *new_class_data_len = replacement.len() as jni::jint;
                            *new_class_data = buffer;
                        }
                        ctx.classes_redefined.fetch_add(1, Ordering::Relaxed);
                        info!("Extracted class: {}", class_name);
                    }
                    Err(e) => {
                        error!(
                            "unable to allocate replacement buffer for {}: {:?}",
                            class_name, e
                        );
                    }
                }
            }
            // Gate still closed; the skip was already logged with the name.
            Ok(None) => {}
            Err(e) => {
                error!("Unable to extract class {}: {}", class_name, e);
            }
        }
    }

    fn method_entry(
        &self,
        jvmti_env: *mut jvmti::jvmtiEnv,
        jni_env: *mut jni::JNIEnv,
        thread: jni::jthread,
        method: jni::jmethodID,
    ) {
        let jvmti = unsafe { Jvmti::from_raw(jvmti_env) };
        let jni = unsafe { JniEnv::from_raw(jni_env) };

        let thread_name = resolve_thread_name(&jvmti, thread);
        let Some(identity) = resolve_method(&jvmti, &jni, method) else {
            return;
        };
        trace::log_entry(
            &thread_name,
            &identity.class_signature,
            &identity.name,
            &identity.signature,
        );
    }

    fn method_exit(
        &self,
        jvmti_env: *mut jvmti::jvmtiEnv,
        jni_env: *mut jni::JNIEnv,
        thread: jni::jthread,
        method: jni::jmethodID,
        was_popped_by_exception: jni::jboolean,
        return_value: jni::jvalue,
    ) {
        let jvmti = unsafe { Jvmti::from_raw(jvmti_env) };
        let jni = unsafe { JniEnv::from_raw(jni_env) };

        let thread_name = resolve_thread_name(&jvmti, thread);
        let Some(identity) = resolve_method(&jvmti, &jni, method) else {
            return;
        };

        let cause = if was_popped_by_exception != jni::JNI_FALSE {
            ExitCause::Exception
        } else {
            let inspector = VmObjectInspector {
                jvmti: &jvmti,
                jni: &jni,
            };
            ExitCause::Return(trace::render_return_value(
                &identity.signature,
                return_value,
                &inspector,
            ))
        };
        trace::log_exit(
            &thread_name,
            &identity.class_signature,
            &identity.name,
            &identity.signature,
            &cause,
        );
    }

    fn native_method_bind(
        &self,
        jvmti_env: *mut jvmti::jvmtiEnv,
        jni_env: *mut jni::JNIEnv,
        thread: jni::jthread,
        method: jni::jmethodID,
        address: *mut c_void,
        new_address_ptr: *mut *mut c_void,
    ) {
        // Observe only; the binding goes through unchanged.
        unsafe {
            *new_address_ptr = address;
        }

        let jvmti = unsafe { Jvmti::from_raw(jvmti_env) };
        let jni = unsafe { JniEnv::from_raw(jni_env) };

        let thread_name = resolve_thread_name(&jvmti, thread);
        let Some(identity) = resolve_method(&jvmti, &jni, method) else {
            return;
        };
        trace::log_native_bind(
            &thread_name,
            &identity.class_signature,
            &identity.name,
            &identity.signature,
        );
    }
}

export_agent!(StressAgent);

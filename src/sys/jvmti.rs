// jvmti-stress/src/sys/jvmti.rs
//
// JVMTI (JVM Tool Interface) bindings, trimmed to what the stress agent
// consumes: event management, capability negotiation, thread/class/method
// queries, and agent-heap allocation for the class-file replacement buffer.
//
// The function table layout is fixed by the JDK jvmti.h header (1-based
// slots 1..=156; newer JDKs fill reserved slots or append). As with the JNI
// table, unused ranges are opaque padding so the declared offsets stay
// exact, and the declaration stops after the last slot the agent calls
// (142, AddCapabilities).

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::{c_char, c_uchar};

use crate::sys::jni::{
    jboolean, jclass, jint, jlong, jmethodID, jobject, jthread, jvalue, JNIEnv,
};

// --- Versions ---
pub const JVMTI_VERSION_1_0: jint = 0x30010000;
pub const JVMTI_VERSION_1_2: jint = 0x30010200;

// --- Events ---
pub const JVMTI_EVENT_VM_INIT: u32 = 50;
pub const JVMTI_EVENT_VM_DEATH: u32 = 51;
pub const JVMTI_EVENT_CLASS_FILE_LOAD_HOOK: u32 = 54;
pub const JVMTI_EVENT_METHOD_ENTRY: u32 = 65;
pub const JVMTI_EVENT_METHOD_EXIT: u32 = 66;
pub const JVMTI_EVENT_NATIVE_METHOD_BIND: u32 = 67;

pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;

// --- Error Codes ---
//
// The subset this agent can actually observe from the functions it calls.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum jvmtiError {
    NONE = 0,
    INVALID_THREAD = 10,
    THREAD_NOT_ALIVE = 15,
    INVALID_OBJECT = 20,
    INVALID_CLASS = 21,
    INVALID_METHODID = 23,
    NOT_AVAILABLE = 98,
    MUST_POSSESS_CAPABILITY = 99,
    NULL_POINTER = 100,
    ABSENT_INFORMATION = 101,
    INVALID_EVENT_TYPE = 102,
    ILLEGAL_ARGUMENT = 103,
    NATIVE_METHOD = 104,
    OUT_OF_MEMORY = 110,
    ACCESS_DENIED = 111,
    WRONG_PHASE = 112,
    INTERNAL = 113,
    UNATTACHED_THREAD = 115,
    INVALID_ENVIRONMENT = 116,
}

// --- Thread Info ---

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct jvmtiThreadInfo {
    pub name: *mut c_char,
    pub priority: jint,
    pub is_daemon: jboolean,
    pub thread_group: jobject,
    pub context_class_loader: jobject,
}

impl Default for jvmtiThreadInfo {
    fn default() -> Self {
        Self {
            name: std::ptr::null_mut(),
            priority: 0,
            is_daemon: 0,
            thread_group: std::ptr::null_mut(),
            context_class_loader: std::ptr::null_mut(),
        }
    }
}

// --- Capabilities ---
//
// A 128-bit bitfield in the C header. Accessors are provided only for the
// capabilities this agent verifies after taking the VM's potential set.

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct jvmtiCapabilities {
    bits: [u32; 4],
}

impl Default for jvmtiCapabilities {
    fn default() -> Self {
        Self { bits: [0; 4] }
    }
}

impl jvmtiCapabilities {
    fn get_bit(&self, bit_offset: usize) -> bool {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        (self.bits[word_index] & (1 << bit_index)) != 0
    }

    fn set_bit(&mut self, bit_offset: usize, value: bool) {
        let word_index = bit_offset / 32;
        let bit_index = bit_offset % 32;
        if value {
            self.bits[word_index] |= 1 << bit_index;
        } else {
            self.bits[word_index] &= !(1 << bit_index);
        }
    }

    // [24]
    pub fn can_generate_method_entry_events(&self) -> bool {
        self.get_bit(24)
    }
    pub fn set_can_generate_method_entry_events(&mut self, v: bool) {
        self.set_bit(24, v);
    }

    // [25]
    pub fn can_generate_method_exit_events(&self) -> bool {
        self.get_bit(25)
    }
    pub fn set_can_generate_method_exit_events(&mut self, v: bool) {
        self.set_bit(25, v);
    }

    // [26]
    pub fn can_generate_all_class_hook_events(&self) -> bool {
        self.get_bit(26)
    }
    pub fn set_can_generate_all_class_hook_events(&mut self, v: bool) {
        self.set_bit(26, v);
    }

    // [30]
    pub fn can_generate_native_method_bind_events(&self) -> bool {
        self.get_bit(30)
    }
    pub fn set_can_generate_native_method_bind_events(&mut self, v: bool) {
        self.set_bit(30, v);
    }
}

// --- Event Callback Signatures ---

pub type JvmtiVMInitFn =
    unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, thread: jthread);

pub type JvmtiVMDeathFn =
    unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv);

pub type JvmtiClassFileLoadHookFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    class_being_redefined: jclass,
    loader: jobject,
    name: *const c_char,
    protection_domain: jobject,
    class_data_len: jint,
    class_data: *const c_uchar,
    new_class_data_len: *mut jint,
    new_class_data: *mut *mut c_uchar,
);

pub type JvmtiMethodEntryFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
);

pub type JvmtiMethodExitFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    was_popped_by_exception: jboolean,
    return_value: jvalue,
);

pub type JvmtiNativeMethodBindFn = unsafe extern "system" fn(
    jvmti_env: *mut jvmtiEnv,
    jni_env: *mut JNIEnv,
    thread: jthread,
    method: jmethodID,
    address: *mut c_void,
    new_address_ptr: *mut *mut c_void,
);

/// Placeholder signature for callback slots this agent never installs.
pub type JvmtiReservedFn = unsafe extern "system" fn();

// --- Event Callbacks Table ---
//
// Field order and the interleaved reserved slots follow jvmti.h exactly
// (slot numbers = event numbers, starting at VMInit = 50).

#[repr(C)]
#[derive(Copy, Clone, Default)]
pub struct jvmtiEventCallbacks {
    pub VMInit: Option<JvmtiVMInitFn>,                     // 50
    pub VMDeath: Option<JvmtiVMDeathFn>,                   // 51
    pub ThreadStart: Option<JvmtiReservedFn>,              // 52
    pub ThreadEnd: Option<JvmtiReservedFn>,                // 53
    pub ClassFileLoadHook: Option<JvmtiClassFileLoadHookFn>, // 54
    pub ClassLoad: Option<JvmtiReservedFn>,                // 55
    pub ClassPrepare: Option<JvmtiReservedFn>,             // 56
    pub VMStart: Option<JvmtiReservedFn>,                  // 57
    pub Exception: Option<JvmtiReservedFn>,                // 58
    pub ExceptionCatch: Option<JvmtiReservedFn>,           // 59
    pub SingleStep: Option<JvmtiReservedFn>,               // 60
    pub FramePop: Option<JvmtiReservedFn>,                 // 61
    pub Breakpoint: Option<JvmtiReservedFn>,               // 62
    pub FieldAccess: Option<JvmtiReservedFn>,              // 63
    pub FieldModification: Option<JvmtiReservedFn>,        // 64
    pub MethodEntry: Option<JvmtiMethodEntryFn>,           // 65
    pub MethodExit: Option<JvmtiMethodExitFn>,             // 66
    pub NativeMethodBind: Option<JvmtiNativeMethodBindFn>, // 67
    pub CompiledMethodLoad: Option<JvmtiReservedFn>,       // 68
    pub CompiledMethodUnload: Option<JvmtiReservedFn>,     // 69
    pub DynamicCodeGenerated: Option<JvmtiReservedFn>,     // 70
    pub DataDumpRequest: Option<JvmtiReservedFn>,          // 71
    pub reserved72: Option<JvmtiReservedFn>,               // 72
    pub MonitorWait: Option<JvmtiReservedFn>,              // 73
    pub MonitorWaited: Option<JvmtiReservedFn>,            // 74
    pub MonitorContendedEnter: Option<JvmtiReservedFn>,    // 75
    pub MonitorContendedEntered: Option<JvmtiReservedFn>,  // 76
    pub reserved77: Option<JvmtiReservedFn>,               // 77
    pub reserved78: Option<JvmtiReservedFn>,               // 78
    pub reserved79: Option<JvmtiReservedFn>,               // 79
    pub ResourceExhausted: Option<JvmtiReservedFn>,        // 80
    pub GarbageCollectionStart: Option<JvmtiReservedFn>,   // 81
    pub GarbageCollectionFinish: Option<JvmtiReservedFn>,  // 82
    pub ObjectFree: Option<JvmtiReservedFn>,               // 83
    pub VMObjectAlloc: Option<JvmtiReservedFn>,            // 84
    pub reserved85: Option<JvmtiReservedFn>,               // 85
    pub SampledObjectAlloc: Option<JvmtiReservedFn>,       // 86
}

// --- Function Table Signatures ---

pub type JvmtiSetEventNotificationModeFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    mode: jint,
    event_type: u32,
    event_thread: jthread,
) -> jvmtiError;

pub type JvmtiGetThreadInfoFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    thread: jthread,
    info_ptr: *mut jvmtiThreadInfo,
) -> jvmtiError;

pub type JvmtiAllocateFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    size: jlong,
    mem_ptr: *mut *mut c_uchar,
) -> jvmtiError;

pub type JvmtiDeallocateFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError;

pub type JvmtiGetClassSignatureFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    klass: jclass,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError;

pub type JvmtiGetMethodNameFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    method: jmethodID,
    name_ptr: *mut *mut c_char,
    signature_ptr: *mut *mut c_char,
    generic_ptr: *mut *mut c_char,
) -> jvmtiError;

pub type JvmtiGetMethodDeclaringClassFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    method: jmethodID,
    declaring_class_ptr: *mut jclass,
) -> jvmtiError;

pub type JvmtiSetEventCallbacksFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    callbacks: *const jvmtiEventCallbacks,
    size_of_callbacks: jint,
) -> jvmtiError;

pub type JvmtiGetPotentialCapabilitiesFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    capabilities_ptr: *mut jvmtiCapabilities,
) -> jvmtiError;

pub type JvmtiAddCapabilitiesFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    capabilities_ptr: *const jvmtiCapabilities,
) -> jvmtiError;

// --- Function Table ---
//
// Slot numbers are the 1-based indices from jvmti.h.

#[repr(C)]
pub struct jvmtiInterface_1_ {
    // 1: reserved
    pub reserved1: *mut c_void,

    // 2: SetEventNotificationMode
    pub SetEventNotificationMode: Option<JvmtiSetEventNotificationModeFn>,

    // 3-8: GetAllModules, GetAllThreads, thread suspension and signalling
    pub unused_3_8: [*mut c_void; 6],

    // 9: GetThreadInfo
    pub GetThreadInfo: Option<JvmtiGetThreadInfoFn>,

    // 10-45: monitors, thread groups, frames, locals, raw monitors,
    //        breakpoints, field watches, IsModifiableClass
    pub unused_10_45: [*mut c_void; 36],

    // 46: Allocate
    pub Allocate: Option<JvmtiAllocateFn>,

    // 47: Deallocate
    pub Deallocate: Option<JvmtiDeallocateFn>,

    // 48: GetClassSignature
    pub GetClassSignature: Option<JvmtiGetClassSignatureFn>,

    // 49-63: class and field queries
    pub unused_49_63: [*mut c_void; 15],

    // 64: GetMethodName
    pub GetMethodName: Option<JvmtiGetMethodNameFn>,

    // 65: GetMethodDeclaringClass
    pub GetMethodDeclaringClass: Option<JvmtiGetMethodDeclaringClassFn>,

    // 66-121: method queries, RedefineClasses, stack traces, heap iteration,
    //         module system, JNI function table interposition
    pub unused_66_121: [*mut c_void; 56],

    // 122: SetEventCallbacks
    pub SetEventCallbacks: Option<JvmtiSetEventCallbacksFn>,

    // 123-139: extension mechanism, environment disposal, system properties,
    //          phases, timers
    pub unused_123_139: [*mut c_void; 17],

    // 140: GetPotentialCapabilities
    pub GetPotentialCapabilities: Option<JvmtiGetPotentialCapabilitiesFn>,

    // 141: reserved
    pub reserved141: *mut c_void,

    // 142: AddCapabilities
    pub AddCapabilities: Option<JvmtiAddCapabilitiesFn>,
    // 143-156: RelinquishCapabilities .. SetHeapSamplingInterval - never
    // dereferenced here, so the declaration stops at the last used slot.
}

#[repr(C)]
pub struct jvmtiEnv {
    pub functions: *const jvmtiInterface_1_,
}

// jvmti-stress/src/sys/jni.rs
//
// JNI (Java Native Interface) bindings, trimmed to the slots this agent
// dereferences.
//
// JNIEnv is a pointer to a pointer to a function table whose layout is fixed
// by the JDK header. The full table has 236 slots (4 reserved + 232
// functions); this struct declares typed entries for the functions the agent
// calls and opaque padding for the ranges it never touches, so offsets stay
// exact. Newer JDKs only append to the end of the table, so a prefix
// declaration is forward compatible.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::os::raw::c_char;

// =============================================================================
// Primitive Types
// =============================================================================

pub type jint = i32;
pub type jlong = i64;
pub type jbyte = i8;
pub type jboolean = u8;
pub type jchar = u16;
pub type jshort = i16;
pub type jfloat = f32;
pub type jdouble = f64;
pub type jsize = jint;

// =============================================================================
// Reference Types (opaque pointers)
// =============================================================================

pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jstring = jobject;
pub type jthread = jobject;

pub type jmethodID = *mut c_void;

// =============================================================================
// jvalue Union
// =============================================================================

#[repr(C)]
#[derive(Copy, Clone)]
pub union jvalue {
    pub z: jboolean,
    pub b: jbyte,
    pub c: jchar,
    pub s: jshort,
    pub i: jint,
    pub j: jlong,
    pub f: jfloat,
    pub d: jdouble,
    pub l: jobject,
}

// =============================================================================
// Constants
// =============================================================================

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;

pub const JNI_FALSE: jboolean = 0;
pub const JNI_TRUE: jboolean = 1;

// =============================================================================
// JNINativeInterface_ - The JNI function table (vtable)
// =============================================================================
//
// Order must exactly match the JDK header. Slots the agent never calls are
// declared as `*mut c_void` padding ranges; the indices in the comments are
// the table positions from jni.h.

#[repr(C)]
pub struct JNINativeInterface_ {
    // 0-3: reserved
    pub reserved0: *mut c_void,
    pub reserved1: *mut c_void,
    pub reserved2: *mut c_void,
    pub reserved3: *mut c_void,

    // 4-5: GetVersion, DefineClass
    pub unused_4_5: [*mut c_void; 2],

    // 6: FindClass
    pub FindClass: unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass,

    // 7-16: reflection, class hierarchy, Throw/ThrowNew, ExceptionOccurred,
    //       ExceptionDescribe
    pub unused_7_16: [*mut c_void; 10],

    // 17: ExceptionClear
    pub ExceptionClear: unsafe extern "system" fn(env: *mut JNIEnv),

    // 18-22: FatalError, local frames, global refs
    pub unused_18_22: [*mut c_void; 5],

    // 23: DeleteLocalRef
    pub DeleteLocalRef: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject),

    // 24-30: IsSameObject, NewLocalRef, EnsureLocalCapacity, AllocObject,
    //        NewObject variants
    pub unused_24_30: [*mut c_void; 7],

    // 31: GetObjectClass
    pub GetObjectClass: unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject) -> jclass,

    // 32: IsInstanceOf
    pub unused_32: *mut c_void,

    // 33: GetMethodID
    pub GetMethodID: unsafe extern "system" fn(
        env: *mut JNIEnv,
        clazz: jclass,
        name: *const c_char,
        sig: *const c_char,
    ) -> jmethodID,

    // 34-93:   Call<Type>Method / CallNonvirtual<Type>Method variants
    // 94-112:  instance field access
    // 113-143: GetStaticMethodID + CallStatic<Type>Method variants
    // 144-162: static field access
    // 163-168: NewString .. GetStringUTFLength
    pub unused_34_168: [*mut c_void; 135],

    // 169: GetStringUTFChars
    pub GetStringUTFChars: unsafe extern "system" fn(
        env: *mut JNIEnv,
        str: jstring,
        isCopy: *mut jboolean,
    ) -> *const c_char,

    // 170: ReleaseStringUTFChars
    pub ReleaseStringUTFChars:
        unsafe extern "system" fn(env: *mut JNIEnv, str: jstring, chars: *const c_char),
    // 171-235: arrays, natives registration, monitors, NIO, modules - never
    // dereferenced here, so the declaration stops at the last used slot.
}

/// JNIEnv is directly the vtable pointer (C ABI definition).
pub type JNIEnv = *const JNINativeInterface_;

// =============================================================================
// JNIInvokeInterface_ - The JavaVM function table
// =============================================================================

#[repr(C)]
pub struct JNIInvokeInterface_ {
    pub reserved0: *mut c_void,
    pub reserved1: *mut c_void,
    pub reserved2: *mut c_void,

    // 3-5: DestroyJavaVM, AttachCurrentThread, DetachCurrentThread
    pub unused_3_5: [*mut c_void; 3],

    // 6: GetEnv
    pub GetEnv:
        unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint,
    // 7: AttachCurrentThreadAsDaemon - unused, end of declaration.
}

/// JavaVM is directly the vtable pointer (C ABI definition).
pub type JavaVM = *const JNIInvokeInterface_;

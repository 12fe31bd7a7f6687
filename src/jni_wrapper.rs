//! Safe wrapper around the JNI environment.
//!
//! Trimmed to the JNI operations the stress agent performs from inside
//! VM callbacks: class/method lookup, local-reference cleanup, exception
//! clearing, and string extraction for trace rendering.

use crate::sys::jni;
use std::ffi::{CStr, CString};
use std::ptr;

/// Safe wrapper around a JNI environment pointer.
///
/// A `JniEnv` is tied to a specific thread and must not be sent across
/// threads; each VM thread receives its own environment in its callbacks.
pub struct JniEnv {
    env: *mut jni::JNIEnv,
}

impl JniEnv {
    /// Creates a JniEnv wrapper from a raw pointer.
    ///
    /// # Safety
    ///
    /// The caller must ensure the pointer is valid and comes from the
    /// current thread.
    pub unsafe fn from_raw(env: *mut jni::JNIEnv) -> Self {
        JniEnv { env }
    }

    /// Returns the raw JNI environment pointer.
    pub fn raw(&self) -> *mut jni::JNIEnv {
        self.env
    }

    /// Finds a class by its fully qualified name ('/' separators).
    pub fn find_class(&self, name: &str) -> Option<jni::jclass> {
        let c_name = CString::new(name).ok()?;
        unsafe {
            let vtable = *self.env;
            let cls = ((*vtable).FindClass)(self.env, c_name.as_ptr());
            if cls.is_null() {
                None
            } else {
                Some(cls)
            }
        }
    }

    /// Looks up an instance method by name and signature.
    pub fn get_method_id(
        &self,
        cls: jni::jclass,
        name: &str,
        sig: &str,
    ) -> Option<jni::jmethodID> {
        let c_name = CString::new(name).ok()?;
        let c_sig = CString::new(sig).ok()?;
        unsafe {
            let vtable = *self.env;
            let id = ((*vtable).GetMethodID)(self.env, cls, c_name.as_ptr(), c_sig.as_ptr());
            if id.is_null() {
                None
            } else {
                Some(id)
            }
        }
    }

    /// Gets the class of an object.
    pub fn get_object_class(&self, obj: jni::jobject) -> jni::jclass {
        unsafe {
            let vtable = *self.env;
            ((*vtable).GetObjectClass)(self.env, obj)
        }
    }

    /// Clears any pending exception on this thread.
    pub fn exception_clear(&self) {
        unsafe {
            let vtable = *self.env;
            ((*vtable).ExceptionClear)(self.env);
        }
    }

    /// Deletes a local reference.
    pub fn delete_local_ref(&self, obj: jni::jobject) {
        if obj.is_null() {
            return;
        }
        unsafe {
            let vtable = *self.env;
            ((*vtable).DeleteLocalRef)(self.env, obj);
        }
    }

    /// Copies a Java string's modified-UTF-8 contents into a Rust `String`.
    ///
    /// Returns `None` if the chars cannot be pinned (out of memory or a
    /// pending exception).
    pub fn get_string_utf(&self, s: jni::jstring) -> Option<String> {
        unsafe {
            let vtable = *self.env;
            let chars = ((*vtable).GetStringUTFChars)(self.env, s, ptr::null_mut());
            if chars.is_null() {
                return None;
            }
            let result = CStr::from_ptr(chars).to_string_lossy().into_owned();
            ((*vtable).ReleaseStringUTFChars)(self.env, s, chars);
            Some(result)
        }
    }
}

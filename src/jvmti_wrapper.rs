// jvmti-stress/src/jvmti_wrapper.rs
use crate::sys::jni;
use crate::sys::jvmti;
use std::ptr;

/// Thread description with the JVMTI-allocated name already copied out and
/// released.
#[derive(Debug, Clone)]
pub struct ThreadInfo {
    pub name: String,
    pub priority: jni::jint,
    pub is_daemon: bool,
}

/// A safe wrapper around the raw JVMTI environment pointer.
pub struct Jvmti {
    // Kept private so callers can't mess with the raw pointer directly.
    env: *mut jvmti::jvmtiEnv,
}

impl Jvmti {
    /// Connects to the JVM and retrieves the JVMTI environment.
    pub fn new(vm: *mut jni::JavaVM) -> Result<Self, jni::jint> {
        let mut env_ptr: *mut std::ffi::c_void = ptr::null_mut();

        unsafe {
            // vm: *mut JavaVM = *mut *const JNIInvokeInterface_
            // **vm: JNIInvokeInterface_ (the vtable itself)
            let get_env_fn = (**vm).GetEnv;

            let res = get_env_fn(vm, &mut env_ptr, jvmti::JVMTI_VERSION_1_2);
            if res != jni::JNI_OK {
                return Err(res);
            }
        }

        Ok(Jvmti {
            env: env_ptr as *mut jvmti::jvmtiEnv,
        })
    }

    /// Create a Jvmti wrapper from a raw jvmtiEnv pointer.
    ///
    /// # Safety
    /// The caller must ensure the pointer is valid for the duration of use.
    pub unsafe fn from_raw(env: *mut jvmti::jvmtiEnv) -> Self {
        Jvmti { env }
    }

    /// Get the raw jvmtiEnv pointer.
    pub fn raw(&self) -> *mut jvmti::jvmtiEnv {
        self.env
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    pub fn get_potential_capabilities(
        &self,
    ) -> Result<jvmti::jvmtiCapabilities, jvmti::jvmtiError> {
        let mut caps = jvmti::jvmtiCapabilities::default();

        unsafe {
            let get_pot_caps_fn = (*(*self.env).functions).GetPotentialCapabilities.unwrap();
            let err = get_pot_caps_fn(self.env, &mut caps);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }

        Ok(caps)
    }

    pub fn add_capabilities(
        &self,
        new_caps: &jvmti::jvmtiCapabilities,
    ) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let add_caps_fn = (*(*self.env).functions).AddCapabilities.unwrap();
            let err = add_caps_fn(self.env, new_caps);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub fn set_event_callbacks(
        &self,
        callbacks: jvmti::jvmtiEventCallbacks,
    ) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_callbacks_fn = (*(*self.env).functions).SetEventCallbacks.unwrap();
            let size = std::mem::size_of::<jvmti::jvmtiEventCallbacks>() as i32;

            let err = set_callbacks_fn(self.env, &callbacks, size);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    pub fn set_event_notification_mode(
        &self,
        enable: bool,
        event_type: u32,
        thread: jni::jthread,
    ) -> Result<(), jvmti::jvmtiError> {
        unsafe {
            let set_mode_fn = (*(*self.env).functions).SetEventNotificationMode.unwrap();
            let mode = if enable {
                jvmti::JVMTI_ENABLE
            } else {
                jvmti::JVMTI_DISABLE
            };

            // thread is null for global delivery
            let err = set_mode_fn(self.env, mode, event_type, thread);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Enables a set of events for all threads, stopping at the first failure.
    pub fn enable_events_global(&self, events: &[u32]) -> Result<(), jvmti::jvmtiError> {
        for &event in events {
            self.set_event_notification_mode(true, event, ptr::null_mut())?;
        }
        Ok(())
    }

    // =========================================================================
    // Memory
    // =========================================================================

    pub fn allocate(&self, size: jni::jlong) -> Result<*mut u8, jvmti::jvmtiError> {
        let mut mem_ptr: *mut u8 = ptr::null_mut();

        unsafe {
            let allocate_fn = (*(*self.env).functions).Allocate.unwrap();
            let err = allocate_fn(self.env, size, &mut mem_ptr);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }

        Ok(mem_ptr)
    }

    pub fn deallocate(&self, mem: *mut u8) -> Result<(), jvmti::jvmtiError> {
        if mem.is_null() {
            return Ok(());
        }
        unsafe {
            let deallocate_fn = (*(*self.env).functions).Deallocate.unwrap();
            let err = deallocate_fn(self.env, mem);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }
        Ok(())
    }

    /// Copies a Rust byte slice into a JVMTI-allocated buffer.
    ///
    /// The returned pointer is owned by the VM side; this is the
    /// ownership-transfer half of the ClassFileLoadHook contract.
    pub fn allocate_copy(&self, data: &[u8]) -> Result<*mut u8, jvmti::jvmtiError> {
        let mem = self.allocate(data.len() as jni::jlong)?;
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), mem, data.len());
        }
        Ok(mem)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Resolves a thread's info, copying out and releasing the VM-allocated
    /// name string.
    pub fn get_thread_info(&self, thread: jni::jthread) -> Result<ThreadInfo, jvmti::jvmtiError> {
        let mut info = jvmti::jvmtiThreadInfo::default();

        unsafe {
            let get_thread_info_fn = (*(*self.env).functions).GetThreadInfo.unwrap();
            let err = get_thread_info_fn(self.env, thread, &mut info);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }

            let name = if info.name.is_null() {
                String::new()
            } else {
                std::ffi::CStr::from_ptr(info.name)
                    .to_string_lossy()
                    .into_owned()
            };
            self.deallocate(info.name as *mut u8)?;

            Ok(ThreadInfo {
                name,
                priority: info.priority,
                is_daemon: info.is_daemon != jni::JNI_FALSE,
            })
        }
    }

    /// Returns a class's JVM type signature (e.g. `Ljava/lang/String;`),
    /// discarding the generic signature.
    pub fn get_class_signature(&self, klass: jni::jclass) -> Result<String, jvmti::jvmtiError> {
        let mut sig_ptr: *mut std::os::raw::c_char = ptr::null_mut();
        let mut gen_ptr: *mut std::os::raw::c_char = ptr::null_mut();

        unsafe {
            let get_class_sig_fn = (*(*self.env).functions).GetClassSignature.unwrap();
            let err = get_class_sig_fn(self.env, klass, &mut sig_ptr, &mut gen_ptr);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }

            let signature = std::ffi::CStr::from_ptr(sig_ptr)
                .to_string_lossy()
                .into_owned();

            self.deallocate(sig_ptr as *mut u8)?;
            self.deallocate(gen_ptr as *mut u8)?;

            Ok(signature)
        }
    }

    /// Returns a method's name and JVM type signature, discarding the generic
    /// signature.
    pub fn get_method_name(
        &self,
        method: jni::jmethodID,
    ) -> Result<(String, String), jvmti::jvmtiError> {
        let mut name_ptr: *mut std::os::raw::c_char = ptr::null_mut();
        let mut sig_ptr: *mut std::os::raw::c_char = ptr::null_mut();
        let mut gen_ptr: *mut std::os::raw::c_char = ptr::null_mut();

        unsafe {
            let get_method_name_fn = (*(*self.env).functions).GetMethodName.unwrap();
            let err = get_method_name_fn(self.env, method, &mut name_ptr, &mut sig_ptr, &mut gen_ptr);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }

            let name = std::ffi::CStr::from_ptr(name_ptr)
                .to_string_lossy()
                .into_owned();
            let signature = std::ffi::CStr::from_ptr(sig_ptr)
                .to_string_lossy()
                .into_owned();

            self.deallocate(name_ptr as *mut u8)?;
            self.deallocate(sig_ptr as *mut u8)?;
            self.deallocate(gen_ptr as *mut u8)?;

            Ok((name, signature))
        }
    }

    pub fn get_method_declaring_class(
        &self,
        method: jni::jmethodID,
    ) -> Result<jni::jclass, jvmti::jvmtiError> {
        let mut klass: jni::jclass = ptr::null_mut();

        unsafe {
            let get_declaring_fn = (*(*self.env).functions).GetMethodDeclaringClass.unwrap();
            let err = get_declaring_fn(self.env, method, &mut klass);
            if err != jvmti::jvmtiError::NONE {
                return Err(err);
            }
        }

        Ok(klass)
    }
}

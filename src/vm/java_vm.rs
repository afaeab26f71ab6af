use std::{
    os::raw::{c_char, c_void},
    ptr::{self, NonNull},
};

use crate::{
    errors::*,
    sys,
    vm::{AttachArgs, InvocationApi, ThreadKind},
    JNIVersion,
};

/// A raw Java VM pointer, as handed to `JNI_OnLoad`.
///
/// Implements [`InvocationApi`] by calling straight into the VM's invocation interface. Daemon
/// attachment requires a VM that supports JNI >= 1.4.
#[repr(transparent)]
#[derive(Debug)]
pub struct JavaVM(*mut sys::JavaVM);

unsafe impl Send for JavaVM {}
unsafe impl Sync for JavaVM {}

impl JavaVM {
    /// Create a JavaVM from a raw pointer.
    ///
    /// # Safety
    ///
    /// Expects a valid pointer, such as the one passed to `JNI_OnLoad`, that stays valid for as long
    /// as the returned value is used. Only does a null check.
    pub unsafe fn from_raw(ptr: *mut sys::JavaVM) -> Result<Self> {
        non_null!(ptr, "JavaVM::from_raw ptr argument");
        Ok(JavaVM(ptr))
    }

    /// Returns the underlying `sys::JavaVM` pointer.
    pub fn get_raw(&self) -> *mut sys::JavaVM {
        self.0
    }
}

unsafe impl InvocationApi for JavaVM {
    fn get_env(&self, version: JNIVersion) -> Result<NonNull<sys::JNIEnv>> {
        let mut env_ptr: *mut c_void = ptr::null_mut();
        let version: sys::jint = version.into();
        let res = unsafe { java_vm_call_unchecked!(self, v1_2, GetEnv, &mut env_ptr, version) };
        jni_error_code_to_result(res)?;

        NonNull::new(env_ptr as *mut sys::JNIEnv).ok_or(Error::NullPtr("GetEnv result"))
    }

    fn attach_current_thread(
        &self,
        kind: ThreadKind,
        args: &AttachArgs,
    ) -> Result<NonNull<sys::JNIEnv>> {
        let mut env_ptr: *mut c_void = ptr::null_mut();
        let mut raw_args = sys::JavaVMAttachArgs {
            version: args.version().into(),
            name: args
                .name()
                .map(|s| s.as_ptr() as *mut c_char)
                .unwrap_or(ptr::null_mut()),
            group: ptr::null_mut(),
        };
        let raw_args_ptr = &mut raw_args as *mut sys::JavaVMAttachArgs as *mut c_void;

        let res = unsafe {
            match kind {
                ThreadKind::Normal => java_vm_call_unchecked!(
                    self,
                    v1_1,
                    AttachCurrentThread,
                    &mut env_ptr,
                    raw_args_ptr
                ),
                ThreadKind::Daemon => java_vm_call_unchecked!(
                    self,
                    v1_4,
                    AttachCurrentThreadAsDaemon,
                    &mut env_ptr,
                    raw_args_ptr
                ),
            }
        };
        jni_error_code_to_result(res)?;

        NonNull::new(env_ptr as *mut sys::JNIEnv).ok_or(Error::NullPtr("AttachCurrentThread result"))
    }

    fn detach_current_thread(&self) -> Result<()> {
        let res = unsafe { java_vm_call_unchecked!(self, v1_1, DetachCurrentThread) };
        jni_error_code_to_result(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn null_vm_is_rejected() {
        let res = unsafe { JavaVM::from_raw(ptr::null_mut()) };
        assert!(matches!(res, Err(Error::NullPtr(_))));
    }
}

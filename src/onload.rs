use crate::{errors::*, sys, CacheConfig, EnvCache, JNIVersion, JavaVM};

#[cfg(feature = "onload")]
use {log::error, std::os::raw::c_void};

/// The load hook: installs the process-wide [`EnvCache`] for the given VM.
///
/// Returns the JNI version that `JNI_OnLoad` should report, i.e. the configured version.
///
/// # Safety
///
/// `vm` must be the valid `JavaVM` pointer passed to `JNI_OnLoad`.
pub unsafe fn on_load(vm: *mut sys::JavaVM, config: CacheConfig) -> Result<JNIVersion> {
    let vm = unsafe { JavaVM::from_raw(vm)? };
    let version = config.get_version();
    EnvCache::install(vm, config)?;
    Ok(version)
}

/// The unload hook: releases the thread local storage of the process-wide [`EnvCache`].
///
/// Threads that exit afterwards are no longer detached by this crate, and every [`EnvCache`]
/// operation fails with [`Error::Unloaded`] until the library is loaded again.
pub fn on_unload() {
    EnvCache::unload_singleton();
}

/// `JNI_OnLoad`, installing the cache with the default configuration.
///
/// # Safety
///
/// Only to be called by the Java VM.
#[cfg(feature = "onload")]
#[no_mangle]
pub unsafe extern "system" fn JNI_OnLoad(vm: *mut sys::JavaVM, _reserved: *mut c_void) -> sys::jint {
    match unsafe { on_load(vm, CacheConfig::default()) } {
        Ok(version) => version.into(),
        Err(err) => {
            error!("Failed to install the JNI environment cache: {err}");
            sys::JNI_ERR
        }
    }
}

/// `JNI_OnUnload`
///
/// # Safety
///
/// Only to be called by the Java VM.
#[cfg(feature = "onload")]
#[no_mangle]
pub unsafe extern "system" fn JNI_OnUnload(_vm: *mut sys::JavaVM, _reserved: *mut c_void) {
    on_unload();
}

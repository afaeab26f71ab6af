#![warn(missing_docs)]
#![allow(clippy::upper_case_acronyms)]

//! # Cached `JNIEnv` access for native threads
//!
//! A native thread that was not started by the JVM has to _attach_ itself before it can call into
//! Java, and it must _detach_ before it exits. This crate keeps the per-thread `JNIEnv` pointer in
//! thread local storage so that repeated lookups don't need to cross into the JVM, and it makes
//! sure that any thread it attached is detached again when that thread terminates.
//!
//! ## Lifecycle
//!
//! The process-wide [`EnvCache`] is installed once, normally from `JNI_OnLoad`:
//!
//! ```rust,ignore
//! # use jni_env_cache::{on_load, on_unload, sys, CacheConfig};
//! # use std::os::raw::c_void;
//! #[no_mangle]
//! pub unsafe extern "system" fn JNI_OnLoad(vm: *mut sys::JavaVM, _: *mut c_void) -> sys::jint {
//!     match unsafe { on_load(vm, CacheConfig::default()) } {
//!         Ok(version) => version.into(),
//!         Err(_) => sys::JNI_ERR,
//!     }
//! }
//!
//! #[no_mangle]
//! pub unsafe extern "system" fn JNI_OnUnload(_: *mut sys::JavaVM, _: *mut c_void) {
//!     on_unload();
//! }
//! ```
//!
//! With the `onload` feature enabled these two symbols are exported by this crate.
//!
//! ## Looking up the environment
//!
//! ```rust,no_run
//! # fn main() -> jni_env_cache::errors::Result<()> {
//! use jni_env_cache::EnvCache;
//!
//! let cache = EnvCache::singleton()?;
//!
//! // Fast path after the first call on this thread. Attaches the thread as a daemon if needed
//! // and terminates the process if the JVM refuses the attachment.
//! let env = cache.get_cached();
//!
//! // Always asks the JVM; never attaches.
//! assert_eq!(cache.get_uncached(), Some(env));
//! # Ok(())
//! # }
//! ```
//!
//! ## Thread-exit cleanup
//!
//! On most platforms the attachment is released by a thread local destructor. On Windows a Fiber
//! Local Storage callback is used instead, since that runs without holding the loader lock.

/// `jni-sys` re-exports
pub mod sys {
    pub use jni_sys::*;
}

#[macro_use]
mod macros;

/// Errors and the failure policy for attach/detach.
pub mod errors;

mod version;
pub use self::version::*;

mod env;
pub use self::env::*;

mod vm;
pub use self::vm::*;

mod config;
pub use self::config::*;

mod slot;

mod cache;
pub use self::cache::*;

mod onload;
pub use self::onload::*;

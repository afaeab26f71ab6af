//! Per-thread storage for the cached `JNIEnv`, with a cleanup hook that runs at thread exit.
//!
//! There is one implementation per platform, chosen by `build.rs`:
//!
//! - `tls_slot`: a Rust `thread_local!` whose destructor detaches the thread.
//! - `fls_slot`: Windows Fiber Local Storage. Its callback runs without the loader lock held, which
//!   avoids deadlocking against a JVM safepoint while detaching.

use std::{ptr::NonNull, thread::Thread};

use log::debug;

use crate::{errors::*, sys, EnvCache};

/// What a thread remembers about its attachment.
#[derive(Debug)]
pub(crate) struct SlotEntry {
    pub(crate) env: NonNull<sys::JNIEnv>,
    /// `true` if the attachment was made by this crate (and is counted in `threads_attached`)
    pub(crate) owned: bool,
    /// Captured on creation since `std::thread::current()` may not be usable during thread
    /// teardown.
    pub(crate) thread: Thread,
}

/// A per-thread slot holding at most one [`SlotEntry`].
pub(crate) trait ThreadSlot {
    /// Allocates any process-wide storage the slot needs.
    fn init() -> Result<()>;

    /// The cached environment for the current thread, if any.
    fn get() -> Option<NonNull<sys::JNIEnv>>;

    /// Stores an entry for the current thread and arranges for [`release_on_thread_exit`] to be
    /// called with it when the thread terminates.
    ///
    /// Any previous entry is discarded without being released.
    fn store(entry: SlotEntry) -> Result<()>;

    /// Removes the current thread's entry without running the thread-exit cleanup.
    fn take() -> Option<SlotEntry>;

    /// Called at unload, once the cache no longer calls into the VM from thread-exit cleanup.
    ///
    /// Frees any process-wide storage. Entries that survive keep their ownership. An owned entry
    /// that is dropped instead must be passed to `EnvCache::forget_released_entry`.
    fn release();
}

cfg_if::cfg_if! {
    if #[cfg(use_fls_slot)] {
        mod fls_slot;
        pub(crate) use self::fls_slot::FlsSlot as Slot;
    } else {
        mod tls_slot;
        pub(crate) use self::tls_slot::TlsSlot as Slot;
    }
}

/// Thread-exit cleanup shared by all slot implementations.
pub(crate) fn release_on_thread_exit(entry: SlotEntry) {
    match EnvCache::loaded() {
        Some(cache) => cache.release_exiting_thread(&entry),
        None => debug!(
            "Not detaching exiting thread {} ({:?}): environment cache is unloaded",
            entry.thread.name().unwrap_or_default(),
            entry.thread.id()
        ),
    }
}

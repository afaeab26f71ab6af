//! Windows Fiber Local Storage (FLS) slot.
//!
//! FLS callbacks run without holding the Windows loader lock, unlike TLS destructors. Detaching
//! from a TLS destructor can deadlock:
//!
//! 1. A native thread, previously attached to a JVM, is stopped
//! 2. Windows calls the TLS destructor while holding the loader lock
//! 3. The destructor calls `DetachCurrentThread`, a Native -> VM state transition
//! 4. Concurrently, some other thread starts a new Java thread
//! 5. The native thread is trapped in a JVM safepoint, still holding the loader lock
//! 6. The new Java thread can't run user code until it gets the loader lock, so it never reaches
//!    the safepoint and the JVM never releases the native thread
//!
//! See: https://github.com/jni-rs/jni-rs/issues/701

use std::{
    ffi::c_void,
    ptr::{self, NonNull},
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
};

use log::debug;

use windows_sys::Win32::{
    Foundation::FALSE,
    System::Threading::{FlsAlloc, FlsFree, FlsGetValue, FlsSetValue},
};

use crate::{
    errors::*,
    slot::{release_on_thread_exit, SlotEntry, ThreadSlot},
    sys, EnvCache,
};

const FLS_OUT_OF_INDEXES: u32 = u32::MAX;

/// The FLS index for the slot, or `FLS_OUT_OF_INDEXES` when not allocated.
static FLS_INDEX: AtomicU32 = AtomicU32::new(FLS_OUT_OF_INDEXES);

/// Set while `FlsFree` runs the callback for every remaining entry.
static RELEASING: AtomicBool = AtomicBool::new(false);

/// Check if the process is currently shutting down.
///
/// Note: RtlDllShutdownInProgress is available on Windows 10 + but not part of
/// the Windows SDK, so we link to it manually.
fn windows_is_shutdown_in_progress() -> bool {
    #[link(name = "ntdll")]
    unsafe extern "system" {
        fn RtlDllShutdownInProgress() -> u8; // BOOLEAN
    }
    unsafe { RtlDllShutdownInProgress() != 0 }
}

/// FLS callback, invoked when a thread (or fiber) terminates and for every entry on `FlsFree`.
///
/// SAFETY: only `Box<SlotEntry>` pointers are ever stored in the slot.
unsafe extern "system" fn fls_callback(data: *const c_void) {
    if data.is_null() {
        return;
    }
    let entry = unsafe { Box::from_raw(data as *mut SlotEntry) };

    // During `FlsFree` the callback may run on a thread other than the entry's owner, and during
    // process shutdown calling into the JVM risks the deadlock described above.
    let releasing = RELEASING.load(Ordering::SeqCst);
    if releasing || windows_is_shutdown_in_progress() {
        debug!(
            "Dropping FLS entry of thread {} ({:?}) without detaching",
            entry.thread.name().unwrap_or_default(),
            entry.thread.id()
        );
        if releasing {
            // The slot is gone, so after a reload this attachment would look like a foreign one
            EnvCache::forget_released_entry(&entry);
        }
        return;
    }

    release_on_thread_exit(*entry);
}

fn current_index() -> Option<u32> {
    let index = FLS_INDEX.load(Ordering::SeqCst);
    (index != FLS_OUT_OF_INDEXES).then_some(index)
}

fn get_or_init_index() -> Result<u32> {
    if let Some(index) = current_index() {
        return Ok(index);
    }

    // Safety: fls_callback is a valid callback function
    let new_index = unsafe { FlsAlloc(Some(fls_callback)) };
    if new_index == FLS_OUT_OF_INDEXES {
        return Err(Error::SlotUnavailable);
    }

    match FLS_INDEX.compare_exchange(
        FLS_OUT_OF_INDEXES,
        new_index,
        Ordering::SeqCst,
        Ordering::SeqCst,
    ) {
        Ok(_) => Ok(new_index),
        Err(existing) => {
            // Another thread won the race
            unsafe { FlsFree(new_index) };
            Ok(existing)
        }
    }
}

pub(crate) struct FlsSlot;

impl ThreadSlot for FlsSlot {
    fn init() -> Result<()> {
        get_or_init_index().map(|_| ())
    }

    fn get() -> Option<NonNull<sys::JNIEnv>> {
        let index = current_index()?;
        // Safety: index is valid
        let data = unsafe { FlsGetValue(index) } as *const SlotEntry;
        // Safety: only `Box<SlotEntry>` pointers are ever stored in the slot
        unsafe { data.as_ref() }.map(|entry| entry.env)
    }

    fn store(entry: SlotEntry) -> Result<()> {
        let index = get_or_init_index()?;

        // Discard any previous entry without detaching
        drop(Self::take());

        let data = Box::into_raw(Box::new(entry)) as *mut c_void;
        // Safety: index is valid and data is a valid pointer
        if unsafe { FlsSetValue(index, data) } == FALSE {
            unsafe {
                let _ = Box::from_raw(data as *mut SlotEntry);
            }
            return Err(Error::SlotUnavailable);
        }
        Ok(())
    }

    fn take() -> Option<SlotEntry> {
        let index = current_index()?;
        // Safety: index is valid
        let data = unsafe { FlsGetValue(index) };
        if data.is_null() {
            return None;
        }

        // Clear the slot first so the callback can't run for this entry
        // Safety: index is valid
        if unsafe { FlsSetValue(index, ptr::null()) } == FALSE {
            return None;
        }

        // Safety: data came from FlsGetValue and we only store Box<SlotEntry>
        let entry = unsafe { Box::from_raw(data as *mut SlotEntry) };
        Some(*entry)
    }

    fn release() {
        let index = FLS_INDEX.swap(FLS_OUT_OF_INDEXES, Ordering::SeqCst);
        if index == FLS_OUT_OF_INDEXES {
            return;
        }

        RELEASING.store(true, Ordering::SeqCst);
        // Safety: index was allocated by FlsAlloc and is no longer published
        unsafe { FlsFree(index) };
        RELEASING.store(false, Ordering::SeqCst);
        debug!("Freed FLS index {index}");
    }
}

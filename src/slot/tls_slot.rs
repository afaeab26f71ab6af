//! Thread Local Storage (TLS) slot for non-Windows platforms.
//!
//! On these platforms TLS destructors can call `DetachCurrentThread` without the loader lock
//! issues that affect Windows.

use std::{cell::RefCell, ptr::NonNull};

use log::debug;

use crate::{
    errors::*,
    slot::{release_on_thread_exit, SlotEntry, ThreadSlot},
    sys,
};

thread_local! {
    // There's a false-positive Clippy bug: https://github.com/rust-lang/rust-clippy/issues/13422
    #[cfg_attr(target_os = "android", allow(clippy::missing_const_for_thread_local))]
    static ENV_SLOT: RefCell<Option<TlsGuard>> = const { RefCell::new(None) }
}

/// Detaches the thread when the thread local is destroyed, unless the entry was taken first.
#[derive(Debug)]
struct TlsGuard {
    entry: Option<SlotEntry>,
}

impl Drop for TlsGuard {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            release_on_thread_exit(entry);
        }
    }
}

pub(crate) struct TlsSlot;

impl ThreadSlot for TlsSlot {
    fn init() -> Result<()> {
        Ok(())
    }

    fn get() -> Option<NonNull<sys::JNIEnv>> {
        // `try_with` fails once the thread local has been destroyed during thread teardown
        ENV_SLOT
            .try_with(|slot| {
                slot.borrow()
                    .as_ref()
                    .and_then(|guard| guard.entry.as_ref())
                    .map(|entry| entry.env)
            })
            .ok()
            .flatten()
    }

    fn store(entry: SlotEntry) -> Result<()> {
        ENV_SLOT
            .try_with(move |slot| {
                let previous = slot.borrow_mut().replace(TlsGuard { entry: Some(entry) });
                if let Some(mut previous) = previous {
                    // Defuse, so dropping it doesn't detach the thread
                    previous.entry.take();
                }
            })
            .map_err(|_| Error::SlotUnavailable)
    }

    fn take() -> Option<SlotEntry> {
        ENV_SLOT
            .try_with(|slot| {
                slot.borrow_mut()
                    .take()
                    .and_then(|mut guard| guard.entry.take())
            })
            .ok()
            .flatten()
    }

    fn release() {
        // Thread locals can't be freed up-front. Every entry stays in place along with its
        // ownership: the destructor is a no-op while the cache is unloaded, and after a reload the
        // entry is used and released as before.
        debug!("Keeping thread local JNIEnv entries until their threads exit");
    }
}
